//! Resource cleanup
//!
//! Deletes dependents first: pod, claim, any retained volume, storage class,
//! secret. Pod, claim and volume deletions are waited on; the storage class
//! and secret are not. Each handle is cleared once its object is gone, so
//! running teardown again only retries what is left.

use tracing::{info, warn};

use crate::cluster::ClusterOps;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::types::ResourceHandle;
use crate::scenario::context::ScenarioContext;
use crate::scenario::error::ScenarioResult;
use crate::scenario::ScenarioOptions;
use overprov_common::ResourceKind;

/// Delete and wait, skipping objects that are already gone
async fn remove_and_wait<O>(ops: &O, handle: &ResourceHandle, options: &ScenarioOptions) -> K8sResult<()>
where
    O: ClusterOps + ?Sized,
{
    if !ops.exists(handle).await? {
        info!(resource = %handle, "Already gone, skipping delete");
        return Ok(());
    }

    ops.delete(handle).await?;
    ops.wait_for_delete(handle, &options.delete_wait).await?;
    info!(resource = %handle, "Deletion confirmed");

    Ok(())
}

/// Delete without waiting; a missing object counts as deleted
async fn remove<O>(ops: &O, handle: &ResourceHandle) -> K8sResult<()>
where
    O: ClusterOps + ?Sized,
{
    match ops.delete(handle).await {
        Err(e) if e.is_not_found() => {
            warn!(resource = %handle, "Already gone");
            Ok(())
        }
        other => other,
    }
}

/// Volume the claim is bound to, when its reclaim policy keeps it around
async fn retained_volume<O>(ops: &O, pvc: &ResourceHandle) -> K8sResult<Option<ResourceHandle>>
where
    O: ClusterOps + ?Sized,
{
    if !ops.exists(pvc).await? {
        return Ok(None);
    }

    let Some(volume_name) = ops.get_pvc(pvc).await?.volume_name else {
        return Ok(None);
    };

    Ok(ops
        .get_pv(&volume_name)
        .await?
        .filter(|pv| pv.is_retained())
        .map(|pv| {
            ResourceHandle::cluster_scoped(ResourceKind::PersistentVolume, pv.name)
        }))
}

/// Release everything recorded in `ctx`, stopping at the first failure
pub async fn teardown<O>(ops: &O, ctx: &mut ScenarioContext, options: &ScenarioOptions) -> ScenarioResult<()>
where
    O: ClusterOps + ?Sized,
{
    if let Some(pod) = ctx.pod.clone() {
        remove_and_wait(ops, &pod, options).await?;
        ctx.pod = None;
    }

    if let Some(pvc) = ctx.pvc.clone() {
        if ctx.retained_pv.is_none() {
            ctx.retained_pv = retained_volume(ops, &pvc).await?;
        }
        remove_and_wait(ops, &pvc, options).await?;
        ctx.pvc = None;
    }

    if let Some(pv) = ctx.retained_pv.clone() {
        info!(volume = %pv.name, "Removing volume kept by Retain policy");
        remove_and_wait(ops, &pv, options).await?;
        ctx.retained_pv = None;
    }

    if let Some(sc) = ctx.storage_class.clone() {
        remove(ops, &sc).await?;
        ctx.storage_class = None;
    }

    if let Some(secret) = ctx.secret.clone() {
        remove(ops, &secret).await?;
        ctx.secret = None;
    }

    Ok(())
}
