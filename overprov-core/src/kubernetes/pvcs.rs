//! PersistentVolumeClaim and PersistentVolume operations

use k8s_openapi::api::core::v1::{
    PersistentVolume, PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use overprov_common::ResourceKind;
use std::collections::BTreeMap;

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::types::{CreatePvcRequest, PvInfo, PvcInfo, ResourceHandle};

// ============================================================================
// PersistentVolumeClaim Operations
// ============================================================================

/// Build the PVC object for a request
pub fn build_pvc(request: &CreatePvcRequest) -> PersistentVolumeClaim {
    let mut requests = BTreeMap::new();
    requests.insert("storage".to_string(), Quantity(request.storage.clone()));

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(request.name.clone()),
            namespace: Some(request.namespace.clone()),
            labels: if request.labels.is_empty() {
                None
            } else {
                Some(request.labels.clone())
            },
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(request.access_modes.clone()),
            storage_class_name: request.storage_class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(requests),
                limits: None,
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Get a specific PVC
pub async fn get_pvc(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<PvcInfo> {
    let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(client.inner().clone(), namespace);
    let pvc = pvcs.get(name).await?;

    Ok(pvc_to_info(pvc))
}

/// Check whether a PVC exists
pub async fn pvc_exists(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<bool> {
    let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(client.inner().clone(), namespace);
    Ok(pvcs.get_opt(name).await?.is_some())
}

/// Create a new PVC
pub async fn create_pvc(client: &K8sClient, request: &CreatePvcRequest) -> K8sResult<ResourceHandle> {
    let pvcs: Api<PersistentVolumeClaim> =
        Api::namespaced(client.inner().clone(), &request.namespace);

    let created = pvcs.create(&PostParams::default(), &build_pvc(request)).await?;

    tracing::info!(
        name = %request.name,
        namespace = %request.namespace,
        storage = %request.storage,
        "Created persistent volume claim"
    );

    Ok(ResourceHandle::namespaced(
        ResourceKind::PersistentVolumeClaim,
        &request.name,
        &request.namespace,
    )
    .with_uid(created.metadata.uid))
}

/// Delete a PVC
pub async fn delete_pvc(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<()> {
    let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(client.inner().clone(), namespace);
    pvcs.delete(name, &DeleteParams::default()).await?;

    Ok(())
}

pub(crate) fn pvc_to_info(pvc: PersistentVolumeClaim) -> PvcInfo {
    let metadata = pvc.metadata;
    let spec = pvc.spec.unwrap_or_default();
    let status = pvc.status.unwrap_or_default();

    let capacity = status
        .capacity
        .and_then(|c| c.get("storage").map(|q| q.0.clone()));

    let requested_capacity = spec
        .resources
        .and_then(|r| r.requests)
        .and_then(|r| r.get("storage").map(|q| q.0.clone()));

    PvcInfo {
        name: metadata.name.unwrap_or_default(),
        namespace: metadata.namespace.unwrap_or_default(),
        status: status.phase.unwrap_or_else(|| "Unknown".to_string()),
        volume_name: spec.volume_name,
        storage_class: spec.storage_class_name,
        capacity,
        requested_capacity,
    }
}

// ============================================================================
// PersistentVolume Operations
// ============================================================================

/// Get a specific PV, `None` when it does not exist
pub async fn get_pv(client: &K8sClient, name: &str) -> K8sResult<Option<PvInfo>> {
    let pvs: Api<PersistentVolume> = Api::all(client.inner().clone());

    Ok(pvs.get_opt(name).await?.map(pv_to_info))
}

/// Check whether a PV exists
pub async fn pv_exists(client: &K8sClient, name: &str) -> K8sResult<bool> {
    let pvs: Api<PersistentVolume> = Api::all(client.inner().clone());
    Ok(pvs.get_opt(name).await?.is_some())
}

/// Delete a PV
pub async fn delete_pv(client: &K8sClient, name: &str) -> K8sResult<()> {
    let pvs: Api<PersistentVolume> = Api::all(client.inner().clone());
    pvs.delete(name, &DeleteParams::default()).await?;

    Ok(())
}

fn pv_to_info(pv: PersistentVolume) -> PvInfo {
    let metadata = pv.metadata;
    let spec = pv.spec.unwrap_or_default();
    let status = pv.status.unwrap_or_default();

    let capacity = spec
        .capacity
        .and_then(|c| c.get("storage").map(|q| q.0.clone()))
        .unwrap_or_default();

    PvInfo {
        name: metadata.name.unwrap_or_default(),
        status: status.phase.unwrap_or_else(|| "Unknown".to_string()),
        capacity,
        reclaim_policy: spec
            .persistent_volume_reclaim_policy
            .unwrap_or_else(|| "Retain".to_string()),
        storage_class: spec.storage_class_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PersistentVolumeClaimStatus, PersistentVolumeSpec};

    fn request() -> CreatePvcRequest {
        CreatePvcRequest {
            name: "over-sized-pvc".to_string(),
            namespace: "openshift-storage".to_string(),
            storage_class: Some("storageclass-test-1".to_string()),
            access_modes: vec!["ReadWriteOnce".to_string()],
            storage: "600Gi".to_string(),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_build_pvc_requests_storage() {
        let pvc = build_pvc(&request());
        let spec = pvc.spec.unwrap();
        assert_eq!(spec.storage_class_name.as_deref(), Some("storageclass-test-1"));
        assert_eq!(spec.access_modes.unwrap(), vec!["ReadWriteOnce".to_string()]);
        let requests = spec.resources.unwrap().requests.unwrap();
        assert_eq!(requests["storage"].0, "600Gi");
    }

    #[test]
    fn test_unbound_pvc_info() {
        let info = pvc_to_info(build_pvc(&request()));
        assert_eq!(info.name, "over-sized-pvc");
        assert_eq!(info.status, "Unknown");
        assert!(!info.is_bound());
        assert_eq!(info.requested_capacity.as_deref(), Some("600Gi"));
        assert!(info.capacity.is_none());
        assert!(info.volume_name.is_none());
    }

    #[test]
    fn test_bound_pvc_info() {
        let mut pvc = build_pvc(&request());
        if let Some(spec) = pvc.spec.as_mut() {
            spec.volume_name = Some("pvc-0b1c".to_string());
        }
        let mut capacity = BTreeMap::new();
        capacity.insert("storage".to_string(), Quantity("600Gi".to_string()));
        pvc.status = Some(PersistentVolumeClaimStatus {
            phase: Some("Bound".to_string()),
            capacity: Some(capacity),
            ..Default::default()
        });

        let info = pvc_to_info(pvc);
        assert!(info.is_bound());
        assert_eq!(info.volume_name.as_deref(), Some("pvc-0b1c"));
        assert_eq!(info.capacity.as_deref(), Some("600Gi"));
    }

    #[test]
    fn test_pv_defaults_to_retain() {
        let pv = PersistentVolume {
            metadata: ObjectMeta {
                name: Some("pvc-0b1c".to_string()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeSpec::default()),
            status: None,
        };
        let info = pv_to_info(pv);
        assert_eq!(info.reclaim_policy, "Retain");
        assert!(info.is_retained());
        assert_eq!(info.status, "Unknown");
    }
}
