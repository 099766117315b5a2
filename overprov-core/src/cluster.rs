//! Cluster operations used by a scenario run
//!
//! `ClusterOps` is the single seam between the workflow and the cluster.
//! `KubeCluster` implements it over the kube adapters; tests substitute an
//! in-memory implementation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod, Secret};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::Api;
use overprov_common::ResourceKind;
use tracing::{debug, info};

use crate::kubernetes::error::{K8sError, K8sResult};
use crate::kubernetes::exec::{exec_command, ExecOutput};
use crate::kubernetes::types::{
    CreatePvcRequest, CreateSecretRequest, CreateStorageClassRequest, PodExecRequest, PodStatus,
    PvInfo, PvcInfo, ResourceHandle,
};
use crate::kubernetes::wait::{self, WaitOptions};
use crate::kubernetes::{pods, pvcs, secrets, storageclasses, K8sClient};

/// Everything a run needs from the cluster
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Run `argv` inside the Ceph tools pod
    async fn exec_ceph_cmd(&self, argv: &[String]) -> K8sResult<ExecOutput>;

    async fn create_secret(&self, request: &CreateSecretRequest) -> K8sResult<ResourceHandle>;

    async fn create_storage_class(
        &self,
        request: &CreateStorageClassRequest,
    ) -> K8sResult<ResourceHandle>;

    async fn create_pvc(&self, request: &CreatePvcRequest) -> K8sResult<ResourceHandle>;

    async fn create_pod(&self, pod: &Pod) -> K8sResult<ResourceHandle>;

    async fn wait_for_pod_running(&self, pod: &ResourceHandle, options: &WaitOptions) -> K8sResult<()>;

    async fn wait_for_pvc_bound(&self, pvc: &ResourceHandle, options: &WaitOptions) -> K8sResult<()>;

    async fn get_pvc(&self, pvc: &ResourceHandle) -> K8sResult<PvcInfo>;

    /// Look up a volume, `None` when it does not exist
    async fn get_pv(&self, name: &str) -> K8sResult<Option<PvInfo>>;

    async fn exec_on_pod(
        &self,
        pod: &ResourceHandle,
        request: &PodExecRequest,
    ) -> K8sResult<ExecOutput>;

    async fn exists(&self, handle: &ResourceHandle) -> K8sResult<bool>;

    async fn delete(&self, handle: &ResourceHandle) -> K8sResult<()>;

    async fn wait_for_delete(&self, handle: &ResourceHandle, options: &WaitOptions) -> K8sResult<()>;
}

/// `ClusterOps` backed by a live API server
pub struct KubeCluster {
    client: K8sClient,
    namespace: String,
    tools_selector: String,
}

impl KubeCluster {
    /// `namespace` is where the Ceph tools pod runs, found by `tools_selector`
    pub fn new(client: K8sClient, namespace: impl Into<String>, tools_selector: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            tools_selector: tools_selector.into(),
        }
    }

    /// Name of a running tools pod
    async fn tools_pod(&self) -> K8sResult<String> {
        let candidates =
            pods::list_pods(&self.client, &self.namespace, Some(&self.tools_selector)).await?;

        candidates
            .iter()
            .find(|p| p.status == PodStatus::Running)
            .or_else(|| candidates.first())
            .map(|p| p.name.clone())
            .ok_or_else(|| K8sError::ResourceNotFound {
                kind: ResourceKind::Pod,
                name: self.tools_selector.clone(),
                namespace: self.namespace.clone(),
            })
    }
}

fn namespace_of(handle: &ResourceHandle) -> K8sResult<&str> {
    handle
        .namespace
        .as_deref()
        .ok_or_else(|| K8sError::Internal(format!("{} has no namespace", handle)))
}

#[async_trait]
impl ClusterOps for KubeCluster {
    async fn exec_ceph_cmd(&self, argv: &[String]) -> K8sResult<ExecOutput> {
        let pod = self.tools_pod().await?;
        debug!(pod = %pod, command = ?argv, "Running ceph command");
        exec_command(
            &self.client,
            &self.namespace,
            &pod,
            &PodExecRequest::new(argv.to_vec()),
        )
        .await
    }

    async fn create_secret(&self, request: &CreateSecretRequest) -> K8sResult<ResourceHandle> {
        secrets::create_secret(&self.client, request).await
    }

    async fn create_storage_class(
        &self,
        request: &CreateStorageClassRequest,
    ) -> K8sResult<ResourceHandle> {
        storageclasses::create_storage_class(&self.client, request).await
    }

    async fn create_pvc(&self, request: &CreatePvcRequest) -> K8sResult<ResourceHandle> {
        pvcs::create_pvc(&self.client, request).await
    }

    async fn create_pod(&self, pod: &Pod) -> K8sResult<ResourceHandle> {
        pods::create_pod(&self.client, pod).await
    }

    async fn wait_for_pod_running(&self, pod: &ResourceHandle, options: &WaitOptions) -> K8sResult<()> {
        let api: Api<Pod> = Api::namespaced(self.client.inner().clone(), namespace_of(pod)?);
        wait::wait_for_pod_running(&api, &pod.name, options).await
    }

    async fn wait_for_pvc_bound(&self, pvc: &ResourceHandle, options: &WaitOptions) -> K8sResult<()> {
        let api: Api<PersistentVolumeClaim> =
            Api::namespaced(self.client.inner().clone(), namespace_of(pvc)?);
        wait::wait_for_pvc_bound(&api, &pvc.name, options).await
    }

    async fn get_pvc(&self, pvc: &ResourceHandle) -> K8sResult<PvcInfo> {
        pvcs::get_pvc(&self.client, namespace_of(pvc)?, &pvc.name).await
    }

    async fn get_pv(&self, name: &str) -> K8sResult<Option<PvInfo>> {
        pvcs::get_pv(&self.client, name).await
    }

    async fn exec_on_pod(
        &self,
        pod: &ResourceHandle,
        request: &PodExecRequest,
    ) -> K8sResult<ExecOutput> {
        exec_command(&self.client, namespace_of(pod)?, &pod.name, request).await
    }

    async fn exists(&self, handle: &ResourceHandle) -> K8sResult<bool> {
        let name = handle.name.as_str();
        match handle.kind {
            ResourceKind::Secret => {
                secrets::secret_exists(&self.client, namespace_of(handle)?, name).await
            }
            ResourceKind::StorageClass => {
                storageclasses::storage_class_exists(&self.client, name).await
            }
            ResourceKind::PersistentVolumeClaim => {
                pvcs::pvc_exists(&self.client, namespace_of(handle)?, name).await
            }
            ResourceKind::PersistentVolume => pvcs::pv_exists(&self.client, name).await,
            ResourceKind::Pod => pods::pod_exists(&self.client, namespace_of(handle)?, name).await,
        }
    }

    async fn delete(&self, handle: &ResourceHandle) -> K8sResult<()> {
        let name = handle.name.as_str();
        match handle.kind {
            ResourceKind::Secret => {
                secrets::delete_secret(&self.client, namespace_of(handle)?, name).await?
            }
            ResourceKind::StorageClass => {
                storageclasses::delete_storage_class(&self.client, name).await?
            }
            ResourceKind::PersistentVolumeClaim => {
                pvcs::delete_pvc(&self.client, namespace_of(handle)?, name).await?
            }
            ResourceKind::PersistentVolume => pvcs::delete_pv(&self.client, name).await?,
            ResourceKind::Pod => pods::delete_pod(&self.client, namespace_of(handle)?, name).await?,
        }

        info!(resource = %handle, "Deleted");
        Ok(())
    }

    async fn wait_for_delete(&self, handle: &ResourceHandle, options: &WaitOptions) -> K8sResult<()> {
        let client = self.client.inner().clone();
        let uid = handle.uid.as_deref();
        let name = handle.name.as_str();

        match handle.kind {
            ResourceKind::Secret => {
                let api: Api<Secret> = Api::namespaced(client, namespace_of(handle)?);
                wait::wait_for_delete(&api, handle.kind, name, uid, options).await
            }
            ResourceKind::StorageClass => {
                let api: Api<StorageClass> = Api::all(client);
                wait::wait_for_delete(&api, handle.kind, name, uid, options).await
            }
            ResourceKind::PersistentVolumeClaim => {
                let api: Api<PersistentVolumeClaim> = Api::namespaced(client, namespace_of(handle)?);
                wait::wait_for_delete(&api, handle.kind, name, uid, options).await
            }
            ResourceKind::PersistentVolume => {
                let api: Api<PersistentVolume> = Api::all(client);
                wait::wait_for_delete(&api, handle.kind, name, uid, options).await
            }
            ResourceKind::Pod => {
                let api: Api<Pod> = Api::namespaced(client, namespace_of(handle)?);
                wait::wait_for_delete(&api, handle.kind, name, uid, options).await
            }
        }
    }
}
