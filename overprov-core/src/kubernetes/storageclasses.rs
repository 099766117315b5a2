//! StorageClass operations
//!
//! Create and delete the Ceph CSI storage class used by a run.

use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use overprov_common::ResourceKind;

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::types::{CreateStorageClassRequest, ResourceHandle};

/// Build the StorageClass object for a request
pub fn build_storage_class(request: &CreateStorageClassRequest) -> StorageClass {
    StorageClass {
        metadata: ObjectMeta {
            name: Some(request.name.clone()),
            labels: if request.labels.is_empty() {
                None
            } else {
                Some(request.labels.clone())
            },
            ..Default::default()
        },
        provisioner: request.provisioner.clone(),
        reclaim_policy: request.reclaim_policy.clone(),
        volume_binding_mode: request.volume_binding_mode.clone(),
        allow_volume_expansion: Some(request.allow_volume_expansion),
        parameters: if request.parameters.is_empty() {
            None
        } else {
            Some(request.parameters.clone())
        },
        ..Default::default()
    }
}

/// Create a new StorageClass
pub async fn create_storage_class(
    client: &K8sClient,
    request: &CreateStorageClassRequest,
) -> K8sResult<ResourceHandle> {
    let scs: Api<StorageClass> = Api::all(client.inner().clone());

    let created = scs
        .create(&PostParams::default(), &build_storage_class(request))
        .await?;

    tracing::info!(
        name = %request.name,
        provisioner = %request.provisioner,
        "Created storage class"
    );

    Ok(ResourceHandle::cluster_scoped(ResourceKind::StorageClass, &request.name)
        .with_uid(created.metadata.uid))
}

/// Check whether a StorageClass exists
pub async fn storage_class_exists(client: &K8sClient, name: &str) -> K8sResult<bool> {
    let scs: Api<StorageClass> = Api::all(client.inner().clone());
    Ok(scs.get_opt(name).await?.is_some())
}

/// Delete a StorageClass
pub async fn delete_storage_class(client: &K8sClient, name: &str) -> K8sResult<()> {
    let scs: Api<StorageClass> = Api::all(client.inner().clone());
    scs.delete(name, &DeleteParams::default()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_build_storage_class() {
        let mut parameters = BTreeMap::new();
        parameters.insert("pool".to_string(), "rbd".to_string());

        let sc = build_storage_class(&CreateStorageClassRequest {
            name: "storageclass-test-1".to_string(),
            provisioner: "openshift-storage.rbd.csi.ceph.com".to_string(),
            reclaim_policy: Some("Delete".to_string()),
            volume_binding_mode: None,
            allow_volume_expansion: false,
            parameters,
            labels: BTreeMap::new(),
        });

        assert_eq!(sc.metadata.name.as_deref(), Some("storageclass-test-1"));
        assert!(sc.metadata.namespace.is_none());
        assert_eq!(sc.provisioner, "openshift-storage.rbd.csi.ceph.com");
        assert_eq!(sc.reclaim_policy.as_deref(), Some("Delete"));
        assert_eq!(sc.allow_volume_expansion, Some(false));
        assert_eq!(sc.parameters.unwrap()["pool"], "rbd");
    }
}
