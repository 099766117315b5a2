//! Pod operations

use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use overprov_common::ResourceKind;

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::{K8sError, K8sResult};
use crate::kubernetes::types::{PodInfo, PodStatus, ResourceHandle};

/// List pods in a namespace
pub async fn list_pods(
    client: &K8sClient,
    namespace: &str,
    label_selector: Option<&str>,
) -> K8sResult<Vec<PodInfo>> {
    let pods: Api<Pod> = Api::namespaced(client.inner().clone(), namespace);

    let mut lp = ListParams::default();
    if let Some(selector) = label_selector {
        lp = lp.labels(selector);
    }

    let pod_list = pods.list(&lp).await?;

    Ok(pod_list.items.into_iter().map(pod_to_info).collect())
}

/// Check whether a pod exists
pub async fn pod_exists(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<bool> {
    let pods: Api<Pod> = Api::namespaced(client.inner().clone(), namespace);
    Ok(pods.get_opt(name).await?.is_some())
}

/// Create a pod from a fully populated manifest
pub async fn create_pod(client: &K8sClient, pod: &Pod) -> K8sResult<ResourceHandle> {
    let name = pod
        .metadata
        .name
        .clone()
        .ok_or_else(|| K8sError::Template("pod manifest has no metadata.name".to_string()))?;
    let namespace = pod
        .metadata
        .namespace
        .clone()
        .ok_or_else(|| K8sError::Template("pod manifest has no metadata.namespace".to_string()))?;

    let pods: Api<Pod> = Api::namespaced(client.inner().clone(), &namespace);
    let created = pods.create(&PostParams::default(), pod).await?;

    tracing::info!(name = %name, namespace = %namespace, "Created pod");

    Ok(ResourceHandle::namespaced(ResourceKind::Pod, name, namespace).with_uid(created.metadata.uid))
}

/// Delete a pod
pub async fn delete_pod(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<()> {
    let pods: Api<Pod> = Api::namespaced(client.inner().clone(), namespace);
    pods.delete(name, &DeleteParams::default()).await?;

    Ok(())
}

/// Convert k8s Pod to PodInfo
pub(crate) fn pod_to_info(pod: Pod) -> PodInfo {
    let metadata = pod.metadata;
    let status = pod.status.unwrap_or_default();

    PodInfo {
        name: metadata.name.unwrap_or_default(),
        namespace: metadata.namespace.unwrap_or_default(),
        status: PodStatus::from_phase(status.phase.as_deref()),
    }
}
