//! K8s Secrets operations
//!
//! Create and delete the credential secret a storage class points at.
//! Secret values are never logged.

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use overprov_common::ResourceKind;

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::types::{CreateSecretRequest, ResourceHandle};

/// Build the Secret object for a request
pub fn build_secret(request: &CreateSecretRequest) -> Secret {
    Secret {
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
        type_: request.secret_type.clone(),
        // string_data is for plaintext values (K8s will encode them)
        string_data: if request.string_data.is_empty() {
            None
        } else {
            Some(request.string_data.clone())
        },
        ..Default::default()
    }
}

/// Create a new Secret
pub async fn create_secret(
    client: &K8sClient,
    request: &CreateSecretRequest,
) -> K8sResult<ResourceHandle> {
    let secrets: Api<Secret> = Api::namespaced(client.inner().clone(), &request.namespace);

    let created = secrets
        .create(&PostParams::default(), &build_secret(request))
        .await?;

    tracing::info!(name = %request.name, namespace = %request.namespace, "Created secret");

    Ok(
        ResourceHandle::namespaced(ResourceKind::Secret, &request.name, &request.namespace)
            .with_uid(created.metadata.uid),
    )
}

/// Check whether a Secret exists
pub async fn secret_exists(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<bool> {
    let secrets: Api<Secret> = Api::namespaced(client.inner().clone(), namespace);
    Ok(secrets.get_opt(name).await?.is_some())
}

/// Delete a Secret
pub async fn delete_secret(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<()> {
    let secrets: Api<Secret> = Api::namespaced(client.inner().clone(), namespace);
    secrets.delete(name, &DeleteParams::default()).await?;

    Ok(())
}
