pub mod capacity;
pub mod config;
pub mod render;
pub mod run;

use anyhow::{Context, Result};
use overprov_core::kubernetes::K8sClient;
use overprov_core::{KubeCluster, OverprovConfig};

/// Connect to the cluster named by the configuration
pub async fn connect(config: &OverprovConfig) -> Result<KubeCluster> {
    let cluster = &config.cluster;

    let client = match (&cluster.kubeconfig, &cluster.context) {
        (Some(path), context) => K8sClient::from_kubeconfig_file(path, context.as_deref())
            .await
            .with_context(|| format!("loading kubeconfig {}", path.display()))?,
        (None, Some(context)) => K8sClient::from_default_kubeconfig(context)
            .await
            .with_context(|| format!("loading context {}", context))?,
        (None, None) => K8sClient::infer()
            .await
            .context("inferring cluster configuration")?,
    };

    client
        .health_check()
        .await
        .with_context(|| format!("API server {} is not reachable", client.api_server()))?;

    tracing::debug!(api_server = %client.api_server(), "Connected");

    Ok(KubeCluster::new(
        client,
        cluster.namespace.clone(),
        cluster.tools_selector.clone(),
    ))
}
