//! Kubernetes error types
//!
//! Wraps kube-rs errors and the failure modes of waits and exec sessions.

use overprov_common::ResourceKind;
use thiserror::Error;

/// Kubernetes-specific errors
#[derive(Debug, Error)]
pub enum K8sError {
    /// Kubernetes resource not found
    #[error("Resource not found: {kind}/{name} in namespace {namespace}")]
    ResourceNotFound {
        kind: ResourceKind,
        name: String,
        namespace: String,
    },

    /// Error from kube-rs client
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Invalid kubeconfig
    #[error("Invalid kubeconfig: {0}")]
    InvalidKubeconfig(String),

    /// A wait did not observe its condition in time
    #[error("Timed out after {seconds}s waiting for {kind}/{name} to {condition}")]
    Timeout {
        kind: ResourceKind,
        name: String,
        condition: String,
        seconds: u64,
    },

    /// Exec session error
    #[error("Exec error: {0}")]
    ExecError(String),

    /// Manifest template could not be loaded or is unusable
    #[error("Template error: {0}")]
    Template(String),

    /// Internal system error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl K8sError {
    /// Whether the error is an API 404
    pub fn is_not_found(&self) -> bool {
        match self {
            K8sError::ResourceNotFound { .. } => true,
            K8sError::KubeError(e) => is_not_found(e),
            _ => false,
        }
    }
}

/// Whether a kube-rs error is an API 404
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

/// Result type alias for Kubernetes operations
pub type K8sResult<T> = std::result::Result<T, K8sError>;
