//! Scenario error types

use thiserror::Error;

use crate::ceph::CephError;
use crate::kubernetes::error::K8sError;

/// Why a scenario run failed
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Capacity could not be determined; nothing was created
    #[error("Capacity probe failed: {0}")]
    Probe(#[from] CephError),

    /// A cluster call, wait or exec failed
    #[error("Infrastructure failure: {0}")]
    Infrastructure(#[from] K8sError),

    /// The mounted size is outside the tolerance band
    #[error(
        "Size mismatch: requested {requested_gb}G, mounted {observed_gb}G, expected between {lower}G and {upper}G"
    )]
    Verification {
        requested_gb: u64,
        observed_gb: f64,
        lower: f64,
        upper: f64,
    },

    /// df output could not be read as a size
    #[error("Unreadable size: {0}")]
    UnreadableSize(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScenarioError {
    /// Whether the run reached the size check and the check failed
    pub fn is_verification(&self) -> bool {
        matches!(self, ScenarioError::Verification { .. })
    }
}

impl From<crate::config::ConfigError> for ScenarioError {
    fn from(err: crate::config::ConfigError) -> Self {
        ScenarioError::InvalidConfig(err.to_string())
    }
}

pub type ScenarioResult<T> = std::result::Result<T, ScenarioError>;
