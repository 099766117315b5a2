//! Kubernetes types for overprov
//!
//! Simplified representations of the resources a run creates, plus the
//! request structs used to build them.

use overprov_common::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to a resource created during a run
///
/// Holding a handle means the create call returned successfully; it says
/// nothing about whether the object still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub name: String,
    /// None for cluster-scoped kinds
    pub namespace: Option<String>,
    /// UID assigned by the API server, when known
    pub uid: Option<String>,
}

impl ResourceHandle {
    pub fn namespaced(kind: ResourceKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: Some(namespace.into()),
            uid: None,
        }
    }

    pub fn cluster_scoped(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: None,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: Option<String>) -> Self {
        self.uid = uid;
        self
    }

    /// Namespace for namespaced kinds, empty for cluster-scoped ones
    pub fn namespace_or_empty(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} ({})", self.kind, self.name, ns),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Pod phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PodStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl PodStatus {
    pub fn from_phase(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => PodStatus::Pending,
            Some("Running") => PodStatus::Running,
            Some("Succeeded") => PodStatus::Succeeded,
            Some("Failed") => PodStatus::Failed,
            _ => PodStatus::Unknown,
        }
    }
}

/// Simplified pod information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub status: PodStatus,
}

/// Pod exec request
#[derive(Debug, Clone, Deserialize)]
pub struct PodExecRequest {
    /// Container to exec into
    pub container: Option<String>,
    /// Command to execute
    pub command: Vec<String>,
}

impl PodExecRequest {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            container: None,
            command,
        }
    }
}

/// Create Secret request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    pub name: String,
    pub namespace: String,
    pub secret_type: Option<String>,
    /// Plaintext values, encoded by the API server
    #[serde(default)]
    pub string_data: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Create StorageClass request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStorageClassRequest {
    pub name: String,
    pub provisioner: String,
    pub reclaim_policy: Option<String>,
    pub volume_binding_mode: Option<String>,
    #[serde(default)]
    pub allow_volume_expansion: bool,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// PersistentVolumeClaim information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvcInfo {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub volume_name: Option<String>,
    pub storage_class: Option<String>,
    pub capacity: Option<String>,
    pub requested_capacity: Option<String>,
}

impl PvcInfo {
    pub fn is_bound(&self) -> bool {
        self.status == "Bound"
    }
}

/// Create PVC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePvcRequest {
    pub name: String,
    pub namespace: String,
    pub storage_class: Option<String>,
    pub access_modes: Vec<String>,
    /// Storage quantity, e.g. "600Gi"
    pub storage: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// PersistentVolume information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvInfo {
    pub name: String,
    pub status: String,
    pub capacity: String,
    pub reclaim_policy: String,
    pub storage_class: Option<String>,
}

impl PvInfo {
    /// Whether the volume outlives its claim and must be removed by hand
    pub fn is_retained(&self) -> bool {
        self.reclaim_policy == "Retain"
    }
}
