//! Oversized-claim provisioning check for Ceph-backed Kubernetes storage
//!
//! Requests a PersistentVolumeClaim larger than the Ceph cluster's raw
//! capacity, mounts it in a pod and checks the size the pod observes.

pub mod ceph;
pub mod cluster;
pub mod config;
pub mod kubernetes;
pub mod logging;
pub mod naming;
pub mod provision;
pub mod scenario;
pub mod templating;

pub use cluster::{ClusterOps, KubeCluster};
pub use config::{ConfigError, OverprovConfig};
pub use scenario::{Scenario, ScenarioError, ScenarioOptions, ScenarioReport, ScenarioResult};
