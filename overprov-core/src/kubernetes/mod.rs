//! Kubernetes adapters
//!
//! Thin wrappers over kube-rs for the handful of resources a run touches:
//! secrets, storage classes, claims, volumes and pods, plus exec and waits.

pub mod client;
pub mod error;
pub mod exec;
pub mod pods;
pub mod pvcs;
pub mod secrets;
pub mod storageclasses;
pub mod types;
pub mod wait;

pub use client::K8sClient;
pub use error::{K8sError, K8sResult};
pub use exec::ExecOutput;
pub use types::*;
pub use wait::WaitOptions;
