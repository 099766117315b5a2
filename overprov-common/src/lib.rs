//! Common types and utilities shared between overprov-core and overprov-cli

use serde::{Deserialize, Serialize};

/// Bytes in one gigabyte, as Ceph reports capacity (binary multiple)
pub const GB: u64 = 1024 * 1024 * 1024;

/// Convert a byte count to whole gigabytes, truncating any remainder
pub fn bytes_to_gb(bytes: u64) -> u64 {
    bytes / GB
}

/// Ceph interface a storage class provisions from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InterfaceType {
    /// RBD block images
    #[default]
    CephBlockPool,
    /// CephFS subvolumes
    CephFileSystem,
}

impl InterfaceType {
    /// CSI driver suffix used in the provisioner name
    pub fn csi_driver(&self) -> &'static str {
        match self {
            Self::CephBlockPool => "rbd.csi.ceph.com",
            Self::CephFileSystem => "cephfs.csi.ceph.com",
        }
    }
}

impl std::fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CephBlockPool => write!(f, "CephBlockPool"),
            Self::CephFileSystem => write!(f, "CephFileSystem"),
        }
    }
}

impl std::str::FromStr for InterfaceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cephblockpool" | "rbd" | "block" => Ok(Self::CephBlockPool),
            "cephfilesystem" | "cephfs" | "fs" => Ok(Self::CephFileSystem),
            other => Err(Error::InvalidConfig(format!(
                "unknown storage interface '{}'",
                other
            ))),
        }
    }
}

/// Kind of cluster resource the scenario creates and tears down
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Secret,
    StorageClass,
    PersistentVolumeClaim,
    PersistentVolume,
    Pod,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Secret => "Secret",
            Self::StorageClass => "StorageClass",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::PersistentVolume => "PersistentVolume",
            Self::Pod => "Pod",
        };
        write!(f, "{}", kind)
    }
}

/// Lifecycle of a single oversized-claim run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    #[default]
    Uninitialized,
    ResourcesCreated,
    PvcCreated,
    PodCreated,
    Verified,
    TearingDown,
    TornDown,
}

impl std::fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            Self::Uninitialized => "uninitialized",
            Self::ResourcesCreated => "resources_created",
            Self::PvcCreated => "pvc_created",
            Self::PodCreated => "pod_created",
            Self::Verified => "verified",
            Self::TearingDown => "tearing_down",
            Self::TornDown => "torn_down",
        };
        write!(f, "{}", state)
    }
}

/// Acceptable band for an observed size relative to the requested size
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SizeTolerance {
    /// Lower factor applied to the requested size
    pub lower: f64,
    /// Upper factor applied to the requested size
    pub upper: f64,
}

impl Default for SizeTolerance {
    fn default() -> Self {
        Self {
            lower: 0.9,
            upper: 1.1,
        }
    }
}

impl SizeTolerance {
    const EDGE_SLACK: f64 = 1e-9;

    /// Closed interval of acceptable observed sizes for `requested`
    pub fn bounds(&self, requested: u64) -> (f64, f64) {
        let requested = requested as f64;
        (requested * self.lower, requested * self.upper)
    }

    /// Whether `observed` lies inside the band around `requested`
    ///
    /// Edges are widened by a relative slack so a size exactly on a bound
    /// is not rejected by float rounding (13 * 0.9 is 11.700000000000001).
    pub fn contains(&self, requested: u64, observed: f64) -> bool {
        let (low, high) = self.bounds(requested);
        let slack = requested as f64 * Self::EDGE_SLACK;
        low - slack <= observed && observed <= high + slack
    }

    pub fn validate(&self) -> Result<()> {
        if self.lower <= 0.0 || !self.lower.is_finite() || !self.upper.is_finite() {
            return Err(Error::Validation(format!(
                "tolerance factors must be positive and finite (lower={}, upper={})",
                self.lower, self.upper
            )));
        }
        if self.lower > self.upper {
            return Err(Error::Validation(format!(
                "tolerance lower factor {} exceeds upper factor {}",
                self.lower, self.upper
            )));
        }
        Ok(())
    }
}

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_gb_truncates() {
        assert_eq!(bytes_to_gb(0), 0);
        assert_eq!(bytes_to_gb(GB - 1), 0);
        assert_eq!(bytes_to_gb(500 * GB + GB / 2), 500);
    }

    #[test]
    fn test_interface_parsing() {
        assert_eq!(
            "CephBlockPool".parse::<InterfaceType>().unwrap(),
            InterfaceType::CephBlockPool
        );
        assert_eq!(
            "cephfs".parse::<InterfaceType>().unwrap(),
            InterfaceType::CephFileSystem
        );
        assert!("nfs".parse::<InterfaceType>().is_err());
    }

    #[test]
    fn test_interface_serialization() {
        let json = serde_json::to_string(&InterfaceType::CephFileSystem).unwrap();
        assert_eq!(json, "\"CephFileSystem\"");
        let back: InterfaceType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, InterfaceType::CephFileSystem);
    }

    #[test]
    fn test_tolerance_is_closed_interval() {
        let tolerance = SizeTolerance::default();
        assert!(tolerance.contains(600, 540.0));
        assert!(tolerance.contains(600, 594.0));
        assert!(tolerance.contains(600, 660.0));
        assert!(!tolerance.contains(600, 539.9));
        assert!(!tolerance.contains(600, 660.1));
        assert!(!tolerance.contains(600, 300.0));
    }

    #[test]
    fn test_tolerance_scales_with_request() {
        let tolerance = SizeTolerance::default();
        for requested in [1u64, 100, 10_000] {
            let (low, high) = tolerance.bounds(requested);
            assert!(tolerance.contains(requested, low));
            assert!(tolerance.contains(requested, high));
            assert!(tolerance.contains(requested, requested as f64));
        }
    }

    #[test]
    fn test_tolerance_fractional_edges() {
        let tolerance = SizeTolerance::default();
        assert!(tolerance.contains(13, 11.7));
        assert!(tolerance.contains(21, 18.9));
        assert!(tolerance.contains(13, 14.3));
        assert!(tolerance.contains(21, 23.1));
        assert!(!tolerance.contains(13, 11.69));
        assert!(!tolerance.contains(21, 23.11));
    }

    #[test]
    fn test_tolerance_validation() {
        assert!(SizeTolerance::default().validate().is_ok());
        assert!(SizeTolerance { lower: 1.2, upper: 1.1 }.validate().is_err());
        assert!(SizeTolerance { lower: 0.0, upper: 1.1 }.validate().is_err());
    }

    #[test]
    fn test_scenario_states_are_ordered() {
        assert!(ScenarioState::Uninitialized < ScenarioState::ResourcesCreated);
        assert!(ScenarioState::PodCreated < ScenarioState::Verified);
        assert!(ScenarioState::TearingDown < ScenarioState::TornDown);
        assert_eq!(ScenarioState::PvcCreated.to_string(), "pvc_created");
    }

    #[test]
    fn test_resource_kind_display() {
        assert_eq!(ResourceKind::PersistentVolumeClaim.to_string(), "PersistentVolumeClaim");
        assert_eq!(ResourceKind::StorageClass.to_string(), "StorageClass");
    }
}
