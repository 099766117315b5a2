//! Configuration management for overprov
//!
//! Settings are layered, highest priority first:
//! 1. Environment variables (`OVERPROV_*`)
//! 2. Configuration file (TOML format)
//! 3. Default values

use overprov_common::{InterfaceType, SizeTolerance};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverprovConfig {
    /// Cluster access
    pub cluster: ClusterConfig,
    /// Storage backend and claim settings
    pub storage: StorageConfig,
    /// Size verification
    pub verify: VerifyConfig,
    /// Wait timeouts
    pub timeouts: TimeoutsConfig,
    /// Manifest template overrides
    pub templates: TemplatesConfig,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Cluster access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Kubeconfig file; inferred from the environment when unset
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use
    pub context: Option<String>,
    /// Namespace holding the storage operator and the test resources
    pub namespace: String,
    /// Label selector for the Ceph tools pod
    pub tools_selector: String,
}

/// Storage backend and claim configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend interface the storage class provisions from
    pub interface: InterfaceType,
    /// Block pool name (RBD) or filesystem name (CephFS)
    pub interface_name: String,
    /// Data pool for CephFS classes
    pub data_pool: Option<String>,
    /// Gigabytes requested beyond the probed capacity
    pub margin_gb: u64,
    /// Base name of the oversized claim
    pub pvc_base_name: String,
    /// Description embedded in generated resource names
    pub name_prefix: String,
    /// Access mode of the oversized claim
    pub access_mode: String,
    /// Wait for the claim to reach Bound before creating the pod
    pub wait_for_bound: bool,
}

/// Size verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Where the pod template mounts the claim
    pub mount_path: String,
    /// Lower tolerance factor
    pub lower_factor: f64,
    /// Upper tolerance factor
    pub upper_factor: f64,
}

/// Wait timeouts, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub pod_running_secs: u64,
    pub pod_poll_secs: u64,
    pub pvc_bound_secs: u64,
    pub delete_secs: u64,
    pub delete_poll_secs: u64,
}

/// Manifest template overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Pod manifest replacing the embedded template
    pub pod: Option<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for JSON log files
    pub log_dir: PathBuf,
    /// Enable file logging
    pub file_logging_enabled: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            namespace: "openshift-storage".to_string(),
            tools_selector: "app=rook-ceph-tools".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            interface: InterfaceType::CephBlockPool,
            interface_name: "rbd".to_string(),
            data_pool: None,
            margin_gb: 100,
            pvc_base_name: "over-sized-pvc".to_string(),
            name_prefix: "test".to_string(),
            access_mode: "ReadWriteOnce".to_string(),
            wait_for_bound: false,
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        let tolerance = SizeTolerance::default();
        Self {
            mount_path: "/var/lib/www/html".to_string(),
            lower_factor: tolerance.lower,
            upper_factor: tolerance.upper,
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            pod_running_secs: 180,
            pod_poll_secs: 10,
            pvc_bound_secs: 120,
            delete_secs: 60,
            delete_poll_secs: 3,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("/var/log/overprov"),
            file_logging_enabled: false,
        }
    }
}

impl VerifyConfig {
    pub fn tolerance(&self) -> SizeTolerance {
        SizeTolerance {
            lower: self.lower_factor,
            upper: self.upper_factor,
        }
    }
}

impl OverprovConfig {
    /// Load from the first config file found, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            std::env::var("OVERPROV_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("/etc/overprov/config.toml")),
            Some(PathBuf::from("./overprov.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    ///
    /// A value that does not parse is an error naming the variable.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Cluster
        if let Some(path) = lookup("OVERPROV_KUBECONFIG") {
            self.cluster.kubeconfig = Some(PathBuf::from(path));
        }
        if let Some(context) = lookup("OVERPROV_CONTEXT") {
            self.cluster.context = Some(context);
        }
        if let Some(namespace) = lookup("OVERPROV_NAMESPACE") {
            self.cluster.namespace = namespace;
        }
        if let Some(selector) = lookup("OVERPROV_TOOLS_SELECTOR") {
            self.cluster.tools_selector = selector;
        }

        // Storage
        if let Some(interface) = lookup("OVERPROV_INTERFACE") {
            self.storage.interface = parse_var("OVERPROV_INTERFACE", &interface)?;
        }
        if let Some(name) = lookup("OVERPROV_INTERFACE_NAME") {
            self.storage.interface_name = name;
        }
        if let Some(margin) = lookup("OVERPROV_MARGIN_GB") {
            self.storage.margin_gb = parse_var("OVERPROV_MARGIN_GB", &margin)?;
        }
        if let Some(name) = lookup("OVERPROV_PVC_NAME") {
            self.storage.pvc_base_name = name;
        }
        if let Some(wait) = lookup("OVERPROV_WAIT_FOR_BOUND") {
            self.storage.wait_for_bound = parse_flag("OVERPROV_WAIT_FOR_BOUND", &wait)?;
        }

        // Verify
        if let Some(path) = lookup("OVERPROV_MOUNT_PATH") {
            self.verify.mount_path = path;
        }

        // Timeouts
        let timeouts = [
            ("OVERPROV_POD_TIMEOUT", &mut self.timeouts.pod_running_secs),
            ("OVERPROV_POD_POLL", &mut self.timeouts.pod_poll_secs),
            ("OVERPROV_BOUND_TIMEOUT", &mut self.timeouts.pvc_bound_secs),
            ("OVERPROV_DELETE_TIMEOUT", &mut self.timeouts.delete_secs),
            ("OVERPROV_DELETE_POLL", &mut self.timeouts.delete_poll_secs),
        ];
        for (key, slot) in timeouts {
            if let Some(secs) = lookup(key) {
                *slot = parse_var(key, &secs)?;
            }
        }

        // Templates
        if let Some(path) = lookup("OVERPROV_POD_TEMPLATE") {
            self.templates.pod = Some(PathBuf::from(path));
        }

        // Logging
        if let Some(level) = lookup("OVERPROV_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(path) = lookup("OVERPROV_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(path);
            self.logging.file_logging_enabled = true;
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.namespace.trim().is_empty() {
            return Err(ConfigError::Validation("Namespace cannot be empty".to_string()));
        }

        if self.storage.margin_gb == 0 {
            return Err(ConfigError::Validation(
                "Margin must be greater than 0 GB".to_string(),
            ));
        }

        if self.storage.interface_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Pool or filesystem name cannot be empty".to_string(),
            ));
        }

        if self.verify.mount_path.is_empty() {
            return Err(ConfigError::Validation("Mount path cannot be empty".to_string()));
        }

        let timeouts = [
            ("pod_running_secs", self.timeouts.pod_running_secs),
            ("pod_poll_secs", self.timeouts.pod_poll_secs),
            ("pvc_bound_secs", self.timeouts.pvc_bound_secs),
            ("delete_secs", self.timeouts.delete_secs),
            ("delete_poll_secs", self.timeouts.delete_poll_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Validation(format!(
                "timeouts.{} must be greater than 0",
                name
            )));
        }

        self.verify
            .tolerance()
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Validation(format!("{}='{}': {}", key, value, e)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Validation(format!(
            "{}='{}': expected true or false",
            key, value
        ))),
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Failed to read configuration file
    FileRead(PathBuf, String),
    /// Failed to parse configuration
    Parse(String),
    /// Configuration validation failed
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, err) => {
                write!(f, "Failed to read config file {:?}: {}", path, err)
            }
            ConfigError::Parse(err) => write!(f, "Failed to parse config: {}", err),
            ConfigError::Validation(err) => write!(f, "Config validation failed: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}
