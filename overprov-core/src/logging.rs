///! Logging configuration module
///! Console output plus an optional rolling JSON log file

use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSettings;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,              // log level (trace, debug, info, warn, error)
    pub file_path: Option<PathBuf>, // log directory
    pub rotation: LogRotation,      // log rotation policy
    pub ansi: bool,                 // colored console output
}

/// Log rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            rotation: LogRotation::Daily,
            ansi: true,
        }
    }
}

impl From<&LoggingSettings> for LoggingConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            file_path: settings
                .file_logging_enabled
                .then(|| settings.log_dir.clone()),
            ..Default::default()
        }
    }
}

impl LoggingConfig {
    /// Install the global subscriber
    ///
    /// `RUST_LOG` takes precedence over the configured level. The returned
    /// guard flushes the file writer and must be held until exit.
    pub fn init(&self) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        // Console goes to stderr so report output on stdout stays parseable
        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_ansi(self.ansi)
            .with_writer(io::stderr);

        let guard = if let Some(ref path) = self.file_path {
            let file_appender = match self.rotation {
                LogRotation::Hourly => rolling::hourly(path, "overprov.log"),
                LogRotation::Daily => rolling::daily(path, "overprov.log"),
                LogRotation::Never => rolling::never(path, "overprov.log"),
            };

            let (non_blocking, guard) = non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()?;

            Some(guard)
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init()?;

            None
        };

        tracing::debug!("Logging initialized - level: {}", self.level);

        Ok(guard)
    }
}
