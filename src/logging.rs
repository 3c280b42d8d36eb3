//! Logging setup: console output plus an optional rotating log file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// File name prefix of rotated log files.
pub const LOG_FILE_PREFIX: &str = "market_profile";

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "market_profile=debug"); RUST_LOG wins when set
    pub level_filter: String,
    /// Whether to include timestamps in console output
    pub console_timestamps: bool,
    /// Emit console records as JSON
    pub console_json: bool,
    /// Directory for log files; no file output when unset
    pub log_dir: Option<String>,
    pub rotation: LogRotation,
    /// Whether to use JSON format for file logs (structured)
    pub file_json_format: bool,
}

/// Log rotation configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level_filter: "info,market_profile=info".to_string(),
            console_timestamps: true,
            console_json: false,
            log_dir: None,
            rotation: LogRotation::Daily,
            file_json_format: true,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), String> {
        EnvFilter::try_new(&self.level_filter)
            .map(|_| ())
            .map_err(|e| format!("invalid level_filter '{}': {}", self.level_filter, e))
    }
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync>> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.level_filter)?),
    }
}

/// Install the global subscriber.
///
/// Returns the file writer guard when file output is enabled; it must be kept
/// alive for buffered records to be flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let console_timer = if config.console_timestamps {
        ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string())
    } else {
        ChronoUtc::new(String::new())
    };

    let console_layer = if config.console_json {
        fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_timer(console_timer)
            .with_filter(env_filter(config)?)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_level(true)
            .with_target(true)
            .with_timer(console_timer)
            .with_filter(env_filter(config)?)
            .boxed()
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_name = format!("{}.log", LOG_FILE_PREFIX);
            let appender = match config.rotation {
                LogRotation::Daily => tracing_appender::rolling::daily(dir, file_name),
                LogRotation::Hourly => tracing_appender::rolling::hourly(dir, file_name),
                LogRotation::Never => tracing_appender::rolling::never(dir, file_name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = if config.file_json_format {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_thread_names(true)
                    .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
                    .with_filter(env_filter(config)?)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_thread_names(true)
                    .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string()))
                    .with_filter(env_filter(config)?)
                    .boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        log_dir = ?config.log_dir,
        rotation = ?config.rotation,
        "Logging initialized"
    );

    Ok(guard)
}

/// Best-effort subscriber for tests; output is captured by the test harness.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Log files written by [`init_logging`] in `log_dir`, sorted by name.
pub fn current_log_files(log_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(log_dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    path.is_file()
                        && path
                            .file_name()
                            .and_then(|name| name.to_str())
                            .map(|name| name.starts_with(LOG_FILE_PREFIX) && name.contains(".log"))
                            .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();

    files.sort();
    files
}
