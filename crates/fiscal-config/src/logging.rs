//! Logging initialization.
//!
//! Human-readable compact lines go to stderr. When a log path is configured,
//! every event is also appended as one JSON object per line so the file can be
//! tailed or fed to `jq`.

use crate::{ConfigError, ConfigResult};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written once at startup.
    pub service_name: String,
    /// Default filter when `RUST_LOG` is not set.
    pub default_level: String,
    /// Optional JSON-lines log file.
    pub log_path: Option<PathBuf>,
    /// Emit compact lines on stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "fiscal-relay".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

/// Filter directive for a configured level. Unknown names fall back to `info`.
fn default_directive(level: &str) -> String {
    let level = parse_level(level).unwrap_or(tracing::Level::INFO);
    LevelFilter::from_level(level).to_string()
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(default_level)))
}

/// Install the global tracing subscriber.
///
/// Fails if the log file cannot be opened or a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> ConfigResult<()> {
    let file_layer = match &config.log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(env_filter(&config.default_level)),
            )
        }
        None => None,
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| ConfigError::Invalid(format!("logging already initialized: {e}")))?;

    tracing::info!(
        service = %config.service_name,
        pid = std::process::id(),
        log_path = ?config.log_path,
        "logging initialized"
    );

    Ok(())
}

/// Parse a log level name, accepting `warning` for `warn`.
pub fn parse_level(level: &str) -> Option<tracing::Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(tracing::Level::TRACE),
        "debug" => Some(tracing::Level::DEBUG),
        "info" => Some(tracing::Level::INFO),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "error" => Some(tracing::Level::ERROR),
        _ => None,
    }
}
