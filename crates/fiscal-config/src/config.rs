//! Configuration management for the relay.

use crate::logging::parse_level;
use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default event channel endpoint.
pub const DEFAULT_SOCKET_URL: &str = "ws://fp-socket.exagonplus.com";

/// Default job listing endpoint.
pub const DEFAULT_API_URL: &str = "https://api.exagonplus.com/v2/rt_job_print";

/// Default value of the `X-App-Id` header.
pub const DEFAULT_APP_ID: &str = "exagon";

/// Default value of the `X-Organization-Id` header.
pub const DEFAULT_ORGANIZATION_ID: &str = "exagon";

/// Settling pause between two consecutive printer deliveries.
pub const DEFAULT_SETTLE_PAUSE_SECS: u64 = 15;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_LOG_LEVEL: &str = "FISCAL_RELAY_LOG_LEVEL";
const ENV_SOCKET_URL: &str = "FISCAL_RELAY_SOCKET_URL";
const ENV_API_URL: &str = "FISCAL_RELAY_API_URL";

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Event channel endpoint (ws, wss, http or https).
    pub socket_url: String,
    /// Job listing endpoint.
    pub api_url: String,
    /// Application identifier sent to the job API.
    pub app_id: String,
    /// Organization identifier sent to the job API.
    pub organization_id: String,
    /// Pause between consecutive deliveries, in seconds.
    pub settle_pause_secs: u64,
    /// Raise triggers that may wait behind an in-flight batch.
    pub raise_queue_capacity: usize,
    /// First reconnect delay in milliseconds.
    pub reconnect_base_delay_ms: u64,
    /// Reconnect delay cap in milliseconds.
    pub reconnect_max_delay_ms: u64,
    /// Give up after this many consecutive failed reconnects. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    /// Saved circuit identifier.
    pub circuit_id: Option<String>,
    /// Saved POS identifiers, comma separated.
    pub pos_ids: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            app_id: DEFAULT_APP_ID.to_string(),
            organization_id: DEFAULT_ORGANIZATION_ID.to_string(),
            settle_pause_secs: DEFAULT_SETTLE_PAUSE_SECS,
            raise_queue_capacity: 32,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 5000,
            max_reconnect_attempts: None,
            circuit_id: None,
            pos_ids: None,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Override values from the environment. `lookup` resolves a variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(url) = lookup(ENV_SOCKET_URL) {
            self.socket_url = url;
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
    }

    /// Check the log level, both endpoints and the pacing values.
    pub fn validate(&self) -> ConfigResult<()> {
        if parse_level(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "log_level '{}' is not one of trace, debug, info, warn, error",
                self.log_level
            )));
        }

        let socket = self.socket_url()?;
        if !matches!(socket.scheme(), "ws" | "wss" | "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "socket_url has unsupported scheme '{}'",
                socket.scheme()
            )));
        }

        let api = self.api_url()?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "api_url has unsupported scheme '{}'",
                api.scheme()
            )));
        }

        if self.raise_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "raise_queue_capacity must be at least 1".to_string(),
            ));
        }

        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(ConfigError::Invalid(
                "reconnect_base_delay_ms exceeds reconnect_max_delay_ms".to_string(),
            ));
        }

        Ok(())
    }

    /// The event channel endpoint as a parsed URL.
    pub fn socket_url(&self) -> ConfigResult<Url> {
        Url::parse(&self.socket_url).map_err(ConfigError::from)
    }

    /// The job listing endpoint as a parsed URL.
    pub fn api_url(&self) -> ConfigResult<Url> {
        Url::parse(&self.api_url).map_err(ConfigError::from)
    }

    /// The settling pause as a duration.
    pub fn settle_pause(&self) -> Duration {
        Duration::from_secs(self.settle_pause_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.socket_url, DEFAULT_SOCKET_URL);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.app_id, "exagon");
        assert_eq!(config.organization_id, "exagon");
        assert_eq!(config.settle_pause(), Duration::from_secs(15));
        assert!(config.max_reconnect_attempts.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file_partial() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "circuit_id": "C-42", "pos_ids": "1234,5678" }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.circuit_id.as_deref(), Some("C-42"));
        assert_eq!(config.pos_ids.as_deref(), Some("1234,5678"));
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_config_load_reads_file_under_base_dir() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();

        let saved = Config {
            settle_pause_secs: 3,
            circuit_id: Some("C-1".to_string()),
            ..Default::default()
        };
        std::fs::write(paths.config_file(), serde_json::to_string_pretty(&saved).unwrap()).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.settle_pause(), Duration::from_secs(3));
        assert_eq!(loaded.circuit_id.as_deref(), Some("C-1"));
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.settle_pause_secs, DEFAULT_SETTLE_PAUSE_SECS);
    }

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            ("FISCAL_RELAY_LOG_LEVEL", "trace"),
            ("FISCAL_RELAY_SOCKET_URL", "wss://socket.example.com"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.socket_url, "wss://socket.example.com");
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            socket_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        let config = Config {
            api_url: "ftp://api.example.com/jobs".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = Config {
            raise_queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = Config {
            log_level: "warning".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            reconnect_base_delay_ms: 10_000,
            reconnect_max_delay_ms: 1_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
