//! Configuration, file system paths and logging for the fiscal printer relay.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_URL, DEFAULT_APP_ID, DEFAULT_LOG_LEVEL, DEFAULT_ORGANIZATION_ID,
    DEFAULT_SETTLE_PAUSE_SECS, DEFAULT_SOCKET_URL,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, parse_level, LogConfig};
pub use paths::Paths;
