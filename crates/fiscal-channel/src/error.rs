//! Channel error types.

use thiserror::Error;

/// Channel error type.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Endpoint URL could not be parsed or converted
    #[error("Invalid channel URL: {0}")]
    InvalidUrl(String),

    /// Malformed or unsupported frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server refused the namespace connection
    #[error("Handshake rejected: {0}")]
    Handshake(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Not connected error
    #[error("Not connected to event channel")]
    NotConnected,

    /// No frame within the heartbeat deadline
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// The connection task is gone
    #[error("Channel closed")]
    Closed,
}

impl From<url::ParseError> for ChannelError {
    fn from(e: url::ParseError) -> Self {
        ChannelError::InvalidUrl(e.to_string())
    }
}

/// Result type alias using ChannelError.
pub type ChannelResult<T> = Result<T, ChannelError>;
