//! Error types for the courier.

use thiserror::Error;

/// Courier error type.
#[derive(Error, Debug)]
pub enum CourierError {
    /// Registration input rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Job listing request failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Job listing response was not the expected JSON
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Event channel error
    #[error("Channel error: {0}")]
    Channel(#[from] fiscal_channel::ChannelError),
}

/// Result type for courier operations.
pub type CourierResult<T> = Result<T, CourierError>;
