//! Delivery error types.

use thiserror::Error;

/// Why a single printer delivery failed.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The target is not an absolute http(s) URL
    #[error("Invalid printer URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection, TLS or I/O failure
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The printer answered outside the 2xx range
    #[error("Printer responded {status} {reason}")]
    Status { status: u16, reason: String },
}
