//! HTTP client for printer deliveries.

use crate::DeliveryError;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

/// Content type of every printer delivery.
pub const XML_CONTENT_TYPE: &str = "application/xml";

/// Result of one delivery attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The printer answered with a 2xx status.
    Delivered { status: u16 },
    /// The delivery failed; nothing was retried.
    Failed(DeliveryError),
}

impl DeliveryOutcome {
    /// True for [`DeliveryOutcome::Delivered`].
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Something that can receive a raw payload at a URL.
#[async_trait]
pub trait PrinterEndpoint: Send + Sync {
    /// Deliver `body` to `url` exactly once. Never panics or propagates errors.
    async fn send(&self, url: &str, body: &str) -> DeliveryOutcome;
}

/// Printer endpoint backed by `reqwest`.
#[derive(Clone, Debug, Default)]
pub struct HttpPrinterClient {
    http_client: reqwest::Client,
}

impl HttpPrinterClient {
    /// Create a client with the platform default timeouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn post_xml(&self, url: &str, body: &str) -> Result<u16, DeliveryError> {
        let target = parse_target(url)?;

        let response = self
            .http_client
            .post(target)
            .header(reqwest::header::CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        Ok(status.as_u16())
    }
}

#[async_trait]
impl PrinterEndpoint for HttpPrinterClient {
    async fn send(&self, url: &str, body: &str) -> DeliveryOutcome {
        debug!(url = %url, bytes = body.len(), "Posting payload to printer");

        match self.post_xml(url, body).await {
            Ok(status) => DeliveryOutcome::Delivered { status },
            Err(e) => DeliveryOutcome::Failed(e),
        }
    }
}

fn parse_target(url: &str) -> Result<Url, DeliveryError> {
    let parsed = Url::parse(url).map_err(|e| DeliveryError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DeliveryError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(parsed)
}
