//! Pending job retrieval from the job service.

use crate::jobs::{JobBatch, JobListResponse};
use crate::CourierResult;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info};

/// Header naming the calling application.
pub const APP_ID_HEADER: &str = "X-App-Id";
/// Header naming the calling organization.
pub const ORGANIZATION_ID_HEADER: &str = "X-Organization-Id";

/// Anything that can list the jobs currently waiting.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// One listing request. An empty batch means nothing to print.
    async fn fetch_pending(&self) -> CourierResult<JobBatch>;
}

/// Where and as whom to ask for jobs.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub api_url: String,
    pub app_id: String,
    pub organization_id: String,
    pub request_timeout: Duration,
}

/// Job source backed by the HTTP job listing endpoint.
#[derive(Debug, Clone)]
pub struct HttpJobFetcher {
    http_client: reqwest::Client,
    config: FetcherConfig,
}

impl HttpJobFetcher {
    pub fn new(config: FetcherConfig) -> CourierResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }
}

#[async_trait]
impl JobSource for HttpJobFetcher {
    async fn fetch_pending(&self) -> CourierResult<JobBatch> {
        debug!(url = %self.config.api_url, "Fetching pending print jobs");

        // The listing endpoint takes no body; the envelope status decides, not HTTP.
        let response = self
            .http_client
            .post(&self.config.api_url)
            .header(CONTENT_TYPE, "application/json")
            .header(APP_ID_HEADER, &self.config.app_id)
            .header(ORGANIZATION_ID_HEADER, &self.config.organization_id)
            .send()
            .await?;

        let http_status = response.status();
        let bytes = response.bytes().await?;
        let listing: JobListResponse = serde_json::from_slice(&bytes)?;
        debug!(
            http_status = http_status.as_u16(),
            status = listing.status,
            "Job listing received"
        );

        let batch = listing.into_batch()?;
        if !batch.is_empty() {
            info!(batch_id = %batch.id(), jobs = batch.len(), "Fetched print jobs");
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::harness::MockJobApi;
    use crate::CourierError;

    fn fetcher(api_url: String) -> HttpJobFetcher {
        HttpJobFetcher::new(FetcherConfig {
            api_url,
            app_id: "exagon".to_string(),
            organization_id: "exagon".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_sends_identity_headers() {
        let api = MockJobApi::start(
            "200 OK",
            r#"{"status":200,"data":[{"url":"http://10.0.0.1/service.cgi","body":"A"}]}"#,
        )
        .await;

        let batch = fetcher(api.url()).fetch_pending().await.unwrap();
        assert_eq!(batch.len(), 1);

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.header("x-app-id"), Some("exagon"));
        assert_eq!(request.header("x-organization-id"), Some("exagon"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn test_envelope_status_wins_over_http_status() {
        let api = MockJobApi::start(
            "404 Not Found",
            r#"{"status":200,"data":[{"url":"http://10.0.0.1/service.cgi","body":"A"}]}"#,
        )
        .await;
        assert_eq!(fetcher(api.url()).fetch_pending().await.unwrap().len(), 1);

        let api = MockJobApi::start(
            "200 OK",
            r#"{"status":404,"message":"none","data":[{"url":"http://10.0.0.1/service.cgi","body":"A"}]}"#,
        )
        .await;
        assert!(fetcher(api.url()).fetch_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_error() {
        let api = MockJobApi::start("502 Bad Gateway", "<html>bad gateway</html>").await;
        assert!(matches!(
            fetcher(api.url()).fetch_pending().await,
            Err(CourierError::Decode(_))
        ));
    }
}
