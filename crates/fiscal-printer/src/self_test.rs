//! Manual printer self-test.

use crate::{DeliveryError, DeliveryOutcome, HttpPrinterClient, PrinterEndpoint};
use std::fmt;
use tracing::info;

/// Diagnostic receipt: open, print one test line, total, close.
pub const SELF_TEST_PAYLOAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Service><cmd>=K</cmd><cmd>=C1</cmd><cmd>=R1/$3600/(TEST STAMPANTE)</cmd><cmd>=T1/$3600</cmd><cmd>=c</cmd></Service>"#;

/// Service endpoint of a printer reachable at `ip` (host or host:port).
pub fn self_test_url(ip: &str) -> String {
    format!("http://{}/service.cgi", ip.trim())
}

/// Human-readable result of a self-test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestReport {
    pub success: bool,
    pub message: String,
}

impl fmt::Display for SelfTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<DeliveryOutcome> for SelfTestReport {
    fn from(outcome: DeliveryOutcome) -> Self {
        match outcome {
            DeliveryOutcome::Delivered { .. } => SelfTestReport {
                success: true,
                message: "Test successful! Printer responded.".to_string(),
            },
            DeliveryOutcome::Failed(DeliveryError::Status { status, reason }) => SelfTestReport {
                success: false,
                message: format!("Test failed: {status} {reason}"),
            },
            DeliveryOutcome::Failed(e) => SelfTestReport {
                success: false,
                message: format!("Test failed: {e}"),
            },
        }
    }
}

impl HttpPrinterClient {
    /// Send the diagnostic receipt to the printer at `ip`.
    pub async fn self_test(&self, ip: &str) -> SelfTestReport {
        let url = self_test_url(ip);
        info!(url = %url, "Running printer self-test");
        let report = SelfTestReport::from(self.send(&url, SELF_TEST_PAYLOAD).await);
        info!(success = report.success, message = %report.message, "Self-test finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::mock_printer;

    #[test]
    fn test_self_test_url() {
        assert_eq!(self_test_url("192.168.0.99"), "http://192.168.0.99/service.cgi");
        assert_eq!(self_test_url(" 10.0.0.5:8080 "), "http://10.0.0.5:8080/service.cgi");
    }

    #[tokio::test]
    async fn test_self_test_success() {
        let (base, captured) = mock_printer("200 OK").await;
        let ip = base.trim_start_matches("http://");

        let report = HttpPrinterClient::new().self_test(ip).await;
        assert!(report.success);
        assert_eq!(report.to_string(), "Test successful! Printer responded.");

        let requests = captured.lock().unwrap().clone();
        assert_eq!(requests[0].path, "/service.cgi");
        assert_eq!(requests[0].body, SELF_TEST_PAYLOAD);
    }

    #[tokio::test]
    async fn test_self_test_reports_status() {
        let (base, _captured) = mock_printer("404 Not Found").await;
        let ip = base.trim_start_matches("http://");

        let report = HttpPrinterClient::new().self_test(ip).await;
        assert!(!report.success);
        assert_eq!(report.message, "Test failed: 404 Not Found");
    }
}
