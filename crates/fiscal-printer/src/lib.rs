//! Fiscal printer endpoint client.
//!
//! One delivery is one HTTP POST of a raw XML payload. Every failure, including
//! transport errors, is normalized into [`DeliveryOutcome::Failed`]; callers
//! decide how to react.

mod client;
mod error;
mod self_test;

pub use client::{DeliveryOutcome, HttpPrinterClient, PrinterEndpoint, XML_CONTENT_TYPE};
pub use error::DeliveryError;
pub use self_test::{self_test_url, SelfTestReport, SELF_TEST_PAYLOAD};
