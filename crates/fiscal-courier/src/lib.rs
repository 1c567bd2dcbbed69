//! Fiscal courier: turns printer raise events into paced printer deliveries.
//!
//! ```text
//! event channel ──raise-printer──▶ raise queue ──▶ job service (fetch)
//!                                                     │
//!                                                     ▼
//!                                 printers ◀── dispatcher (one job at a time,
//!                                                 settle pause in between)
//! ```
//!
//! The relay session also owns the terminal identity and re-announces it on
//! every new connection.

pub mod courier;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod jobs;
pub mod registration;
pub mod relay;

#[cfg(test)]
mod tests;

pub use courier::{Courier, CourierHandle, CourierStatus, RaiseTrigger, TriggerOutcome};
pub use dispatch::{BatchReport, Dispatcher};
pub use error::{CourierError, CourierResult};
pub use fetcher::{FetcherConfig, HttpJobFetcher, JobSource};
pub use jobs::{unescape_body, JobBatch, PrintJob, RaisePayload, RAISE_PRINTER_EVENT};
pub use registration::{Announcer, Identity, RegistrationStatus, RegistrationTracker, REGISTER_EVENT};
pub use relay::{RelayExit, RelaySession};
