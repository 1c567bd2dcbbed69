//! Integration tests for the courier.
//!
//! - `harness.rs`     - Mock printer, mock job source, recording announcer, mock job API
//! - `dispatch.rs`    - Delivery order, body unescaping, pacing, failure isolation
//! - `queue.rs`       - Raise queue: no interleaving, overflow, shutdown mid-batch
//! - `session.rs`     - Registration lifecycle and raise handling in the relay session
//! - `end_to_end.rs`  - Real HTTP fetcher and printer client against local servers
