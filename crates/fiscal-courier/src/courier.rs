//! Raise queue and the worker that drains it.
//!
//! Each raise runs fetch then dispatch to completion before the next raise is
//! looked at, so batches never interleave.

use crate::dispatch::{BatchReport, Dispatcher};
use crate::fetcher::JobSource;
use crate::jobs::RaisePayload;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One received raise event.
#[derive(Debug, Clone)]
pub struct RaiseTrigger {
    pub received_at: DateTime<Utc>,
    pub payload: RaisePayload,
}

impl RaiseTrigger {
    pub fn new(payload: RaisePayload) -> Self {
        Self {
            received_at: Utc::now(),
            payload,
        }
    }
}

/// What the worker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourierStatus {
    Idle,
    Fetching,
    Draining { batch_id: Uuid, remaining: usize },
}

/// Result of offering a raise to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Queued,
    /// The queue is at capacity; the raise was dropped.
    QueueFull,
    /// The worker has stopped.
    Closed,
}

/// Fetches and dispatches jobs for each raise.
pub struct Courier {
    source: Arc<dyn JobSource>,
    dispatcher: Dispatcher,
    status: watch::Sender<CourierStatus>,
}

impl Courier {
    pub fn new(source: Arc<dyn JobSource>, dispatcher: Dispatcher) -> Self {
        let (status, _) = watch::channel(CourierStatus::Idle);
        Self {
            source,
            dispatcher,
            status,
        }
    }

    /// Start the worker with a raise queue of `capacity` entries.
    pub fn spawn(self, capacity: usize) -> CourierHandle {
        let (triggers, rx) = mpsc::channel(capacity.max(1));
        let status = self.status.subscribe();
        let task = tokio::spawn(self.run(rx));
        CourierHandle {
            triggers,
            status,
            task,
        }
    }

    async fn run(self, mut triggers: mpsc::Receiver<RaiseTrigger>) {
        info!("Courier started");
        while let Some(trigger) = triggers.recv().await {
            self.process(trigger).await;
        }
        info!("Courier stopped");
    }

    /// Handle one raise: fetch, then dispatch whatever came back.
    ///
    /// Returns `None` when the fetch failed or found nothing.
    pub async fn process(&self, trigger: RaiseTrigger) -> Option<BatchReport> {
        debug!(
            received_at = %trigger.received_at,
            pos_id = ?trigger.payload.pos_id,
            "Processing printer raise"
        );
        self.status.send_replace(CourierStatus::Fetching);

        let report = match self.source.fetch_pending().await {
            Ok(batch) if batch.is_empty() => {
                debug!("No pending jobs for raise");
                None
            }
            Ok(batch) => {
                let batch_id = batch.id();
                let status = &self.status;
                Some(
                    self.dispatcher
                        .run_observed(batch, |remaining| {
                            status.send_replace(CourierStatus::Draining {
                                batch_id,
                                remaining,
                            });
                        })
                        .await,
                )
            }
            Err(e) => {
                error!(error = %e, "Error handling printer raise");
                None
            }
        };

        self.status.send_replace(CourierStatus::Idle);
        report
    }
}

/// Producer side of the raise queue.
pub struct CourierHandle {
    triggers: mpsc::Sender<RaiseTrigger>,
    status: watch::Receiver<CourierStatus>,
    task: JoinHandle<()>,
}

impl CourierHandle {
    /// Queue a raise without waiting.
    pub fn trigger(&self, trigger: RaiseTrigger) -> TriggerOutcome {
        match self.triggers.try_send(trigger) {
            Ok(()) => TriggerOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(trigger)) => {
                warn!(
                    pos_id = ?trigger.payload.pos_id,
                    capacity = self.triggers.max_capacity(),
                    "Raise queue full, dropping raise"
                );
                TriggerOutcome::QueueFull
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("Courier is not running, dropping raise");
                TriggerOutcome::Closed
            }
        }
    }

    pub fn status(&self) -> CourierStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<CourierStatus> {
        self.status.clone()
    }

    /// Raises waiting behind the current one.
    pub fn queued(&self) -> usize {
        self.triggers.max_capacity() - self.triggers.capacity()
    }

    /// Stop immediately, abandoning any batch in progress.
    ///
    /// Returns what the worker was doing when it was stopped.
    pub async fn shutdown(self) -> CourierStatus {
        let last = self.status();
        match last {
            CourierStatus::Draining {
                batch_id,
                remaining,
            } => warn!(
                batch_id = %batch_id,
                remaining,
                "Shutting down mid-batch, undelivered jobs are left to the job service"
            ),
            CourierStatus::Fetching => warn!("Shutting down during a job fetch"),
            CourierStatus::Idle => debug!("Courier idle at shutdown"),
        }
        let queued = self.queued();
        if queued > 0 {
            warn!(queued, "Dropping queued raises at shutdown");
        }

        self.task.abort();
        let _ = self.task.await;
        last
    }
}
