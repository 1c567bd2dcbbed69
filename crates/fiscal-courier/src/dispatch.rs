//! Sequential, paced delivery of a job batch.

use crate::jobs::JobBatch;
use fiscal_printer::{DeliveryOutcome, PrinterEndpoint};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Totals for one dispatched batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Delivers jobs one at a time with a fixed pause between consecutive jobs.
#[derive(Clone)]
pub struct Dispatcher {
    printer: Arc<dyn PrinterEndpoint>,
    settle_pause: Duration,
}

impl Dispatcher {
    pub fn new(printer: Arc<dyn PrinterEndpoint>, settle_pause: Duration) -> Self {
        Self {
            printer,
            settle_pause,
        }
    }

    pub fn settle_pause(&self) -> Duration {
        self.settle_pause
    }

    /// Deliver every job in order. Failures are logged and skipped.
    pub async fn run(&self, batch: JobBatch) -> BatchReport {
        self.run_observed(batch, |_| {}).await
    }

    /// Like [`Dispatcher::run`], calling `on_progress` with the number of jobs
    /// not yet attempted: once up front, then after every attempt.
    pub async fn run_observed(
        &self,
        batch: JobBatch,
        mut on_progress: impl FnMut(usize) + Send,
    ) -> BatchReport {
        let batch_id = batch.id();
        let total = batch.len();
        let mut report = BatchReport {
            batch_id,
            attempted: 0,
            delivered: 0,
            failed: 0,
        };

        on_progress(total);
        for (index, job) in batch.into_jobs().into_iter().enumerate() {
            info!(
                batch_id = %batch_id,
                job = index + 1,
                total,
                url = %job.target_url,
                "Executing print job"
            );

            let body = job.unescaped_body();
            report.attempted += 1;
            match self.printer.send(&job.target_url, &body).await {
                DeliveryOutcome::Delivered { status } => {
                    report.delivered += 1;
                    info!(batch_id = %batch_id, job = index + 1, status, "Print job delivered");
                }
                DeliveryOutcome::Failed(e) => {
                    report.failed += 1;
                    error!(
                        batch_id = %batch_id,
                        job = index + 1,
                        url = %job.target_url,
                        error = %e,
                        "Print job failed"
                    );
                }
            }
            on_progress(total - index - 1);

            if index + 1 < total {
                info!(
                    batch_id = %batch_id,
                    pause_secs = self.settle_pause.as_secs_f64(),
                    "Waiting before next job"
                );
                tokio::time::sleep(self.settle_pause).await;
            }
        }

        info!(
            batch_id = %batch_id,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "Batch complete"
        );
        report
    }
}
