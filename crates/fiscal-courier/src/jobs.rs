//! Print jobs, job batches and the payloads that announce them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

/// Event name announcing that jobs are waiting.
pub const RAISE_PRINTER_EVENT: &str = "raise-printer";

/// HTTP-like status code the job service reports for a usable listing.
pub const JOB_LIST_OK: i64 = 200;

/// One print job: a raw payload and the printer it goes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    /// Full printer endpoint, e.g. `http://192.168.0.99/service.cgi`.
    #[serde(rename = "url")]
    pub target_url: String,
    /// Payload as stored by the job service, with `\"` escapes.
    pub body: String,
}

impl PrintJob {
    pub fn new(target_url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            body: body.into(),
        }
    }

    /// The payload as the printer should receive it.
    pub fn unescaped_body(&self) -> String {
        unescape_body(&self.body)
    }
}

/// Replace every escaped quote `\"` with a plain `"`.
///
/// No other escape sequence is interpreted.
pub fn unescape_body(raw: &str) -> String {
    raw.replace("\\\"", "\"")
}

/// Ordered jobs from one fetch, tagged with a correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobBatch {
    id: Uuid,
    jobs: Vec<PrintJob>,
}

impl JobBatch {
    pub fn new(jobs: Vec<PrintJob>) -> Self {
        Self {
            id: Uuid::new_v4(),
            jobs,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> &[PrintJob] {
        &self.jobs
    }

    pub fn into_jobs(self) -> Vec<PrintJob> {
        self.jobs
    }
}

/// Response envelope of the job listing service.
///
/// `data` is kept untyped until the status says the listing is usable, so a
/// failure response carrying an error string still decodes.
#[derive(Debug, Clone, Deserialize)]
pub struct JobListResponse {
    pub status: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl JobListResponse {
    /// Turn the response into a batch.
    ///
    /// Any status other than [`JOB_LIST_OK`] yields an empty batch, whatever
    /// `data` holds. Entries that do not decode are skipped; the rest keep
    /// their order. Only a `data` that is not an array is an error.
    pub fn into_batch(self) -> Result<JobBatch, serde_json::Error> {
        if self.status != JOB_LIST_OK {
            let ignored = match &self.data {
                Value::Array(items) => items.len(),
                Value::Null => 0,
                _ => 1,
            };
            if ignored > 0 {
                warn!(
                    status = self.status,
                    message = ?self.message,
                    ignored,
                    "Job listing returned non-OK status, ignoring its data"
                );
            } else {
                debug!(status = self.status, message = ?self.message, "No jobs to print");
            }
            return Ok(JobBatch::empty());
        }

        let entries: Vec<Value> = match self.data {
            Value::Null => Vec::new(),
            data => serde_json::from_value(data)?,
        };

        let mut jobs = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<PrintJob>(entry) {
                Ok(job) => jobs.push(job),
                Err(e) => warn!(index, error = %e, "Skipping malformed print job"),
            }
        }
        Ok(JobBatch::new(jobs))
    }
}

/// Payload of a raise event. Every field is optional and only used for logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaisePayload {
    pub pos_id: Option<String>,
    pub circuit_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub detail: Option<Value>,
    pub timestamp: Option<String>,
}

impl RaisePayload {
    /// Decode leniently; a payload of the wrong shape becomes an empty one.
    pub fn from_value(value: &Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Raise payload has unexpected shape");
                Self::default()
            }
        }
    }
}
