//! In-memory job registry — the single authoritative mutable job state on
//! the server.
//!
//! During a run the [`ProgressReporter`](crate::reporter::ProgressReporter)
//! is the registry's only writer. Late channel joiners are reconciled from
//! [`JobSnapshot`]s, the download handler reads the stored result, and the
//! retention sweep removes terminal records past their horizon.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use tabula_core::events::{CompletionPayload, ProgressPayload, WireEvent};
use tabula_core::types::JobId;
use tabula_core::{status, CoreError};

use crate::error::JobError;

/// The stored output of a successful run.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// Result workbook bytes.
    pub bytes: Vec<u8>,
    /// Original template filename, used to build the attachment name.
    pub template_filename: String,
}

#[derive(Debug)]
struct JobRecord {
    status: String,
    progress: u8,
    warnings: Vec<String>,
    terminal: bool,
    result: Option<JobResult>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    fn new() -> Self {
        Self {
            status: status::STATUS_QUEUED.to_string(),
            progress: 0,
            warnings: Vec::new(),
            terminal: false,
            result: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Clone of a record's observable fields, as served by the status endpoint
/// and mirrored to late channel joiners.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub status: String,
    pub progress: u8,
    pub warnings: Vec<String>,
    pub terminal: bool,
    pub result_ready: bool,
}

impl JobSnapshot {
    /// Synthesize the wire event a late joiner should see: the current
    /// progress for a live job, or a reconstructed completion for a
    /// terminal one.
    pub fn to_wire_event(&self, job_id: &str) -> WireEvent {
        if self.terminal {
            WireEvent::TaskComplete(CompletionPayload {
                task_id: job_id.to_string(),
                status: Some(self.status.clone()),
                progress: Some(100),
                warnings: self.warnings.clone(),
                result_ready: self.result_ready,
            })
        } else {
            WireEvent::StatusUpdate(ProgressPayload::new(job_id, &self.status, self.progress))
        }
    }
}

/// Thread-safe map of job id to record; shared via `Arc<JobRegistry>`.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a freshly submitted job (status "queued", 0%).
    pub async fn create(&self, job_id: &str) {
        self.jobs
            .write()
            .await
            .insert(job_id.to_string(), JobRecord::new());
    }

    /// Record a progress step. Fails for unknown or already-terminal jobs.
    pub async fn update_progress(
        &self,
        job_id: &str,
        status: &str,
        progress: u8,
    ) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        if record.terminal {
            return Err(JobError::Core(CoreError::Internal(format!(
                "progress update on terminal job {job_id}"
            ))));
        }
        record.status = status.to_string();
        record.progress = progress;
        Ok(())
    }

    /// Append a warning collected during the run.
    pub async fn append_warning(&self, job_id: &str, warning: impl Into<String>) {
        if let Some(record) = self.jobs.write().await.get_mut(job_id) {
            record.warnings.push(warning.into());
        }
    }

    /// Mark the job successfully finished and store its result.
    ///
    /// Returns the warnings collected during the run, for the completion
    /// event.
    pub async fn finalize_success(
        &self,
        job_id: &str,
        status: &str,
        result: JobResult,
    ) -> Vec<String> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(record) => {
                record.status = status.to_string();
                record.progress = 100;
                record.terminal = true;
                record.result = Some(result);
                record.finished_at = Some(Utc::now());
                record.warnings.clone()
            }
            None => {
                tracing::error!(%job_id, "Finalized a job the registry no longer knows");
                Vec::new()
            }
        }
    }

    /// Mark the job failed; no result is stored.
    pub async fn finalize_failure(&self, job_id: &str, status: &str) -> Vec<String> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(record) => {
                record.status = status.to_string();
                record.progress = 100;
                record.terminal = true;
                record.finished_at = Some(Utc::now());
                record.warnings.clone()
            }
            None => {
                tracing::error!(%job_id, "Finalized a job the registry no longer knows");
                Vec::new()
            }
        }
    }

    /// Observable state of a job, if known.
    pub async fn snapshot(&self, job_id: &str) -> Option<JobSnapshot> {
        self.jobs.read().await.get(job_id).map(|record| JobSnapshot {
            status: record.status.clone(),
            progress: record.progress,
            warnings: record.warnings.clone(),
            terminal: record.terminal,
            result_ready: record.result.is_some(),
        })
    }

    /// The stored result of a successful job, if any.
    pub async fn result(&self, job_id: &str) -> Option<JobResult> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .and_then(|record| record.result.clone())
    }

    /// Drop a single record.
    pub async fn remove(&self, job_id: &str) {
        self.jobs.write().await.remove(job_id);
    }

    /// Remove terminal records that finished before `cutoff`.
    ///
    /// Returns the removed ids so the caller can drop the matching event
    /// rooms. Live jobs are never swept, however old.
    pub async fn sweep(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        let mut jobs = self.jobs.write().await;
        let expired: Vec<JobId> = jobs
            .iter()
            .filter(|(_, record)| {
                record.terminal && record.finished_at.is_some_and(|t| t < cutoff)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            jobs.remove(id);
        }
        expired
    }

    /// Number of known jobs (live and terminal).
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
