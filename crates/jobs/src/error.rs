use tabula_core::error::CoreError;
use tabula_core::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// A domain-level error from `tabula_core` (rule validation, mostly).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The transformation engine failed mid-run.
    #[error("{0}")]
    Engine(String),

    /// The registry has no record for this job.
    #[error("Job not found: {0}")]
    NotFound(JobId),
}
