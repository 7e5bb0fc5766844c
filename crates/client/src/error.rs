use tabula_core::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The job-creation call failed before a job id existed: network
    /// error, server-side validation error, or malformed response.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// A job id was obtained but the channel join could not be completed.
    #[error("Channel join failed: {0}")]
    Subscription(String),

    /// The event stream ended without delivering a terminal event.
    #[error("Event stream for job {0} ended before completion")]
    StreamEnded(JobId),
}
