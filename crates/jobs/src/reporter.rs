//! Progress reporting from a running engine.
//!
//! The reporter is the only writer of a job's registry record while the
//! engine runs, and it orders every write before the matching publish, so
//! the registry never lags behind what subscribers have already seen.

use std::sync::Arc;

use tabula_core::events::{ProgressPayload, WireEvent};
use tabula_core::types::JobId;
use tabula_events::EventHub;

use crate::registry::JobRegistry;

pub struct ProgressReporter {
    job_id: JobId,
    registry: Arc<JobRegistry>,
    hub: Arc<EventHub>,
}

impl ProgressReporter {
    pub fn new(job_id: JobId, registry: Arc<JobRegistry>, hub: Arc<EventHub>) -> Self {
        Self {
            job_id,
            registry,
            hub,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Record a progress step and publish the matching `status_update`.
    pub async fn progress(&self, status: &str, percent: u8) {
        if let Err(e) = self
            .registry
            .update_progress(&self.job_id, status, percent)
            .await
        {
            tracing::error!(job_id = %self.job_id, error = %e, "Failed to record progress");
        }

        tracing::debug!(job_id = %self.job_id, status, percent, "Progress");
        self.hub
            .publish(WireEvent::StatusUpdate(ProgressPayload::new(
                self.job_id.clone(),
                status,
                percent,
            )))
            .await;
    }

    /// Collect a warning; it surfaces on the completion event and the
    /// status endpoint, not as its own wire event.
    pub async fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(job_id = %self.job_id, warning = %message, "Job warning");
        self.registry.append_warning(&self.job_id, message).await;
    }
}
