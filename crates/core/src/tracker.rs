//! Client-side progress reconciliation.
//!
//! [`JobTracker`] is a pure state machine: submission handlers and channel
//! subscriptions feed it, and it is the only writer of the display surface
//! ([`ProgressView`]). One tracker tracks exactly one job per cycle; a new
//! submission restarts the cycle with a fresh job id.

use crate::events::{CompletionPayload, WireEvent};
use crate::status;
use crate::types::JobId;

/// Lifecycle states of one tracked submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Submitting,
    Tracking,
    Succeeded,
    Failed,
}

impl TrackerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TrackerState::Succeeded | TrackerState::Failed)
    }
}

/// The single observable display surface of a tracked job.
///
/// Only [`JobTracker`] mutates this; everything else reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressView {
    /// Displayed percent, 0-100.
    pub percent: u8,
    /// Displayed status line.
    pub status_text: String,
    /// Whether the progress indicator is drawn in the failure colour.
    pub bar_failed: bool,
    /// Whether the progress surface is shown at all (hidden on
    /// pre-tracking submission errors).
    pub progress_visible: bool,
    /// Capped warning lines: at most [`status::MAX_WARNINGS_SHOWN`]
    /// verbatim entries plus one summary line for the remainder.
    pub warnings: Vec<String>,
    /// Download reference, present only after a successful completion.
    pub download: Option<String>,
    /// Blocking submission-error banner.
    pub error_banner: Option<String>,
}

/// The download reference for a finished job.
pub fn download_path(job_id: &str) -> String {
    format!("/download/{job_id}")
}

/// Reconciles the event stream of one job into a [`ProgressView`].
#[derive(Debug)]
pub struct JobTracker {
    state: TrackerState,
    job_id: Option<JobId>,
    view: ProgressView,
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            state: TrackerState::Idle,
            job_id: None,
            view: ProgressView::default(),
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn view(&self) -> &ProgressView {
        &self.view
    }

    /// The job id of the current cycle, once tracking has begun.
    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    /// Derived error flag: whether the displayed status carries the
    /// failure marker.
    pub fn has_failure_status(&self) -> bool {
        status::is_failure(&self.view.status_text)
    }

    /// Start a new submission cycle.
    ///
    /// Clears every terminal artefact of the previous cycle (error banner,
    /// download reference, warning list, failure colour) and shows the
    /// indeterminate upload message at 0%.
    pub fn begin_submission(&mut self) {
        self.state = TrackerState::Submitting;
        self.job_id = None;
        self.view = ProgressView {
            percent: 0,
            status_text: status::STATUS_UPLOADING.to_string(),
            bar_failed: false,
            progress_visible: true,
            warnings: Vec::new(),
            download: None,
            error_banner: None,
        };
    }

    /// The submission itself failed before a job id existed (network or
    /// validation error, malformed response, or failed channel join).
    ///
    /// Terminal for this cycle: the banner is shown and the progress
    /// surface hidden; a fresh submission recovers.
    pub fn submission_failed(&mut self, message: impl Into<String>) {
        self.state = TrackerState::Failed;
        self.view.progress_visible = false;
        self.view.error_banner = Some(message.into());
    }

    /// A job id was obtained and the channel joined; wait for events.
    pub fn begin_tracking(&mut self, job_id: impl Into<JobId>) {
        debug_assert_eq!(self.state, TrackerState::Submitting);
        self.state = TrackerState::Tracking;
        self.job_id = Some(job_id.into());
    }

    /// Feed one channel event into the state machine.
    ///
    /// Events for other job ids are ignored, as is anything arriving in a
    /// terminal state — replaying a completion is a no-op.
    pub fn handle_event(&mut self, event: &WireEvent) {
        if self.state != TrackerState::Tracking {
            return;
        }
        if self.job_id.as_ref() != Some(event.task_id()) {
            return;
        }

        match event {
            WireEvent::StatusUpdate(payload) => {
                self.view.status_text = payload
                    .status
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| status::STATUS_PROCESSING.to_string());
                self.view.percent = payload.progress.unwrap_or(0);
            }
            WireEvent::TaskComplete(payload) => self.complete(payload),
        }
    }

    /// Apply the terminal event. `result_ready` is checked before the
    /// failure marker, so a result-ready completion with a failure-marked
    /// status still succeeds.
    fn complete(&mut self, payload: &CompletionPayload) {
        self.view.percent = 100;
        self.view.status_text = payload
            .status
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| status::STATUS_PROCESSING.to_string());
        self.view.warnings = cap_warnings(&payload.warnings);

        if payload.result_ready {
            self.state = TrackerState::Succeeded;
            let job_id = self.job_id.as_deref().unwrap_or_default();
            self.view.download = Some(download_path(job_id));
        } else {
            self.state = TrackerState::Failed;
            self.view.bar_failed = true;
        }
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// First [`status::MAX_WARNINGS_SHOWN`] warnings verbatim, then one summary
/// line naming how many were omitted.
fn cap_warnings(warnings: &[String]) -> Vec<String> {
    let mut shown: Vec<String> = warnings
        .iter()
        .take(status::MAX_WARNINGS_SHOWN)
        .cloned()
        .collect();
    if warnings.len() > status::MAX_WARNINGS_SHOWN {
        shown.push(status::omitted_warnings_line(
            warnings.len() - status::MAX_WARNINGS_SHOWN,
        ));
    }
    shown
}
