//! The tracking loop: one submission cycle from dispatch to terminal view.

use futures::StreamExt;

use tabula_core::{JobTracker, ProgressView};
use tabula_jobs::TransformRequest;

use crate::creator::JobCreator;
use crate::error::ClientError;
use crate::source::EventSource;

/// Submit a request, join its event channel, and fold the stream into a
/// [`JobTracker`] until a terminal state is reached.
///
/// Submission and join failures are terminal for the cycle but not errors
/// of the loop: they come back as a `failed` view with the error banner
/// set and no progress surface, exactly as a fresh submission would find
/// the display. The only `Err` is a stream that ends without a terminal
/// event.
///
/// The tracker is owned exclusively for the whole cycle, so a concurrent
/// second submission needs a second loop (and display) of its own.
pub async fn track_job(
    creator: &impl JobCreator,
    events: &impl EventSource,
    request: TransformRequest,
) -> Result<ProgressView, ClientError> {
    let mut tracker = JobTracker::new();
    tracker.begin_submission();

    let job_id = match creator.create_job(&request).await {
        Ok(id) if !id.is_empty() => id,
        Ok(_) => {
            tracker.submission_failed("Server returned an empty job id");
            return Ok(tracker.view().clone());
        }
        Err(e) => {
            tracker.submission_failed(e.to_string());
            return Ok(tracker.view().clone());
        }
    };

    // Join before tracking starts; a failed join means no progress can
    // ever arrive, which is a submission-class failure.
    let mut stream = match events.join(&job_id).await {
        Ok(stream) => stream,
        Err(e) => {
            tracker.submission_failed(e.to_string());
            return Ok(tracker.view().clone());
        }
    };

    tracing::debug!(%job_id, "Tracking job");
    tracker.begin_tracking(job_id.clone());

    while let Some(event) = stream.next().await {
        tracker.handle_event(&event);
        if tracker.state().is_terminal() {
            return Ok(tracker.view().clone());
        }
    }

    Err(ClientError::StreamEnded(job_id))
}
