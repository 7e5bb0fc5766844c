//! Periodic cleanup of finished jobs.
//!
//! Terminal registry records (and their closed event rooms) are held for a
//! retention window so late status polls and downloads still work, then
//! dropped. Runs on a fixed interval until cancelled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use tabula_events::EventHub;

use crate::registry::JobRegistry;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the retention sweep loop.
///
/// Removes terminal records that finished longer than `retention` ago,
/// together with their event rooms. Runs until `cancel` is triggered.
pub async fn run(
    registry: Arc<JobRegistry>,
    hub: Arc<EventHub>,
    retention: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Job retention sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job retention sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now()
                    - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::hours(1));
                let removed = registry.sweep(cutoff).await;
                for job_id in &removed {
                    hub.remove(job_id).await;
                }
                if removed.is_empty() {
                    tracing::debug!("Job retention sweep: nothing to purge");
                } else {
                    tracing::info!(purged = removed.len(), "Job retention sweep: purged jobs");
                }
            }
        }
    }
}
