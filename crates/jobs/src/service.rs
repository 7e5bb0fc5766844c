//! Submission orchestration.
//!
//! [`JobService::submit`] validates the rule set, registers the job, and
//! spawns the engine on its own tokio task. The spawned task finalizes the
//! registry record and publishes the single `task_complete` event, which
//! closes the job's room.

use std::sync::Arc;

use uuid::Uuid;

use tabula_core::events::{CompletionPayload, WireEvent};
use tabula_core::types::JobId;
use tabula_core::{status, RuleSet};
use tabula_events::EventHub;

use crate::engine::{EngineInput, NamedFile, TransformEngine, TransformOptions};
use crate::error::JobError;
use crate::registry::{JobRegistry, JobResult};
use crate::reporter::ProgressReporter;

/// One job-creation request: rule set, uploaded files, options.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub rules: RuleSet,
    pub source: NamedFile,
    pub template: Option<NamedFile>,
    pub options: TransformOptions,
}

/// Creates and runs transformation jobs against a pluggable engine.
pub struct JobService {
    registry: Arc<JobRegistry>,
    hub: Arc<EventHub>,
    engine: Arc<dyn TransformEngine>,
}

impl JobService {
    pub fn new(
        registry: Arc<JobRegistry>,
        hub: Arc<EventHub>,
        engine: Arc<dyn TransformEngine>,
    ) -> Self {
        Self {
            registry,
            hub,
            engine,
        }
    }

    /// Validate and register a submission, then run it in the background.
    ///
    /// Returns the fresh job id as soon as the job is registered; progress
    /// is observable only through the event channel and the registry.
    pub async fn submit(&self, request: TransformRequest) -> Result<JobId, JobError> {
        request.rules.validate()?;

        let job_id = Uuid::new_v4().to_string();
        self.registry.create(&job_id).await;
        tracing::info!(
            %job_id,
            source = %request.source.filename,
            rule_rows = request.rules.row_count(),
            "Transformation job created"
        );

        let registry = Arc::clone(&self.registry);
        let hub = Arc::clone(&self.hub);
        let engine = Arc::clone(&self.engine);
        let id = job_id.clone();
        tokio::spawn(async move {
            run_job(id, request, registry, hub, engine).await;
        });

        Ok(job_id)
    }
}

/// Drive one engine run to its terminal event.
async fn run_job(
    job_id: JobId,
    request: TransformRequest,
    registry: Arc<JobRegistry>,
    hub: Arc<EventHub>,
    engine: Arc<dyn TransformEngine>,
) {
    let reporter = ProgressReporter::new(job_id.clone(), Arc::clone(&registry), Arc::clone(&hub));

    // The attachment name is built from the template filename; without a
    // template upload the source name stands in.
    let template_filename = request
        .template
        .as_ref()
        .map(|f| f.filename.clone())
        .unwrap_or_else(|| request.source.filename.clone());

    let input = EngineInput {
        source: request.source,
        template: request.template,
        rules: request.rules,
        options: request.options,
    };

    let completion = match engine.run(input, &reporter).await {
        Ok(bytes) => {
            let warnings = registry
                .finalize_success(
                    &job_id,
                    status::STATUS_DONE,
                    JobResult {
                        bytes,
                        template_filename,
                    },
                )
                .await;
            tracing::info!(%job_id, warnings = warnings.len(), "Job completed");
            CompletionPayload::new(job_id.clone(), status::STATUS_DONE, true)
                .with_warnings(warnings)
        }
        Err(e) => {
            tracing::error!(%job_id, error = %e, "Transformation failed");
            let failed_status = status::failure_status(&e.to_string());
            let warnings = registry.finalize_failure(&job_id, &failed_status).await;
            CompletionPayload::new(job_id.clone(), failed_status, false).with_warnings(warnings)
        }
    };

    hub.publish(WireEvent::TaskComplete(completion)).await;
}
