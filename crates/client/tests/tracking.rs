//! Tracking-loop tests over the in-process creator and event source.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;

use tabula_client::{
    track_job, ClientError, EventSource, EventStream, HubEventSource, InProcessJobCreator,
    JobCreator,
};
use tabula_core::rules::RuleSet;
use tabula_core::status;
use tabula_core::types::JobId;
use tabula_events::EventHub;
use tabula_jobs::{
    EngineInput, JobError, JobRegistry, JobService, NamedFile, ProgressReporter, TransformEngine,
    TransformOptions, TransformRequest,
};

/// Scripted engine; waits for a subscriber before emitting so the tracking
/// loop observes the full stream.
struct ScriptedEngine {
    hub: Arc<EventHub>,
    steps: Vec<(&'static str, u8)>,
    warnings: Vec<String>,
    fail_with: Option<&'static str>,
}

#[async_trait]
impl TransformEngine for ScriptedEngine {
    async fn run(
        &self,
        _input: EngineInput,
        reporter: &ProgressReporter,
    ) -> Result<Vec<u8>, JobError> {
        for _ in 0..500 {
            if self.hub.subscriber_count(reporter.job_id()).await > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        for warning in &self.warnings {
            reporter.warn(warning.clone()).await;
        }
        for (label, percent) in &self.steps {
            reporter.progress(label, *percent).await;
        }
        match self.fail_with {
            Some(message) => Err(JobError::Engine(message.to_string())),
            None => Ok(b"result".to_vec()),
        }
    }
}

struct Fixture {
    creator: InProcessJobCreator,
    source: HubEventSource,
}

fn fixture(steps: Vec<(&'static str, u8)>, warnings: Vec<String>, fail_with: Option<&'static str>) -> Fixture {
    let registry = Arc::new(JobRegistry::new());
    let hub = Arc::new(EventHub::default());
    let engine = ScriptedEngine {
        hub: Arc::clone(&hub),
        steps,
        warnings,
        fail_with,
    };
    let service = Arc::new(JobService::new(
        Arc::clone(&registry),
        Arc::clone(&hub),
        Arc::new(engine),
    ));
    Fixture {
        creator: InProcessJobCreator::new(service),
        source: HubEventSource::new(hub).with_registry(registry),
    }
}

fn request() -> TransformRequest {
    TransformRequest {
        rules: RuleSet::default(),
        source: NamedFile {
            filename: "data.xlsx".into(),
            bytes: b"source".to_vec(),
        },
        template: None,
        options: TransformOptions::default(),
    }
}

#[tokio::test]
async fn successful_cycle_ends_at_100_with_download() {
    let f = fixture(vec![("Parsing", 20), ("Writing", 80)], vec![], None);
    let view = track_job(&f.creator, &f.source, request()).await.unwrap();

    assert_eq!(view.percent, 100);
    assert_eq!(view.status_text, status::STATUS_DONE);
    assert!(view.warnings.is_empty());
    assert!(!view.bar_failed);
    assert_eq!(view.error_banner, None);
    let download = view.download.expect("successful run must expose a download");
    assert!(download.starts_with("/download/"), "{download}");
}

#[tokio::test]
async fn failed_run_has_no_download_but_keeps_warnings() {
    let f = fixture(
        vec![("Parsing", 20)],
        vec!["row 3 missing".to_string()],
        Some("bad header"),
    );
    let view = track_job(&f.creator, &f.source, request()).await.unwrap();

    assert_eq!(view.percent, 100);
    assert!(view.bar_failed);
    assert!(status::is_failure(&view.status_text), "{}", view.status_text);
    assert_eq!(view.warnings, vec!["row 3 missing".to_string()]);
    assert_eq!(view.download, None);
}

#[tokio::test]
async fn warning_overflow_is_capped_through_the_full_stack() {
    let warnings: Vec<String> = (1..=75).map(|i| format!("warning {i}")).collect();
    let f = fixture(vec![("Working", 50)], warnings, None);
    let view = track_job(&f.creator, &f.source, request()).await.unwrap();

    assert_eq!(view.warnings.len(), 51);
    assert!(view.warnings[50].contains("25"), "{}", view.warnings[50]);
}

struct RefusingCreator;

#[async_trait]
impl JobCreator for RefusingCreator {
    async fn create_job(&self, _request: &TransformRequest) -> Result<JobId, ClientError> {
        Err(ClientError::Submission("bad file".to_string()))
    }
}

struct EmptyIdCreator;

#[async_trait]
impl JobCreator for EmptyIdCreator {
    async fn create_job(&self, _request: &TransformRequest) -> Result<JobId, ClientError> {
        Ok(String::new())
    }
}

struct EndlessSilence;

#[async_trait]
impl EventSource for EndlessSilence {
    async fn join(&self, _job_id: &str) -> Result<EventStream, ClientError> {
        Ok(stream::empty().boxed())
    }
}

#[tokio::test]
async fn submission_error_yields_banner_and_hidden_progress() {
    let view = track_job(&RefusingCreator, &EndlessSilence, request())
        .await
        .unwrap();

    assert_eq!(view.error_banner.as_deref(), Some("Submission failed: bad file"));
    assert!(!view.progress_visible);
    assert_eq!(view.download, None);
    assert_eq!(view.percent, 0);
}

#[tokio::test]
async fn empty_job_id_is_a_submission_failure() {
    let view = track_job(&EmptyIdCreator, &EndlessSilence, request())
        .await
        .unwrap();
    assert!(view.error_banner.is_some());
    assert!(!view.progress_visible);
}

#[tokio::test]
async fn stream_ending_without_completion_is_an_error() {
    let f = fixture(vec![], vec![], None);
    // Real creator, silent source: the job id exists but no events ever
    // arrive and the stream ends immediately.
    let result = track_job(&f.creator, &EndlessSilence, request()).await;
    assert_matches!(result, Err(ClientError::StreamEnded(_)));
}

#[tokio::test]
async fn late_join_on_a_finished_job_reconciles_from_the_snapshot() {
    let registry = Arc::new(JobRegistry::new());
    let hub = Arc::new(EventHub::default());
    // Engine that never waits: with no subscriber, every event is dropped
    // by the no-replay channel before the client joins.
    struct InstantEngine;
    #[async_trait]
    impl TransformEngine for InstantEngine {
        async fn run(
            &self,
            _input: EngineInput,
            reporter: &ProgressReporter,
        ) -> Result<Vec<u8>, JobError> {
            reporter.progress("Fast", 50).await;
            Ok(b"result".to_vec())
        }
    }
    let service = Arc::new(JobService::new(
        Arc::clone(&registry),
        Arc::clone(&hub),
        Arc::new(InstantEngine),
    ));

    // Let the whole run finish before joining.
    let creator = InProcessJobCreator::new(Arc::clone(&service));
    let job_id = creator.create_job(&request()).await.unwrap();
    for _ in 0..500 {
        if registry.snapshot(&job_id).await.is_some_and(|s| s.terminal) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let source = HubEventSource::new(hub).with_registry(Arc::clone(&registry));
    let mut stream = source.join(&job_id).await.unwrap();
    let first = stream.next().await.expect("snapshot event expected");
    assert!(first.is_terminal());
}
