//! Job submission.
//!
//! The submit endpoint answers 200 with either `{"job_id": ...}` or an
//! in-band `{"error": ...}`; anything else is a malformed response. A
//! creator must never hand back an empty job id.

use std::sync::Arc;

use async_trait::async_trait;

use tabula_core::types::JobId;
use tabula_jobs::{JobService, TransformRequest};

use crate::error::ClientError;

/// Turns a validated request into a job id, or a submission error.
#[async_trait]
pub trait JobCreator: Send + Sync {
    async fn create_job(&self, request: &TransformRequest) -> Result<JobId, ClientError>;
}

/// Creator that invokes the job service directly (same process).
pub struct InProcessJobCreator {
    service: Arc<JobService>,
}

impl InProcessJobCreator {
    pub fn new(service: Arc<JobService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl JobCreator for InProcessJobCreator {
    async fn create_job(&self, request: &TransformRequest) -> Result<JobId, ClientError> {
        self.service
            .submit(request.clone())
            .await
            .map_err(|e| ClientError::Submission(e.to_string()))
    }
}

/// Creator that posts a multipart form to a remote submit endpoint.
pub struct HttpJobCreator {
    client: reqwest::Client,
    /// Server base, e.g. `http://localhost:3000`.
    base_url: String,
}

impl HttpJobCreator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl JobCreator for HttpJobCreator {
    async fn create_job(&self, request: &TransformRequest) -> Result<JobId, ClientError> {
        let rules = serde_json::to_string(&request.rules)
            .map_err(|e| ClientError::Submission(format!("rule serialization: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .text("rules", rules)
            .text(
                "visible_rows_only",
                if request.options.visible_rows_only { "true" } else { "false" },
            )
            .part(
                "source_file",
                reqwest::multipart::Part::bytes(request.source.bytes.clone())
                    .file_name(request.source.filename.clone()),
            );
        if let Some(template) = &request.template {
            form = form
                .part(
                    "template_file",
                    reqwest::multipart::Part::bytes(template.bytes.clone())
                        .file_name(template.filename.clone()),
                )
                .text("template_filename", template.filename.clone());
        }
        if let Some(post_function) = &request.options.post_function {
            form = form.text("post_function", post_function.clone());
        }

        let response = self
            .client
            .post(format!("{}/api/v1/transforms", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Submission(e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::Submission(format!("malformed response: {e}")))?;

        if let Some(error) = body.get("error").and_then(|v| v.as_str()) {
            return Err(ClientError::Submission(error.to_string()));
        }
        match body.get("job_id").and_then(|v| v.as_str()) {
            Some(job_id) if !job_id.is_empty() => Ok(job_id.to_string()),
            _ => Err(ClientError::Submission(
                "response carried neither a job id nor an error".to_string(),
            )),
        }
    }
}
