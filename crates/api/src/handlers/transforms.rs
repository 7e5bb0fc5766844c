//! Job submission and the polling status fallback.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use tabula_core::{CoreError, RuleSet};
use tabula_jobs::{NamedFile, TransformOptions, TransformRequest};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/v1/transforms — create a transformation job.
///
/// Multipart form fields: `rules` (JSON rule-set document), `source_file`
/// (required), `template_file`, `template_filename`, `visible_rows_only`,
/// `post_function`.
///
/// Always answers 200: `{"job_id": ...}` on success, `{"error": ...}` for
/// any creation failure. Clients treat every other response shape as a
/// submission error, so failures stay in-band.
pub async fn submit_transform(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Json<serde_json::Value> {
    let request = match parse_submission(multipart).await {
        Ok(request) => request,
        Err(message) => {
            tracing::debug!(error = %message, "Submission rejected while parsing the form");
            return Json(json!({ "error": message }));
        }
    };

    match state.service.submit(request).await {
        Ok(job_id) => Json(json!({ "job_id": job_id })),
        Err(e) => {
            tracing::debug!(error = %e, "Submission rejected by the job service");
            Json(json!({ "error": e.to_string() }))
        }
    }
}

/// Pull the transform request out of the multipart form.
async fn parse_submission(mut multipart: Multipart) -> Result<TransformRequest, String> {
    let mut rules: Option<RuleSet> = None;
    let mut source: Option<NamedFile> = None;
    let mut template: Option<NamedFile> = None;
    let mut template_filename: Option<String> = None;
    let mut options = TransformOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Malformed multipart request: {e}"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "rules" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| format!("Unreadable 'rules' field: {e}"))?;
                rules = Some(
                    serde_json::from_str(&text).map_err(|e| format!("Invalid rules JSON: {e}"))?,
                );
            }
            "source_file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Unreadable source file: {e}"))?;
                source = Some(NamedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            "template_file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Unreadable template file: {e}"))?;
                template = Some(NamedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            "template_filename" => {
                let text = field.text().await.unwrap_or_default();
                if !text.is_empty() {
                    template_filename = Some(text);
                }
            }
            "visible_rows_only" => {
                let text = field.text().await.unwrap_or_default();
                options.visible_rows_only = matches!(text.as_str(), "true" | "on" | "1");
            }
            "post_function" => {
                let text = field.text().await.unwrap_or_default();
                if !text.is_empty() {
                    options.post_function = Some(text);
                }
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown form field");
            }
        }
    }

    let rules = rules.ok_or_else(|| "Missing 'rules' field".to_string())?;
    let source = source.ok_or_else(|| "Missing source file".to_string())?;
    if source.filename.is_empty() {
        return Err("Source file has no filename".to_string());
    }
    if source.bytes.is_empty() {
        return Err("Source file is empty".to_string());
    }
    // An explicit template_filename overrides the uploaded part's name
    // (the browser form sends the original name separately).
    if let (Some(template), Some(filename)) = (template.as_mut(), template_filename) {
        template.filename = filename;
    }

    Ok(TransformRequest {
        rules,
        source,
        template,
        options,
    })
}

/// Observable job state, mirroring what the event channel carries.
#[derive(Serialize)]
pub struct JobStatusResponse {
    pub status: String,
    pub progress: u8,
    pub warnings: Vec<String>,
    pub result_ready: bool,
}

/// GET /api/v1/transforms/{id}/status — polling fallback for clients
/// without a live channel.
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<JobStatusResponse>> {
    let snapshot = state
        .registry
        .snapshot(&id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "job",
            id,
        }))?;

    Ok(Json(JobStatusResponse {
        status: snapshot.status,
        progress: snapshot.progress,
        warnings: snapshot.warnings,
        result_ready: snapshot.result_ready,
    }))
}
