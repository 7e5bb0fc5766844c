//! Result retrieval.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use tabula_core::CoreError;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// MIME type of an `.xlsx` workbook.
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// GET /download/{id} — stream the result workbook of a finished job.
///
/// Only available after a successful completion; unknown jobs, live jobs,
/// and failed jobs all answer 404.
pub async fn download_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let result = state
        .registry
        .result(&id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "result",
            id: id.clone(),
        }))?;

    let short_id = id.get(..8).unwrap_or(&id);
    let filename = format!("processed_{short_id}_{}", result.template_filename);
    let disposition = format!("attachment; filename=\"{filename}\"");

    tracing::info!(job_id = %id, %filename, bytes = result.bytes.len(), "Result downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        result.bytes,
    )
        .into_response())
}
