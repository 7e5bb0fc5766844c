//! Route definitions for job submission and status.
//!
//! Mounted by `api_routes()` under `/transforms`:
//!
//! ```text
//! POST   /               -> submit_transform
//! GET    /{id}/status    -> job_status
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::transforms;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(transforms::submit_transform))
        .route("/{id}/status", get(transforms::job_status))
}
