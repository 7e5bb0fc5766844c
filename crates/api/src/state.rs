use std::sync::Arc;

use tabula_events::EventHub;
use tabula_jobs::{JobRegistry, JobService};

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (everything is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Authoritative in-memory job state.
    pub registry: Arc<JobRegistry>,
    /// Per-job event rooms.
    pub hub: Arc<EventHub>,
    /// Submission orchestration (validation, engine spawn, completion).
    pub service: Arc<JobService>,
    /// WebSocket connection manager.
    pub ws_manager: Arc<WsManager>,
}
