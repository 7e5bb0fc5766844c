//! Wire events of the per-job channel.
//!
//! Every frame is a JSON envelope `{"type": <name>, "data": {...}}`. The
//! server emits [`WireEvent`]s; the only client frame is the room join.
//! Payload fields are independently optional and defaulted on the consuming
//! side, so "0%" and "no percent supplied" stay distinct on the wire.

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// A server-to-client event on a job channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WireEvent {
    /// Repeatable progress notification.
    StatusUpdate(ProgressPayload),
    /// The single terminal notification of a job.
    TaskComplete(CompletionPayload),
}

impl WireEvent {
    /// The job this event belongs to.
    pub fn task_id(&self) -> &JobId {
        match self {
            WireEvent::StatusUpdate(p) => &p.task_id,
            WireEvent::TaskComplete(p) => &p.task_id,
        }
    }

    /// Whether this is the terminal event of its job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WireEvent::TaskComplete(_))
    }
}

/// Payload of a `status_update` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub task_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl ProgressPayload {
    pub fn new(task_id: impl Into<JobId>, status: impl Into<String>, progress: u8) -> Self {
        Self {
            task_id: task_id.into(),
            status: Some(status.into()),
            progress: Some(progress),
        }
    }
}

/// Payload of a `task_complete` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub task_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Always 100 when produced by this service; optional on the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub result_ready: bool,
}

impl CompletionPayload {
    pub fn new(task_id: impl Into<JobId>, status: impl Into<String>, result_ready: bool) -> Self {
        Self {
            task_id: task_id.into(),
            status: Some(status.into()),
            progress: Some(100),
            warnings: Vec::new(),
            result_ready,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// A client-to-server frame on the channel transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Register interest in one job's event stream.
    JoinTaskRoom { task_id: JobId },
}
