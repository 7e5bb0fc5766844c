//! Domain types for the tabula transformation service.
//!
//! This crate is pure: no I/O, no async, no transport. It defines
//!
//! - [`rules`] — the six rule-row variants and the rule-set document a
//!   client submits with a workbook,
//! - [`events`] — the wire events exchanged over the per-job channel
//!   (`status_update` / `task_complete`) and the client join frame,
//! - [`tracker`] — the client-side progress state machine that owns the
//!   single display surface,
//! - [`status`] — the status-string conventions shared with the web
//!   front end (failure marker, stage labels, warning cap).

pub mod error;
pub mod events;
pub mod rules;
pub mod status;
pub mod tracker;
pub mod types;

pub use error::CoreError;
pub use events::{ClientFrame, CompletionPayload, ProgressPayload, WireEvent};
pub use rules::RuleSet;
pub use tracker::{JobTracker, ProgressView, TrackerState};
