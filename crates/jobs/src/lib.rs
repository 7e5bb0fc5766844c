//! Server-side job lifecycle: registry, background execution, progress
//! reporting, and retention.
//!
//! A submission is validated, registered, and handed to a background task
//! running a [`TransformEngine`]. The engine reports progress through a
//! [`ProgressReporter`], which couples every registry update with the
//! matching event publish so the authoritative record never lags behind
//! what subscribers have seen. Completion finalizes the record and closes
//! the job's room; the retention sweep garbage-collects terminal records.

pub mod engine;
pub mod error;
pub mod registry;
pub mod reporter;
pub mod service;
pub mod sweep;

pub use engine::{EngineInput, NamedFile, PassthroughEngine, TransformEngine, TransformOptions};
pub use error::JobError;
pub use registry::{JobRegistry, JobResult, JobSnapshot};
pub use reporter::ProgressReporter;
pub use service::{JobService, TransformRequest};
