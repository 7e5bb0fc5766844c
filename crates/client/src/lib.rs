//! Client side of the job-tracking protocol.
//!
//! [`JobCreator`] submits a rule set plus files and yields a job id;
//! [`EventSource`] joins the per-job channel and yields the event stream;
//! [`track_job`] drives a [`tabula_core::JobTracker`] from submission to
//! its terminal state and returns the final display surface.
//!
//! Both seams ship two implementations: in-process (against the job
//! service and event hub directly) and over the network (reqwest multipart
//! and a WebSocket connection).

pub mod creator;
pub mod error;
pub mod source;
pub mod track;

pub use creator::{HttpJobCreator, InProcessJobCreator, JobCreator};
pub use error::ClientError;
pub use source::{EventSource, EventStream, HubEventSource, WsEventSource};
pub use track::track_job;
