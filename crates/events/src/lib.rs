//! Per-job broadcast channel ("room") infrastructure.
//!
//! [`EventHub`] is the publish/subscribe hub between the server-side job
//! runner and however many clients are watching a job. Delivery is FIFO per
//! job, fan-out to every subscriber, with no replay of events published
//! before a subscriber joined, and nothing after the terminal event.

pub mod hub;

pub use hub::{EventHub, JobSubscription};
