//! HTTP/WebSocket surface of the transformation service.
//!
//! Routes: job submission and status under `/api/v1/transforms`, result
//! download at `/download/{id}`, the room-join WebSocket at `/ws`, and
//! `/health`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
