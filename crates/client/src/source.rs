//! Event-channel transports.
//!
//! Anything that can `join(job_id)` and deliver that job's events in FIFO
//! order satisfies [`EventSource`]; the tracker does not care whether the
//! stream is an in-process broadcast subscription or a WebSocket.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use futures::SinkExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use tabula_core::events::{ClientFrame, WireEvent};
use tabula_events::{EventHub, JobSubscription};
use tabula_jobs::JobRegistry;

use crate::error::ClientError;

/// Ordered event stream of one joined job room.
pub type EventStream = BoxStream<'static, WireEvent>;

/// The generic subscribe capability: join a job's room, get its stream.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn join(&self, job_id: &str) -> Result<EventStream, ClientError>;
}

/// In-process source backed directly by the [`EventHub`].
///
/// With a registry attached, joining a known job first yields a snapshot
/// event (current progress, or a synthesized completion for a terminal
/// job), reconciling joiners that raced the run against the no-replay
/// channel.
pub struct HubEventSource {
    hub: Arc<EventHub>,
    registry: Option<Arc<JobRegistry>>,
}

impl HubEventSource {
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self {
            hub,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<JobRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

#[async_trait]
impl EventSource for HubEventSource {
    async fn join(&self, job_id: &str) -> Result<EventStream, ClientError> {
        // Subscribe before snapshotting so no event falls in the gap.
        let subscription = self.hub.subscribe(job_id).await;

        let snapshot = match &self.registry {
            Some(registry) => registry
                .snapshot(job_id)
                .await
                .map(|snap| snap.to_wire_event(job_id)),
            None => None,
        };

        let live = stream::unfold(subscription, |mut sub: JobSubscription| async move {
            sub.recv().await.map(|event| (event, sub))
        });
        Ok(stream::iter(snapshot).chain(live).boxed())
    }
}

/// WebSocket source: dials the server, sends the `join_task_room` frame,
/// and decodes text frames into wire events.
///
/// Undecodable frames are skipped with a warning — dropping one tick must
/// not abort tracking. The stream ends when the server closes the
/// connection or the room.
pub struct WsEventSource {
    /// WebSocket endpoint, e.g. `ws://localhost:3000/ws`.
    url: String,
}

impl WsEventSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl EventSource for WsEventSource {
    async fn join(&self, job_id: &str) -> Result<EventStream, ClientError> {
        let (socket, _) = connect_async(&self.url)
            .await
            .map_err(|e| ClientError::Subscription(e.to_string()))?;
        let (mut write, read) = socket.split();

        let frame = serde_json::to_string(&ClientFrame::JoinTaskRoom {
            task_id: job_id.to_string(),
        })
        .map_err(|e| ClientError::Subscription(e.to_string()))?;
        write
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| ClientError::Subscription(e.to_string()))?;

        // The write half rides along in the stream state so the
        // connection stays open for the whole subscription.
        let stream = stream::unfold((read, write), |(mut read, write)| async move {
            loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str(&text) {
                        Ok(event) => return Some((event, (read, write))),
                        Err(e) => {
                            tracing::warn!(error = %e, "Skipping undecodable event frame");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => return None,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WebSocket receive error, ending stream");
                        return None;
                    }
                }
            }
        });
        Ok(stream.boxed())
    }
}
