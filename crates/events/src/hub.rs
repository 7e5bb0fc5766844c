//! The per-job event hub, backed by one `tokio::sync::broadcast` channel
//! per room.
//!
//! Rooms are created lazily on first subscribe or first publish. Publishing
//! the terminal `task_complete` event closes the room: later publishes are
//! dropped with a warning and later subscribers observe an already-ended
//! stream. Closed rooms stay in the map as tombstones until [`EventHub::remove`]
//! is called (the registry retention sweep does this), so a completed job id
//! can never be resurrected by a late publish.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};

use tabula_core::events::WireEvent;
use tabula_core::types::JobId;

/// Default broadcast buffer capacity per room.
const DEFAULT_CAPACITY: usize = 256;

enum Room {
    Open(broadcast::Sender<WireEvent>),
    /// The terminal event has been published; the room only awaits removal.
    Closed,
}

/// Hub of per-job broadcast rooms.
///
/// Designed to be shared via `Arc<EventHub>` between the job runner, the
/// WebSocket layer, and in-process clients.
pub struct EventHub {
    rooms: RwLock<HashMap<JobId, Room>>,
    capacity: usize,
}

impl EventHub {
    /// Create a hub with a specific per-room buffer capacity.
    ///
    /// When a room's buffer is full the oldest un-consumed events are
    /// dropped and slow subscribers observe a lag, which the subscription
    /// skips past with a warning (best-effort delivery).
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Join the room for `job_id`.
    ///
    /// Only events published after this call are delivered; there is no
    /// replay buffer. Joining a closed room yields a subscription that ends
    /// immediately.
    pub async fn subscribe(&self, job_id: &str) -> JobSubscription {
        let mut rooms = self.rooms.write().await;
        let receiver = match rooms.get(job_id) {
            Some(Room::Open(sender)) => sender.subscribe(),
            Some(Room::Closed) => closed_receiver(),
            None => {
                let (sender, receiver) = broadcast::channel(self.capacity);
                rooms.insert(job_id.to_string(), Room::Open(sender));
                receiver
            }
        };
        JobSubscription {
            job_id: job_id.to_string(),
            receiver,
        }
    }

    /// Publish an event to the room named by its `task_id`.
    ///
    /// Returns the number of subscribers the event was delivered to (zero
    /// when nobody has joined yet — the event is simply dropped, matching
    /// the no-replay contract). A terminal event closes the room.
    pub async fn publish(&self, event: WireEvent) -> usize {
        let job_id = event.task_id().clone();
        let terminal = event.is_terminal();

        let mut rooms = self.rooms.write().await;
        let delivered = match rooms.get(&job_id) {
            Some(Room::Open(sender)) => sender.send(event).unwrap_or(0),
            Some(Room::Closed) => {
                tracing::warn!(%job_id, "Event published after completion, dropped");
                return 0;
            }
            None => {
                // Nobody is listening yet; create the room so ordering is
                // still well-defined for anyone who joins mid-run.
                let (sender, _) = broadcast::channel(self.capacity);
                rooms.insert(job_id.clone(), Room::Open(sender));
                0
            }
        };

        if terminal {
            rooms.insert(job_id, Room::Closed);
        }
        delivered
    }

    /// Drop all trace of a job's room, open or closed.
    pub async fn remove(&self, job_id: &str) {
        self.rooms.write().await.remove(job_id);
    }

    /// Number of rooms still open (terminal event not yet published).
    pub async fn open_room_count(&self) -> usize {
        self.rooms
            .read()
            .await
            .values()
            .filter(|room| matches!(room, Room::Open(_)))
            .count()
    }

    /// Number of live subscribers in a room.
    pub async fn subscriber_count(&self, job_id: &str) -> usize {
        match self.rooms.read().await.get(job_id) {
            Some(Room::Open(sender)) => sender.receiver_count(),
            _ => 0,
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A receiver whose stream has already ended.
fn closed_receiver() -> broadcast::Receiver<WireEvent> {
    let (sender, receiver) = broadcast::channel(1);
    drop(sender);
    receiver
}

/// One subscriber's handle on a job room.
pub struct JobSubscription {
    job_id: JobId,
    receiver: broadcast::Receiver<WireEvent>,
}

impl JobSubscription {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Receive the next event, in publish order.
    ///
    /// Returns `None` once the room is closed and all buffered events have
    /// been consumed. A lagged subscriber is skipped forward to the oldest
    /// retained event with a warning.
    pub async fn recv(&mut self) -> Option<WireEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(job_id = %self.job_id, skipped, "Subscriber lagged, skipping events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::events::{CompletionPayload, ProgressPayload};

    fn progress(job_id: &str, status: &str, percent: u8) -> WireEvent {
        WireEvent::StatusUpdate(ProgressPayload::new(job_id, status, percent))
    }

    fn completion(job_id: &str) -> WireEvent {
        WireEvent::TaskComplete(CompletionPayload::new(job_id, "Готово!", true))
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe("j-1").await;

        hub.publish(progress("j-1", "a", 10)).await;
        hub.publish(progress("j-1", "b", 20)).await;
        hub.publish(progress("j-1", "c", 30)).await;

        for expected in ["a", "b", "c"] {
            match sub.recv().await.expect("event should arrive") {
                WireEvent::StatusUpdate(p) => assert_eq!(p.status.as_deref(), Some(expected)),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_every_event() {
        let hub = EventHub::default();
        let mut sub1 = hub.subscribe("j-2").await;
        let mut sub2 = hub.subscribe("j-2").await;

        let delivered = hub.publish(progress("j-2", "tick", 50)).await;
        assert_eq!(delivered, 2);

        assert!(sub1.recv().await.is_some());
        assert!(sub2.recv().await.is_some());
    }

    #[tokio::test]
    async fn events_before_joining_are_not_replayed() {
        let hub = EventHub::default();
        hub.publish(progress("j-3", "early", 5)).await;

        let mut sub = hub.subscribe("j-3").await;
        hub.publish(progress("j-3", "late", 95)).await;

        match sub.recv().await.expect("event should arrive") {
            WireEvent::StatusUpdate(p) => assert_eq!(p.status.as_deref(), Some("late")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn nothing_is_delivered_after_completion() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe("j-4").await;

        hub.publish(completion("j-4")).await;
        assert!(matches!(
            sub.recv().await,
            Some(WireEvent::TaskComplete(_))
        ));
        assert_eq!(sub.recv().await, None);

        // A publish after completion reaches nobody.
        let delivered = hub.publish(progress("j-4", "ghost", 99)).await;
        assert_eq!(delivered, 0);

        // And a late joiner sees an already-ended stream.
        let mut late = hub.subscribe("j-4").await;
        assert_eq!(late.recv().await, None);
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let hub = EventHub::default();
        let mut sub_a = hub.subscribe("j-a").await;
        let mut sub_b = hub.subscribe("j-b").await;

        hub.publish(progress("j-b", "b only", 40)).await;
        hub.publish(completion("j-b")).await;

        assert!(sub_b.recv().await.is_some());
        assert!(sub_b.recv().await.is_some());

        // Room A saw nothing; closing B must not end A's stream.
        hub.publish(progress("j-a", "a only", 10)).await;
        match sub_a.recv().await.expect("room A still delivers") {
            WireEvent::StatusUpdate(p) => assert_eq!(p.status.as_deref(), Some("a only")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn counters_track_open_rooms_and_subscribers() {
        let hub = EventHub::default();
        assert_eq!(hub.open_room_count().await, 0);

        let _sub = hub.subscribe("j-5").await;
        assert_eq!(hub.open_room_count().await, 1);
        assert_eq!(hub.subscriber_count("j-5").await, 1);

        hub.publish(completion("j-5")).await;
        assert_eq!(hub.open_room_count().await, 0);
        assert_eq!(hub.subscriber_count("j-5").await, 0);

        hub.remove("j-5").await;
        assert_eq!(hub.subscriber_count("j-5").await, 0);
    }
}
