/// Broadcast event bus for realtime notifications
///
/// After a successful mutation, either transport publishes one of these
/// events; every connected WebSocket client receives it, regardless of
/// who owns the task. That fan-out is intentional (collaborative-refresh
/// UX) and carries the information-disclosure trade-off noted in
/// DESIGN.md.
///
/// The bus is plain `tokio::sync::broadcast` owned by the application
/// state; there are no ambient globals, and its lifecycle is the
/// process's.
///
/// # Example
///
/// ```
/// use taskdeck_api::events::{BroadcastEvent, EventBus};
///
/// let bus = EventBus::new(64);
/// let mut rx = bus.subscribe();
///
/// bus.emit(BroadcastEvent::TaskDeleted { id: 7 });
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.name(), "tasks:deleted");
/// ```

use serde::Serialize;
use taskdeck_shared::service::tasks::TaskView;
use tokio::sync::broadcast;

/// A fire-and-forget notification sent to all connected clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum BroadcastEvent {
    /// A task was created
    #[serde(rename = "tasks:created")]
    TaskCreated(TaskView),

    /// A task was updated (including orphan claims)
    #[serde(rename = "tasks:updated")]
    TaskUpdated(TaskView),

    /// A task was deleted
    #[serde(rename = "tasks:deleted")]
    TaskDeleted { id: i64 },

    /// An attachment was deleted
    #[serde(rename = "attachments:deleted")]
    AttachmentDeleted { id: i64 },
}

impl BroadcastEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            BroadcastEvent::TaskCreated(_) => "tasks:created",
            BroadcastEvent::TaskUpdated(_) => "tasks:updated",
            BroadcastEvent::TaskDeleted { .. } => "tasks:deleted",
            BroadcastEvent::AttachmentDeleted { .. } => "attachments:deleted",
        }
    }
}

/// Broadcast channel wrapper shared through the application state
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl EventBus {
    /// Creates a bus with the given channel capacity
    ///
    /// Slow subscribers that fall more than `capacity` events behind
    /// observe a lag error and skip ahead; they do not block publishers.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers
    ///
    /// Publishing with no subscribers is not an error.
    pub fn emit(&self, event: BroadcastEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(event = name, receivers, "Broadcast event emitted");
            }
            Err(_) => {
                tracing::debug!(event = name, "Broadcast event dropped (no subscribers)");
            }
        }
    }

    /// Subscribes to all events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }

    /// Number of currently connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_fine() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(BroadcastEvent::TaskDeleted { id: 1 });
    }

    #[tokio::test]
    async fn test_all_subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(BroadcastEvent::TaskDeleted { id: 42 });

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                BroadcastEvent::TaskDeleted { id } => assert_eq!(id, 42),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_event_wire_shape() {
        let json =
            serde_json::to_value(BroadcastEvent::AttachmentDeleted { id: 9 }).unwrap();
        assert_eq!(json["event"], "attachments:deleted");
        assert_eq!(json["data"]["id"], 9);
    }
}
