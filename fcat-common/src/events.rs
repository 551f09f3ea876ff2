//! Event types for the FCAT catalog
//!
//! Provides the shared `CatalogEvent` definitions and the `EventBus` that the
//! vote engine publishes to and the SSE endpoint subscribes from.

use crate::db::models::{Format, FormatStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Catalog event types
///
/// Events are broadcast via the EventBus and serialized for SSE transmission.
/// The SSE `event:` field carries `event_type()`; the `data:` field carries
/// the JSON body. Keep-alive frames are produced by the SSE transport layer,
/// never by this enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// A format's vote counter changed (published strictly after the vote
    /// transaction committed, carrying the committed value)
    VoteCountChanged {
        /// Format whose counter changed
        format_id: Uuid,
        /// Committed counter value
        votes: i64,
        /// When the toggle committed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A format was added to the catalog (admin create or public submission)
    FormatAdded {
        /// The newly created format row
        format: Format,
        /// When the format was created
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An admin changed a format's lifecycle status
    FormatStatusChanged {
        /// Format whose status changed
        format_id: Uuid,
        /// New status
        status: FormatStatus,
        /// When the status changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An admin deleted a format (its votes are gone with it)
    FormatRemoved {
        /// Format that was removed
        format_id: Uuid,
        /// When the format was removed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CatalogEvent {
    /// Get event type as string for SSE framing and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::VoteCountChanged { .. } => "VoteCountChanged",
            CatalogEvent::FormatAdded { .. } => "FormatAdded",
            CatalogEvent::FormatStatusChanged { .. } => "FormatStatusChanged",
            CatalogEvent::FormatRemoved { .. } => "FormatRemoved",
        }
    }
}

/// Central event distribution bus
///
/// Wraps tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
///
/// This is the process-wide subscriber registry: channels are added by
/// `subscribe()` and removed when the receiver drops (client disconnect).
/// Delivery is best-effort; a disconnected viewer permanently misses events
/// and is expected to re-fetch the catalog on reconnect.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CatalogEvent,
    ) -> Result<usize, broadcast::error::SendError<CatalogEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// The vote engine uses this: a committed toggle with no open viewers is
    /// not an error.
    pub fn emit_lossy(&self, event: CatalogEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote_event(votes: i64) -> CatalogEvent {
        CatalogEvent::VoteCountChanged {
            format_id: Uuid::new_v4(),
            votes,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn new_bus_has_no_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.capacity(), 16);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn emit_delivers_to_all_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(vote_event(4)).expect("emit should succeed");

        let r1 = rx1.try_recv().expect("rx1 should receive");
        let r2 = rx2.try_recv().expect("rx2 should receive");
        assert_eq!(r1.event_type(), "VoteCountChanged");
        assert_eq!(r2.event_type(), "VoteCountChanged");
    }

    #[test]
    fn dropped_subscriber_does_not_block_others() {
        let bus = EventBus::new(16);
        let rx_dead = bus.subscribe();
        let mut rx_live = bus.subscribe();

        drop(rx_dead);
        bus.emit(vote_event(7)).expect("emit should still succeed");

        let received = rx_live.try_recv().expect("live subscriber still receives");
        match received {
            CatalogEvent::VoteCountChanged { votes, .. } => assert_eq!(votes, 7),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn emit_lossy_does_not_panic_without_subscribers() {
        let bus = EventBus::new(2);
        for i in 0..10 {
            bus.emit_lossy(vote_event(i));
        }
    }

    #[test]
    fn events_are_received_in_publish_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();

        for votes in 1..=5 {
            bus.emit_lossy(CatalogEvent::VoteCountChanged {
                format_id: id,
                votes,
                timestamp: chrono::Utc::now(),
            });
        }

        for expected in 1..=5 {
            match rx.try_recv().unwrap() {
                CatalogEvent::VoteCountChanged { votes, .. } => assert_eq!(votes, expected),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_string(&vote_event(3)).unwrap();
        assert!(json.contains("\"type\":\"VoteCountChanged\""));
        assert!(json.contains("\"votes\":3"));
    }
}
