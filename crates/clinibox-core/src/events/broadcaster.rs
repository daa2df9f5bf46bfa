//! Broadcast bus for change events.
//!
//! Wraps tokio's broadcast channel for multi-producer, multi-consumer
//! fan-out. The stores publish here after every committed mutation; realtime
//! subscribers and the poll backstop both listen on it.

use tokio::sync::broadcast;

use super::types::ChangeEvent;

/// Default buffer size for the broadcast channel. Slow receivers that fall
/// more than this many events behind observe `Lagged` and must refresh from
/// store state, which is always safe because events are triggers, not deltas.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Thread-safe, clone-shareable broadcaster for store change events.
#[derive(Clone)]
pub struct ChangeBroadcaster {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeBroadcaster {
    /// Create a new broadcaster with the default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster with a custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send a change event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event; 0 when
    /// nobody is listening, which is not an error.
    pub fn send(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Subscribe to events broadcast after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
