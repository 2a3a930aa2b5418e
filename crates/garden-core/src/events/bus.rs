//! Event bus using tokio broadcast channel
//!
//! Slow subscribers miss events rather than blocking the garden.

use crate::events::GardenEvent;
use tokio::sync::broadcast;

/// Default channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// Event bus for garden changes
///
/// Events are fire-and-forget; with no subscribers they are dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GardenEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Emit an event to all subscribers. Never blocks, never fails.
    pub fn emit(&self, event: GardenEvent) {
        let _ = self.sender.send(event);
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber to event bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<GardenEvent>,
}

impl EventSubscriber {
    /// Receive the next event
    ///
    /// Returns None once the bus is dropped. Lagged events are skipped.
    pub async fn recv(&mut self) -> Option<GardenEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Garden event subscriber lagged by {} events", n);
                    continue;
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Option<GardenEvent> {
        self.receiver.try_recv().ok()
    }
}
