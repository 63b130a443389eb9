//! In-process fan-out of [`StorefrontEvent`]s.
//!
//! Services publish after their store mutation has committed; every open
//! WebSocket holds one receiver and filters on its own side. Publishing
//! never blocks and never fails: with nobody listening the event is
//! simply gone.

use tokio::sync::broadcast;

use super::StorefrontEvent;

/// Cloneable handle to the shared broadcast channel.
///
/// A receiver that falls more than `capacity` events behind loses the
/// oldest ones and sees [`broadcast::error::RecvError::Lagged`].
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StorefrontEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per receiver
    /// (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Sends `event` to every current receiver and returns how many there
    /// were.
    pub fn publish(&self, event: StorefrontEvent) -> usize {
        let kind = event.event_type_str();
        let account_id = event.account_id();
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(event = kind, ?account_id, delivered, "event published");
        delivered
    }

    /// Opens a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorefrontEvent> {
        self.sender.subscribe()
    }

    /// Number of open receivers, i.e. live WebSocket connections.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
