// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use common::UpdateEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Fan-out point for push notifications. Handlers publish here after a
/// confirmed write; every websocket connection holds a subscription.
///
/// Delivery is best-effort: publishing never blocks the HTTP response,
/// and a send with no connected clients is not an error. Clients that
/// connect later get nothing and rely on their initial fetch.
#[derive(Clone)]
pub struct UpdateBroadcaster {
    tx: broadcast::Sender<UpdateEvent>,
}

impl UpdateBroadcaster {
    /// Creates a broadcaster whose channel buffers up to `capacity`
    /// events per lagging subscriber before dropping the oldest.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event to all currently-connected subscribers.
    /// Fire-and-forget: the result is only logged.
    pub fn publish(&self, event: UpdateEvent) {
        let name = event.event.clone();
        match self.tx.send(event) {
            Ok(receivers) => debug!("Broadcasted '{}' to {} subscribers.", name, receivers),
            Err(_) => debug!("Broadcasted '{}' with no subscribers connected.", name),
        }
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.tx.subscribe()
    }

    /// Number of currently-connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for UpdateBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
