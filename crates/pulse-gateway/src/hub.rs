use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;
use uuid::Uuid;

use pulse_types::events::{DirectMessage, StreamEvent};

use crate::registry::{DEFAULT_BUFFER, SubscriptionRegistry, normalize_username};

/// In-process fan-out of stream events to live connections.
///
/// Cheap to clone; all clones share one registry. Construct one per server
/// and hand it to the request handlers.
#[derive(Clone)]
pub struct Hub {
    registry: Arc<SubscriptionRegistry>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Hub whose subscriber channels hold `capacity` events each.
    pub fn with_buffer(capacity: usize) -> Self {
        Self {
            registry: Arc::new(SubscriptionRegistry::new(capacity)),
        }
    }

    /// Open a channel for `username`. It stays registered until the returned
    /// `Subscription` is dropped.
    pub fn subscribe(&self, username: &str) -> Subscription {
        let (id, rx) = self.registry.subscribe(username);
        debug!(user = %username, conn_id = %id, "Subscribed to stream");
        Subscription {
            hub: self.clone(),
            username: username.to_string(),
            id,
            rx,
        }
    }

    /// Close a channel. Safe to call more than once.
    pub fn unsubscribe(&self, username: &str, id: Uuid) -> bool {
        let removed = self.registry.unsubscribe(username, id);
        if removed {
            debug!(user = %username, conn_id = %id, "Unsubscribed from stream");
        }
        removed
    }

    /// Deliver a freshly stored direct message to both participants, so the
    /// sender's other devices see it as well. Returns the number of channels
    /// that accepted it.
    pub fn publish(&self, message: &DirectMessage) -> usize {
        let event = StreamEvent::direct_message(message.clone());

        let mut delivered = self.registry.publish(&message.recipient_name, &event);
        if normalize_username(&message.sender_name) != normalize_username(&message.recipient_name) {
            delivered += self.registry.publish(&message.sender_name, &event);
        }
        delivered
    }

    pub fn publish_to_user(&self, username: &str, event: &StreamEvent) -> usize {
        self.registry.publish(username, event)
    }

    pub fn subscriber_count(&self, username: &str) -> usize {
        self.registry.subscriber_count(username)
    }

    /// Users with at least one open stream.
    pub fn online_users(&self) -> usize {
        self.registry.user_count()
    }
}

/// A registered subscriber channel. Dropping it unsubscribes.
pub struct Subscription {
    hub: Hub,
    username: String,
    id: Uuid,
    rx: mpsc::Receiver<StreamEvent>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Next event, or `None` once the hub has closed this channel.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<StreamEvent, TryRecvError> {
        self.rx.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.username, self.id);
    }
}
