use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use pulse_types::events::StreamEvent;

/// Slots per subscriber channel.
pub const DEFAULT_BUFFER: usize = 32;

type Listeners = HashMap<Uuid, mpsc::Sender<StreamEvent>>;

/// Normalized username -> live subscriber channels for that user.
///
/// A user with no channels has no entry. Publishing takes the read lock only
/// long enough to copy the senders out; delivery happens after it is released.
pub struct SubscriptionRegistry {
    capacity: usize,
    subscribers: RwLock<HashMap<String, Listeners>>,
}

impl SubscriptionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new bounded channel for `username`. Every call gets its own
    /// channel, so a user with several devices gets several entries.
    pub fn subscribe(&self, username: &str) -> (Uuid, mpsc::Receiver<StreamEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.capacity);

        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        subscribers
            .entry(normalize_username(username))
            .or_default()
            .insert(id, tx);

        (id, rx)
    }

    /// Remove and close a channel. Returns false if it was already gone.
    pub fn unsubscribe(&self, username: &str, id: Uuid) -> bool {
        let key = normalize_username(username);
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);

        let Some(listeners) = subscribers.get_mut(&key) else {
            return false;
        };

        // Dropping the sender closes the channel; the receiver drains what is
        // buffered and then sees `None`.
        let removed = listeners.remove(&id).is_some();

        if listeners.is_empty() {
            subscribers.remove(&key);
        }

        removed
    }

    /// Offer `event` to every channel of `username` without waiting. A full
    /// channel misses this event. Returns how many channels accepted it.
    pub fn publish(&self, username: &str, event: &StreamEvent) -> usize {
        let key = normalize_username(username);

        let targets: Vec<(Uuid, mpsc::Sender<StreamEvent>)> = {
            let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
            match subscribers.get(&key) {
                Some(listeners) => listeners.iter().map(|(id, tx)| (*id, tx.clone())).collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(user = %key, conn_id = %id, "Subscriber buffer full, dropping {} event", event.kind());
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(user = %key, conn_id = %id, "Subscriber channel closed mid-publish");
                }
            }
        }

        delivered
    }

    pub fn subscriber_count(&self, username: &str) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_username(username))
            .map_or(0, HashMap::len)
    }

    /// Number of users with at least one live channel.
    pub fn user_count(&self) -> usize {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Case-insensitive key with surrounding whitespace and a leading `@` removed.
pub fn normalize_username(value: &str) -> String {
    let value = value.trim();
    value.strip_prefix('@').unwrap_or(value).trim().to_lowercase()
}
