use crate::domain::PersistedRecord;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

/// Routes newly persisted records to live subscribers keyed by user id.
///
/// Each key owns one broadcast channel; every connection under that key holds
/// a receiver. `publish` never blocks the create path: `broadcast::Sender`
/// buffers up to the channel capacity and a receiver that falls further
/// behind observes `Lagged`, at which point its connection is closed by the
/// WebSocket task. Ordering is preserved per key, not across keys.
pub struct SubscriptionRegistry {
    channels: DashMap<i64, broadcast::Sender<PersistedRecord>>,
    capacity: usize,
}

impl SubscriptionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Registers a subscriber under `user_id` and returns its receiver.
    /// Only records created after this call are delivered; there is no replay.
    pub fn subscribe(&self, user_id: i64) -> broadcast::Receiver<PersistedRecord> {
        let rx = self
            .channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(user_id, "subscriber registered");
        rx
    }

    /// Fans a record out to the subscribers of its user id, if any.
    /// Fire-and-forget: a send error only means nobody is listening.
    pub fn publish(&self, record: &PersistedRecord) {
        if let Some(tx) = self.channels.get(&record.user_id) {
            let _ = tx.send(record.clone());
        }
    }

    /// Drops the channel for `user_id` once its last receiver is gone.
    /// Called by the WebSocket task after a connection closes.
    pub fn prune(&self, user_id: i64) {
        self.channels
            .remove_if(&user_id, |_, tx| tx.receiver_count() == 0);
    }

    /// Live subscriber count for a key.
    pub fn subscriber_count(&self, user_id: i64) -> usize {
        self.channels
            .get(&user_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}
