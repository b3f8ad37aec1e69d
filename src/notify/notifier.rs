use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use super::events::{Notification, NotificationMessage};

const DEFAULT_CAPACITY: usize = 1024;

/// Publish side of the notification channel.
pub struct Notifier {
    tx: broadcast::Sender<NotificationMessage>,
    sequence_counter: AtomicU64,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    /// Slow subscribers that fall more than `capacity` messages behind lose
    /// the oldest ones and are told to refresh.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            sequence_counter: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, notification: Notification) {
        let seq = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
        let msg = NotificationMessage {
            notification,
            sequence_id: seq,
            timestamp: chrono::Utc::now().timestamp(),
        };
        // A send error only means nobody is listening.
        if self.tx.send(msg).is_err() {
            tracing::trace!(sequence_id = seq, "No notification subscribers");
        }
    }

    pub fn current_sequence_id(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
