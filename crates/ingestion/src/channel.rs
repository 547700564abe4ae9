//! Bounded transport channel with drop policies

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{DropPolicy, ImuMessage};
use tracing::{trace, warn};

use crate::config::IngestionMetrics;

/// Attempts to make room before giving up on a message
const MAX_EVICTIONS: usize = 4;

/// Producer side of the transport channel
///
/// Holds a receiver clone so `DropOldest` can evict from the head of the queue.
#[derive(Clone)]
pub struct MessageSender {
    tx: Sender<ImuMessage>,
    evict: Receiver<ImuMessage>,
    policy: DropPolicy,
}

impl MessageSender {
    pub fn new(tx: Sender<ImuMessage>, evict: Receiver<ImuMessage>, policy: DropPolicy) -> Self {
        Self { tx, evict, policy }
    }

    /// Enqueue without blocking, applying the drop policy when full
    ///
    /// `Disconnected` always evicts so the loss notice reaches the consumer.
    /// Returns false when the message itself was discarded.
    pub fn send(&self, message: ImuMessage, metrics: &IngestionMetrics, source_id: &str) -> bool {
        let policy = match message {
            ImuMessage::Disconnected(_) => DropPolicy::DropOldest,
            _ => self.policy,
        };

        let mut pending = message;
        for _ in 0..=MAX_EVICTIONS {
            match self.tx.try_send(pending) {
                Ok(()) => {
                    metrics.update_queue_len(self.tx.len());
                    trace!(source_id = %source_id, "message sent");
                    return true;
                }
                Err(TrySendError::Full(returned)) => match policy {
                    DropPolicy::DropNewest => {
                        metrics.record_dropped();
                        trace!(source_id = %source_id, "message dropped (newest)");
                        return false;
                    }
                    DropPolicy::DropOldest => {
                        if self.evict.try_recv().is_ok() {
                            metrics.record_dropped();
                            trace!(source_id = %source_id, "message dropped (oldest)");
                        }
                        pending = returned;
                    }
                },
                Err(TrySendError::Closed(_)) => {
                    warn!(source_id = %source_id, "channel closed");
                    return false;
                }
            }
        }

        metrics.record_dropped();
        warn!(source_id = %source_id, "queue contended, message dropped");
        false
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}
