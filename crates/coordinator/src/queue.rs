//! Bounded inter-stage frame queue with drop-oldest backpressure

use std::time::Duration;

use async_channel::{bounded, Receiver, Sender, TrySendError};

/// Result of a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Enqueued,
    /// The queue was full; this many older items were evicted first
    Evicted(usize),
    /// The consumer side is gone
    Closed,
}

/// Result of a bounded wait on the queue
#[derive(Debug)]
pub enum PopOutcome<T> {
    Item(T),
    TimedOut,
    /// Closed by the producer and fully drained
    Closed,
}

/// Create a queue of `capacity` items
pub fn frame_queue<T>(name: &'static str, capacity: usize) -> (QueueProducer<T>, QueueConsumer<T>) {
    let (tx, rx) = bounded(capacity.max(1));
    (
        QueueProducer {
            name,
            tx,
            evict: rx.clone(),
        },
        QueueConsumer { name, rx },
    )
}

/// Producer half; never blocks
pub struct QueueProducer<T> {
    name: &'static str,
    tx: Sender<T>,
    evict: Receiver<T>,
}

impl<T> QueueProducer<T> {
    /// Enqueue `item`, evicting from the head while the queue is full
    pub fn push(&self, item: T) -> PushOutcome {
        let mut pending = item;
        let mut evicted = 0;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) if evicted == 0 => return PushOutcome::Enqueued,
                Ok(()) => return PushOutcome::Evicted(evicted),
                Err(TrySendError::Full(returned)) => {
                    if self.evict.try_recv().is_ok() {
                        evicted += 1;
                    }
                    pending = returned;
                }
                Err(TrySendError::Closed(_)) => return PushOutcome::Closed,
            }
        }
    }

    /// Stop accepting items; the consumer drains what is queued
    pub fn close(&self) {
        self.tx.close();
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }
}

/// Consumer half
pub struct QueueConsumer<T> {
    name: &'static str,
    rx: Receiver<T>,
}

impl<T> QueueConsumer<T> {
    /// Wait at most `timeout` for the next item
    pub async fn pop_timeout(&self, timeout: Duration) -> PopOutcome<T> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Ok(item)) => PopOutcome::Item(item),
            Ok(Err(_)) => PopOutcome::Closed,
            Err(_) => PopOutcome::TimedOut,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_queue_evicts_oldest() {
        let (producer, consumer) = frame_queue::<u64>("test", 2);
        assert_eq!(producer.push(1), PushOutcome::Enqueued);
        assert_eq!(producer.push(2), PushOutcome::Enqueued);
        assert_eq!(producer.push(3), PushOutcome::Evicted(1));
        assert_eq!(producer.len(), 2);

        let timeout = Duration::from_millis(10);
        assert!(matches!(consumer.pop_timeout(timeout).await, PopOutcome::Item(2)));
        assert!(matches!(consumer.pop_timeout(timeout).await, PopOutcome::Item(3)));
    }

    #[tokio::test]
    async fn test_empty_queue_times_out() {
        let (_producer, consumer) = frame_queue::<u64>("test", 2);
        let outcome = consumer.pop_timeout(Duration::from_millis(5)).await;
        assert!(matches!(outcome, PopOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_close_drains_then_reports_closed() {
        let (producer, consumer) = frame_queue::<u64>("test", 2);
        producer.push(7);
        producer.close();
        assert_eq!(producer.push(8), PushOutcome::Closed);

        let timeout = Duration::from_millis(10);
        assert!(matches!(consumer.pop_timeout(timeout).await, PopOutcome::Item(7)));
        assert!(matches!(consumer.pop_timeout(timeout).await, PopOutcome::Closed));
    }

    #[tokio::test]
    async fn test_capacity_floor_is_one() {
        let (producer, _consumer) = frame_queue::<u64>("test", 0);
        assert_eq!(producer.capacity(), 1);
    }
}
