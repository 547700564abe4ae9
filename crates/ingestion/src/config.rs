//! Backpressure configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub use contracts::DropPolicy;
use contracts::{ImuMessage, SensorConfig};

/// Backpressure configuration
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Channel capacity
    pub channel_capacity: usize,

    /// Drop policy when full
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

impl BackpressureConfig {
    /// Create new backpressure configuration
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
            drop_policy,
        }
    }
}

impl From<&SensorConfig> for BackpressureConfig {
    fn from(config: &SensorConfig) -> Self {
        Self::new(config.channel_capacity, config.drop_policy)
    }
}

/// Transport counters, shared by every adapter and source of a pipeline
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    raw_samples: AtomicU64,
    attitude_readings: AtomicU64,
    disconnects: AtomicU64,
    dropped: AtomicU64,
    parse_errors: AtomicU64,
    queue_len: AtomicUsize,
    peak_queue_len: AtomicUsize,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one message by kind
    pub fn record_received(&self, message: &ImuMessage) {
        let counter = match message {
            ImuMessage::Sample(_) => &self.raw_samples,
            ImuMessage::Attitude(_) => &self.attitude_readings,
            ImuMessage::Disconnected(_) => &self.disconnects,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Transport line or record rejected before reaching the tracker
    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
        self.peak_queue_len.fetch_max(len, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let raw_samples = self.raw_samples.load(Ordering::Relaxed);
        let attitude_readings = self.attitude_readings.load(Ordering::Relaxed);
        let disconnects = self.disconnects.load(Ordering::Relaxed);
        MetricsSnapshot {
            messages_received: raw_samples + attitude_readings + disconnects,
            raw_samples,
            attitude_readings,
            disconnects,
            messages_dropped: self.dropped.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
            peak_queue_len: self.peak_queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`IngestionMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// All messages, any kind
    pub messages_received: u64,
    pub raw_samples: u64,
    pub attitude_readings: u64,
    pub disconnects: u64,
    pub messages_dropped: u64,
    pub parse_errors: u64,
    pub queue_len: usize,
    /// Highest queue length seen; near capacity means the tracker is falling behind
    pub peak_queue_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_drops_oldest() {
        let config = BackpressureConfig::default();
        assert_eq!(config.drop_policy, DropPolicy::DropOldest);
        assert_eq!(BackpressureConfig::new(0, DropPolicy::DropNewest).channel_capacity, 1);
    }

    #[test]
    fn test_snapshot_counts_by_kind() {
        let metrics = IngestionMetrics::new();
        let attitude = ImuMessage::Attitude(contracts::AttitudeReading {
            timestamp: 0.0,
            yaw_deg: 0.0,
            pitch_deg: 0.0,
            roll_deg: 0.0,
        });
        metrics.record_received(&attitude);
        metrics.record_received(&attitude);
        metrics.record_received(&ImuMessage::Disconnected("eof".into()));
        metrics.record_dropped();
        metrics.record_parse_error();
        metrics.update_queue_len(5);
        metrics.update_queue_len(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_received, 3);
        assert_eq!(snapshot.attitude_readings, 2);
        assert_eq!(snapshot.raw_samples, 0);
        assert_eq!(snapshot.disconnects, 1);
        assert_eq!(snapshot.messages_dropped, 1);
        assert_eq!(snapshot.parse_errors, 1);
        assert_eq!(snapshot.queue_len, 3);
        assert_eq!(snapshot.peak_queue_len, 5);
    }
}
