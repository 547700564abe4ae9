//! Mock IMU transport
//!
//! Generates raw accel/gyro samples in a background thread: gravity along +z
//! and a slow sinusoidal yaw sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{ImuCallback, ImuMessage, ImuSource, RawImuSample, SensorConfig, SessionClock, Vector3};
use tracing::{debug, trace};

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.81;

/// Angular frequency of the yaw sweep (rad/s)
const SWEEP_OMEGA: f64 = 0.25;

/// Mock IMU configuration
#[derive(Debug, Clone)]
pub struct MockImuConfig {
    /// Sample rate (Hz)
    pub rate_hz: f64,
    /// Peak yaw rate of the sweep (degrees per second)
    pub yaw_sweep_deg_s: f64,
    /// Report a disconnect after this many samples
    pub disconnect_after: Option<u64>,
}

impl Default for MockImuConfig {
    fn default() -> Self {
        Self {
            rate_hz: 200.0,
            yaw_sweep_deg_s: 10.0,
            disconnect_after: None,
        }
    }
}

impl From<&SensorConfig> for MockImuConfig {
    fn from(config: &SensorConfig) -> Self {
        Self {
            rate_hz: config.rate_hz,
            yaw_sweep_deg_s: config.yaw_sweep_deg_s,
            disconnect_after: None,
        }
    }
}

/// Synthetic IMU at `elapsed` seconds into the sweep
pub fn synthetic_sample(timestamp: f64, elapsed: f64, yaw_sweep_deg_s: f64) -> RawImuSample {
    RawImuSample {
        timestamp,
        accelerometer: Vector3::new(0.0, 0.0, GRAVITY),
        gyroscope: Vector3::new(
            0.0,
            0.0,
            yaw_sweep_deg_s.to_radians() * (SWEEP_OMEGA * elapsed).cos(),
        ),
    }
}

/// Mock IMU transport
pub struct MockImuSource {
    source_id: String,
    config: MockImuConfig,
    clock: SessionClock,
    listening: Arc<AtomicBool>,
}

impl MockImuSource {
    pub fn new(source_id: impl Into<String>, config: MockImuConfig, clock: SessionClock) -> Self {
        Self {
            source_id: source_id.into(),
            config,
            clock,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_defaults(source_id: impl Into<String>, clock: SessionClock) -> Self {
        Self::new(source_id, MockImuConfig::default(), clock)
    }
}

impl ImuSource for MockImuSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: ImuCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let config = self.config.clone();
        let clock = self.clock;
        let listening = self.listening.clone();

        let rate_hz = if config.rate_hz > 0.0 { config.rate_hz } else { 200.0 };
        let interval = Duration::from_secs_f64(1.0 / rate_hz);

        thread::spawn(move || {
            let started = clock.now();
            let mut sent: u64 = 0;

            debug!(source_id = %source_id, rate_hz, "mock imu started");

            while listening.load(Ordering::Relaxed) {
                if config.disconnect_after.is_some_and(|limit| sent >= limit) {
                    debug!(source_id = %source_id, sent, "mock imu disconnecting");
                    callback(ImuMessage::Disconnected("mock transport unplugged".to_string()));
                    listening.store(false, Ordering::SeqCst);
                    break;
                }

                let timestamp = clock.now();
                let sample = synthetic_sample(timestamp, timestamp - started, config.yaw_sweep_deg_s);
                callback(ImuMessage::Sample(sample));
                sent += 1;

                trace!(source_id = %source_id, sent, timestamp, "mock sample sent");

                thread::sleep(interval);
            }

            debug!(source_id = %source_id, "mock imu stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::mpsc;

    #[test]
    fn test_samples_carry_gravity() {
        let source = MockImuSource::new(
            "mock",
            MockImuConfig {
                rate_hz: 500.0,
                ..Default::default()
            },
            SessionClock::start(),
        );

        let (tx, rx) = mpsc::channel();
        source.listen(Arc::new(move |msg| {
            let _ = tx.send(msg);
        }));

        let mut last = -1.0;
        for _ in 0..5 {
            match rx.recv_timeout(Duration::from_secs(1)).unwrap() {
                ImuMessage::Sample(sample) => {
                    assert!((sample.accelerometer.z - GRAVITY).abs() < 1e-9);
                    assert!(sample.timestamp > last);
                    last = sample.timestamp;
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        source.stop();
        assert!(!source.is_listening());
    }

    #[test]
    fn test_disconnect_after_limit() {
        let source = MockImuSource::new(
            "mock",
            MockImuConfig {
                rate_hz: 1000.0,
                disconnect_after: Some(3),
                ..Default::default()
            },
            SessionClock::start(),
        );

        let (tx, rx) = mpsc::channel();
        source.listen(Arc::new(move |msg| {
            let _ = tx.send(msg);
        }));

        let messages: Vec<_> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(1)).unwrap())
            .collect();
        assert!(messages[..3].iter().all(|m| matches!(m, ImuMessage::Sample(_))));
        assert!(matches!(messages[3], ImuMessage::Disconnected(_)));
    }

    #[test]
    fn test_idempotent_listen() {
        let source = MockImuSource::with_defaults("mock", SessionClock::start());

        let count = Arc::new(AtomicU64::new(0));
        let first = count.clone();
        let second = count.clone();

        source.listen(Arc::new(move |_| {
            first.fetch_add(1, Ordering::Relaxed);
        }));
        source.listen(Arc::new(move |_| {
            second.fetch_add(1000, Ordering::Relaxed);
        }));

        thread::sleep(Duration::from_millis(30));
        source.stop();

        let total = count.load(Ordering::Relaxed);
        assert!(total > 0);
        assert!(total < 1000);
    }

    #[test]
    fn test_sweep_starts_at_peak_rate() {
        let sample = synthetic_sample(0.0, 0.0, 10.0);
        assert!((sample.gyroscope.z - 10f64.to_radians()).abs() < 1e-12);
        assert_eq!(sample.gyroscope.x, 0.0);
    }
}
