//! Session clock shared by transports, capture and the coordinator

use std::time::{Duration, Instant};

/// Monotonic clock with its origin at session start
///
/// Copies share the same origin, so timestamps from different workers are comparable.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds since session start
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    /// Session timestamp of an instant (0 for instants before the origin)
    pub fn timestamp_of(&self, instant: Instant) -> f64 {
        instant
            .checked_duration_since(self.origin)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}
