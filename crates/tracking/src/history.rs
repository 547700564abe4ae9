//! Bounded orientation history with time interpolation.
//!
//! Backed by a ring buffer; the oldest estimate is evicted when full.

use std::fmt;

use contracts::OrientationEstimate;
use ringbuf::{traits::*, HeapRb};

use crate::angles::lerp_angle;

/// Recent estimates in timestamp order
pub struct OrientationHistory {
    ring: HeapRb<OrientationEstimate>,
    evicted: u64,
}

impl fmt::Debug for OrientationHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrientationHistory")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.ring.capacity())
            .field("evicted", &self.evicted)
            .finish()
    }
}

impl OrientationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity.max(2)),
            evicted: 0,
        }
    }

    /// Append an estimate; ignored if older than the newest one
    pub fn push(&mut self, estimate: OrientationEstimate) {
        if let Some(last) = self.latest() {
            if estimate.timestamp < last.timestamp {
                return;
            }
        }
        if self.ring.is_full() {
            let _ = self.ring.try_pop();
            self.evicted += 1;
        }
        let _ = self.ring.try_push(estimate);
    }

    pub fn latest(&self) -> Option<OrientationEstimate> {
        self.ring.iter().last().copied()
    }

    /// Estimate at time `t`
    ///
    /// Interpolated along the shortest arc between the bracketing entries;
    /// clamped to the oldest/newest entry outside the covered range.
    pub fn estimate_at(&self, t: f64) -> Option<OrientationEstimate> {
        let mut prev: Option<&OrientationEstimate> = None;
        for current in self.ring.iter() {
            if current.timestamp >= t {
                return Some(match prev {
                    Some(p) if current.timestamp > p.timestamp => {
                        let s = (t - p.timestamp) / (current.timestamp - p.timestamp);
                        OrientationEstimate {
                            timestamp: t,
                            yaw: lerp_angle(p.yaw, current.yaw, s),
                            pitch: lerp_angle(p.pitch, current.pitch, s),
                            roll: lerp_angle(p.roll, current.roll, s),
                            variance: p.variance + s * (current.variance - p.variance),
                        }
                    }
                    _ => *current,
                });
            }
            prev = Some(current);
        }
        prev.copied()
    }

    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Estimates dropped because the buffer was full
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }
}
