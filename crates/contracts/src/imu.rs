//! IMU data model - sensor transport output and filter output
//!
//! All timestamps are session-clock seconds (see [`crate::SessionClock`]).

use serde::{Deserialize, Serialize};

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// True when no component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Raw inertial sample
///
/// Body frame, gravity along +z when the headset is level.
/// Gyro axes: x = roll rate, y = pitch rate, z = yaw rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawImuSample {
    /// Session timestamp (seconds)
    pub timestamp: f64,

    /// Accelerometer (m/s²)
    pub accelerometer: Vector3,

    /// Gyroscope (rad/s)
    pub gyroscope: Vector3,
}

impl RawImuSample {
    pub fn is_finite(&self) -> bool {
        self.timestamp.is_finite() && self.accelerometer.is_finite() && self.gyroscope.is_finite()
    }
}

/// Absolute attitude as delivered by text transports (`Yaw: .., Pitch: .., Roll: ..`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeReading {
    /// Session timestamp (seconds)
    pub timestamp: f64,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
}

impl AttitudeReading {
    pub fn is_finite(&self) -> bool {
        self.timestamp.is_finite()
            && self.yaw_deg.is_finite()
            && self.pitch_deg.is_finite()
            && self.roll_deg.is_finite()
    }
}

/// Message handed from a sensor transport to the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImuMessage {
    /// Raw accel/gyro vectors
    Sample(RawImuSample),

    /// Already-fused attitude triple
    Attitude(AttitudeReading),

    /// Transport is gone; no further messages will follow
    Disconnected(String),
}

impl ImuMessage {
    /// Timestamp of the carried measurement, if any
    pub fn timestamp(&self) -> Option<f64> {
        match self {
            Self::Sample(s) => Some(s.timestamp),
            Self::Attitude(a) => Some(a.timestamp),
            Self::Disconnected(_) => None,
        }
    }
}

/// Fused head orientation
///
/// Angles in radians, each normalized to (-π, π].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationEstimate {
    /// Timestamp of the sample that produced this estimate
    pub timestamp: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    /// Smoothed squared tilt disagreement between gyro and accelerometer (rad²)
    pub variance: f64,
}

impl OrientationEstimate {
    /// Identity orientation at the given time
    pub fn level(timestamp: f64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    /// Age of this estimate relative to `now`
    pub fn age(&self, now: f64) -> f64 {
        (now - self.timestamp).max(0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.timestamp.is_finite()
            && self.yaw.is_finite()
            && self.pitch.is_finite()
            && self.roll.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_finiteness() {
        let mut sample = RawImuSample {
            timestamp: 0.5,
            accelerometer: Vector3::new(0.0, 0.0, 9.81),
            gyroscope: Vector3::default(),
        };
        assert!(sample.is_finite());

        sample.gyroscope.y = f64::NAN;
        assert!(!sample.is_finite());
    }

    #[test]
    fn test_estimate_age_never_negative() {
        let estimate = OrientationEstimate::level(2.0);
        assert_eq!(estimate.age(2.5), 0.5);
        assert_eq!(estimate.age(1.0), 0.0);
    }

    #[test]
    fn test_message_serde() {
        let msg = ImuMessage::Attitude(AttitudeReading {
            timestamp: 1.0,
            yaw_deg: 10.0,
            pitch_deg: -5.0,
            roll_deg: 0.0,
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: ImuMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
