//! Complementary orientation filter.
//!
//! Gyro integration for all three axes, corrected toward the accelerometer
//! tilt for pitch and roll. Yaw has no absolute reference and is gyro only.
//!
//! Fusion step per tilt axis: θ = θ_gyro + (1 - α)·wrap(θ_accel - θ_gyro),
//! i.e. α·θ_gyro + (1 - α)·θ_accel taken along the shortest arc.

use contracts::{
    AttitudeReading, ContractError, FilterConfig, OrientationEstimate, RawImuSample,
};
use thiserror::Error;

use crate::angles::{tilt_from_gravity, wrap_angle};

/// Why a sample did not change the estimate
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FilterRejection {
    /// Timestamp did not advance
    #[error("non-positive time step ({dt:.6}s)")]
    NonPositiveDt { dt: f64 },

    /// Gap since the previous sample exceeds the configured maximum
    #[error("time step {dt:.3}s exceeds max {max_dt:.3}s")]
    GapTooLarge { dt: f64, max_dt: f64 },

    /// Sample contains NaN or infinity
    #[error("non-finite sample")]
    NonFinite,
}

impl FilterRejection {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::NonPositiveDt { .. } => "non_positive_dt",
            Self::GapTooLarge { .. } => "gap",
            Self::NonFinite => "non_finite",
        }
    }
}

impl From<FilterRejection> for ContractError {
    fn from(rejection: FilterRejection) -> Self {
        ContractError::invalid_sample("orientation_filter", rejection.to_string())
    }
}

/// Counters of accepted and rejected inputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub accepted: u64,
    pub non_positive_dt: u64,
    pub gaps: u64,
    pub non_finite: u64,
}

impl FilterStats {
    pub fn rejected(&self) -> u64 {
        self.non_positive_dt + self.gaps + self.non_finite
    }
}

/// Internal state, before recentering and mount offsets
#[derive(Debug, Clone, Copy)]
struct Attitude {
    yaw: f64,
    pitch: f64,
    roll: f64,
    variance: f64,
    timestamp: f64,
}

/// Complementary filter producing `OrientationEstimate`s
///
/// The estimate only changes on accepted samples; it never decays on its own.
#[derive(Debug, Clone)]
pub struct OrientationFilter {
    config: FilterConfig,
    attitude: Option<Attitude>,
    /// Time anchor for Δt; moves on accepted samples and on gaps
    last_time: Option<f64>,
    /// Raw yaw treated as zero after `recenter`
    yaw_reference: f64,
    stats: FilterStats,
}

impl OrientationFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            attitude: None,
            last_time: None,
            yaw_reference: 0.0,
            stats: FilterStats::default(),
        }
    }

    /// Feed one raw accelerometer/gyroscope sample
    pub fn update(
        &mut self,
        sample: &RawImuSample,
    ) -> Result<OrientationEstimate, FilterRejection> {
        if !sample.is_finite() {
            self.stats.non_finite += 1;
            return Err(FilterRejection::NonFinite);
        }

        let accel = sample.accelerometer;
        let accel_tilt = (accel.norm() >= self.config.min_accel_norm)
            .then(|| tilt_from_gravity(accel.x, accel.y, accel.z));

        let Some(dt) = self.check_time(sample.timestamp)? else {
            // First sample: tilt straight from gravity, yaw starts at zero
            let (roll, pitch) = accel_tilt.unwrap_or((0.0, 0.0));
            return Ok(self.accept(Attitude {
                yaw: 0.0,
                pitch,
                roll,
                variance: 0.0,
                timestamp: sample.timestamp,
            }));
        };

        let prev = self.attitude.unwrap_or(Attitude {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            variance: 0.0,
            timestamp: sample.timestamp,
        });

        let gyro = sample.gyroscope;
        let roll_gyro = wrap_angle(prev.roll + gyro.x * dt);
        let pitch_gyro = wrap_angle(prev.pitch + gyro.y * dt);
        let yaw = wrap_angle(prev.yaw + gyro.z * dt);

        let (roll, pitch, variance) = match accel_tilt {
            Some((roll_acc, pitch_acc)) => {
                let k = 1.0 - self.config.alpha;
                let d_roll = wrap_angle(roll_acc - roll_gyro);
                let d_pitch = wrap_angle(pitch_acc - pitch_gyro);
                (
                    wrap_angle(roll_gyro + k * d_roll),
                    wrap_angle(pitch_gyro + k * d_pitch),
                    self.smooth_variance(prev.variance, d_roll * d_roll + d_pitch * d_pitch),
                )
            }
            None => (roll_gyro, pitch_gyro, prev.variance),
        };

        Ok(self.accept(Attitude {
            yaw,
            pitch,
            roll,
            variance,
            timestamp: sample.timestamp,
        }))
    }

    /// Feed an absolute yaw/pitch/roll reading (degrees)
    ///
    /// Exponential smoothing per axis; the first reading passes through.
    pub fn update_attitude(
        &mut self,
        reading: &AttitudeReading,
    ) -> Result<OrientationEstimate, FilterRejection> {
        if !reading.is_finite() {
            self.stats.non_finite += 1;
            return Err(FilterRejection::NonFinite);
        }

        let yaw_r = wrap_angle(reading.yaw_deg.to_radians());
        let pitch_r = wrap_angle(reading.pitch_deg.to_radians());
        let roll_r = wrap_angle(reading.roll_deg.to_radians());

        let first = self.check_time(reading.timestamp)?.is_none();
        let attitude = match self.attitude {
            Some(prev) if !first => {
                let beta = self.config.attitude_smoothing;
                let d_yaw = wrap_angle(yaw_r - prev.yaw);
                let d_pitch = wrap_angle(pitch_r - prev.pitch);
                let d_roll = wrap_angle(roll_r - prev.roll);
                Attitude {
                    yaw: wrap_angle(prev.yaw + beta * d_yaw),
                    pitch: wrap_angle(prev.pitch + beta * d_pitch),
                    roll: wrap_angle(prev.roll + beta * d_roll),
                    variance: self
                        .smooth_variance(prev.variance, d_roll * d_roll + d_pitch * d_pitch),
                    timestamp: reading.timestamp,
                }
            }
            _ => Attitude {
                yaw: yaw_r,
                pitch: pitch_r,
                roll: roll_r,
                variance: 0.0,
                timestamp: reading.timestamp,
            },
        };

        Ok(self.accept(attitude))
    }

    /// Latest estimate, or None before the first accepted sample
    pub fn current(&self) -> Option<OrientationEstimate> {
        self.attitude.map(|a| self.output(&a))
    }

    /// Make the current heading the zero yaw reference
    ///
    /// Returns false when there is no estimate yet.
    pub fn recenter(&mut self) -> bool {
        match self.attitude {
            Some(attitude) => {
                self.yaw_reference = attitude.yaw;
                true
            }
            None => false,
        }
    }

    /// Age of the latest estimate relative to `now` (infinite before the first sample)
    pub fn staleness(&self, now: f64) -> f64 {
        self.attitude
            .map(|a| (now - a.timestamp).max(0.0))
            .unwrap_or(f64::INFINITY)
    }

    /// Replace the tuning, keeping the current state
    pub fn reconfigure(&mut self, config: FilterConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// Validate the timestamp against the anchor
    ///
    /// `Ok(None)` for the first sample, `Ok(Some(dt))` otherwise.
    fn check_time(&mut self, timestamp: f64) -> Result<Option<f64>, FilterRejection> {
        let Some(last) = self.last_time else {
            return Ok(None);
        };

        let dt = timestamp - last;
        if dt <= 0.0 {
            self.stats.non_positive_dt += 1;
            return Err(FilterRejection::NonPositiveDt { dt });
        }
        if dt > self.config.max_dt_s {
            // Re-anchor so a stream resuming after the gap is accepted again
            self.last_time = Some(timestamp);
            self.stats.gaps += 1;
            return Err(FilterRejection::GapTooLarge {
                dt,
                max_dt: self.config.max_dt_s,
            });
        }
        Ok(Some(dt))
    }

    fn smooth_variance(&self, prev: f64, disagreement: f64) -> f64 {
        let lambda = self.config.variance_smoothing;
        (1.0 - lambda) * prev + lambda * disagreement
    }

    fn accept(&mut self, attitude: Attitude) -> OrientationEstimate {
        self.attitude = Some(attitude);
        self.last_time = Some(attitude.timestamp);
        self.stats.accepted += 1;
        self.output(&attitude)
    }

    fn output(&self, attitude: &Attitude) -> OrientationEstimate {
        let offset = &self.config.mount_offset_deg;
        OrientationEstimate {
            timestamp: attitude.timestamp,
            yaw: wrap_angle(attitude.yaw - self.yaw_reference + offset.yaw.to_radians()),
            pitch: wrap_angle(attitude.pitch + offset.pitch.to_radians()),
            roll: wrap_angle(attitude.roll + offset.roll.to_radians()),
            variance: attitude.variance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MountOffset, Vector3};
    use rand::Rng;

    const G: f64 = 9.81;

    fn sample(t: f64, accel: (f64, f64, f64), gyro: (f64, f64, f64)) -> RawImuSample {
        RawImuSample {
            timestamp: t,
            accelerometer: Vector3::new(accel.0, accel.1, accel.2),
            gyroscope: Vector3::new(gyro.0, gyro.1, gyro.2),
        }
    }

    fn level(t: f64) -> RawImuSample {
        sample(t, (0.0, 0.0, G), (0.0, 0.0, 0.0))
    }

    #[test]
    fn test_level_stationary_stays_at_zero() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        for i in 0..100 {
            filter.update(&level(i as f64 * 0.01)).unwrap();
        }
        let est = filter.current().unwrap();
        assert!(est.yaw.abs() < 1e-9);
        assert!(est.pitch.abs() < 1e-9);
        assert!(est.roll.abs() < 1e-9);
    }

    #[test]
    fn test_converges_from_tilted_start_and_stops_drifting() {
        let mut filter = OrientationFilter::new(FilterConfig::default());

        // Initialise at 0.5 rad roll, then hold level with zero rate
        filter
            .update(&sample(0.0, (0.0, G * 0.5f64.sin(), G * 0.5f64.cos()), (0.0, 0.0, 0.0)))
            .unwrap();
        assert!((filter.current().unwrap().roll - 0.5).abs() < 1e-9);

        let mut t = 0.0;
        for _ in 0..1000 {
            t += 0.01;
            filter.update(&level(t)).unwrap();
        }
        let converged = filter.current().unwrap();
        assert!(converged.roll.abs() < 1e-3, "roll {}", converged.roll);
        assert!(converged.pitch.abs() < 1e-3);
        assert_eq!(converged.yaw, 0.0);

        for _ in 0..100 {
            t += 0.01;
            filter.update(&level(t)).unwrap();
        }
        let later = filter.current().unwrap();
        assert!((later.roll - converged.roll).abs() <= converged.roll.abs());
        assert!(later.roll.abs() < 1e-3);
        assert_eq!(later.yaw, 0.0);
    }

    #[test]
    fn test_rejected_timestamps_leave_estimate_unchanged() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        filter.update(&level(1.0)).unwrap();
        filter.update(&sample(1.01, (0.0, 0.0, G), (0.0, 0.0, 1.0))).unwrap();
        let before = filter.current().unwrap();

        let err = filter
            .update(&sample(0.0, (0.0, 0.0, G), (0.0, 0.0, 5.0)))
            .unwrap_err();
        assert!(matches!(err, FilterRejection::NonPositiveDt { .. }));
        assert_eq!(filter.current().unwrap(), before);

        let err = filter
            .update(&sample(1.01, (0.0, 0.0, G), (0.0, 0.0, 5.0)))
            .unwrap_err();
        assert!(matches!(err, FilterRejection::NonPositiveDt { .. }));
        assert_eq!(filter.current().unwrap(), before);

        let err = filter
            .update(&sample(5.0, (0.0, 0.0, G), (0.0, 0.0, 5.0)))
            .unwrap_err();
        assert!(matches!(err, FilterRejection::GapTooLarge { .. }));
        assert_eq!(filter.current().unwrap(), before);

        assert_eq!(filter.stats().rejected(), 3);
    }

    #[test]
    fn test_stream_resumes_after_gap() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        filter.update(&level(0.0)).unwrap();
        assert!(filter.update(&level(2.0)).is_err());

        let est = filter.update(&level(2.01)).unwrap();
        assert_eq!(est.timestamp, 2.01);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        filter.update(&level(0.0)).unwrap();
        let before = filter.current();

        let err = filter
            .update(&sample(0.01, (f64::NAN, 0.0, G), (0.0, 0.0, 0.0)))
            .unwrap_err();
        assert_eq!(err, FilterRejection::NonFinite);
        assert_eq!(filter.current(), before);

        // the anchor did not move: the next good sample still integrates 0.01s
        let est = filter.update(&sample(0.01, (0.0, 0.0, G), (0.0, 0.0, 1.0))).unwrap();
        assert!((est.yaw - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_yaw_integrates_gyro_only() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        filter.update(&level(0.0)).unwrap();
        let mut t = 0.0;
        for _ in 0..100 {
            t += 0.01;
            filter.update(&sample(t, (0.0, 0.0, G), (0.0, 0.0, 0.5))).unwrap();
        }
        let est = filter.current().unwrap();
        assert!((est.yaw - 0.5).abs() < 1e-9, "yaw {}", est.yaw);
    }

    #[test]
    fn test_zero_accel_uses_gyro_only() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        filter.update(&level(0.0)).unwrap();
        let est = filter
            .update(&sample(0.1, (0.0, 0.0, 0.0), (0.2, 0.0, 0.0)))
            .unwrap();
        assert!((est.roll - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_angles_stay_wrapped() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        filter.update(&level(0.0)).unwrap();
        let mut t = 0.0;
        for _ in 0..500 {
            t += 0.01;
            let est = filter.update(&sample(t, (0.0, 0.0, G), (0.0, 0.0, 3.0))).unwrap();
            assert!(est.yaw > -std::f64::consts::PI && est.yaw <= std::f64::consts::PI);
        }
    }

    #[test]
    fn test_noisy_stationary_stays_near_level() {
        let mut rng = rand::rng();
        let mut filter = OrientationFilter::new(FilterConfig::default());
        let mut t = 0.0;
        for _ in 0..2000 {
            t += 0.005;
            let noisy = sample(
                t,
                (
                    rng.random_range(-0.2..0.2),
                    rng.random_range(-0.2..0.2),
                    G + rng.random_range(-0.2..0.2),
                ),
                (
                    rng.random_range(-0.01..0.01),
                    rng.random_range(-0.01..0.01),
                    0.0,
                ),
            );
            filter.update(&noisy).unwrap();
        }
        let est = filter.current().unwrap();
        assert!(est.roll.abs() < 0.05, "roll {}", est.roll);
        assert!(est.pitch.abs() < 0.05, "pitch {}", est.pitch);
        assert!(est.variance < 0.01);
    }

    #[test]
    fn test_attitude_smoothing() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        let reading = |t: f64, yaw: f64| AttitudeReading {
            timestamp: t,
            yaw_deg: yaw,
            pitch_deg: 0.0,
            roll_deg: 0.0,
        };

        let first = filter.update_attitude(&reading(0.0, 10.0)).unwrap();
        assert!((first.yaw.to_degrees() - 10.0).abs() < 1e-9);

        let second = filter.update_attitude(&reading(0.02, 20.0)).unwrap();
        assert!((second.yaw.to_degrees() - 12.0).abs() < 1e-9);

        assert!(filter.update_attitude(&reading(0.01, 90.0)).is_err());
        assert_eq!(filter.current().unwrap(), second);
    }

    #[test]
    fn test_attitude_wraps_through_180() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        let reading = |t: f64, yaw: f64| AttitudeReading {
            timestamp: t,
            yaw_deg: yaw,
            pitch_deg: 0.0,
            roll_deg: 0.0,
        };
        filter.update_attitude(&reading(0.0, 179.0)).unwrap();
        let est = filter.update_attitude(&reading(0.02, -179.0)).unwrap();
        // 20% of the 2° short arc, not of the 358° long one
        assert!((est.yaw.to_degrees() - 179.4).abs() < 1e-9, "{}", est.yaw.to_degrees());
    }

    #[test]
    fn test_recenter_and_mount_offset() {
        let config = FilterConfig {
            mount_offset_deg: MountOffset {
                yaw: 0.0,
                pitch: 12.0,
                roll: 0.0,
            },
            ..Default::default()
        };
        let mut filter = OrientationFilter::new(config);
        assert!(!filter.recenter());

        filter.update(&level(0.0)).unwrap();
        filter.update(&sample(0.1, (0.0, 0.0, G), (0.0, 0.0, 1.0))).unwrap();
        assert!((filter.current().unwrap().yaw - 0.1).abs() < 1e-12);
        assert!((filter.current().unwrap().pitch.to_degrees() - 12.0).abs() < 1e-9);

        assert!(filter.recenter());
        assert!(filter.current().unwrap().yaw.abs() < 1e-12);
    }

    #[test]
    fn test_staleness() {
        let mut filter = OrientationFilter::new(FilterConfig::default());
        assert!(filter.staleness(1.0).is_infinite());
        filter.update(&level(1.0)).unwrap();
        assert!((filter.staleness(1.3) - 0.3).abs() < 1e-12);
    }
}
