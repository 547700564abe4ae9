//! RigConfig - Config Loader output
//!
//! Describes a complete session: optics, filter tuning, pipeline limits,
//! display output, capture source and sensor transport.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{ContractError, DisplayLayout, EyeParameters};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete rig configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Optical setup
    #[serde(default)]
    pub eye: EyeParameters,

    /// Orientation filter tuning
    #[serde(default)]
    pub filter: FilterConfig,

    /// Queue sizes and timeouts
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Display output
    #[serde(default)]
    pub display: DisplayConfig,

    /// Screen capture source
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Sensor transport
    #[serde(default)]
    pub sensor: SensorConfig,
}

/// Fixed mounting offsets added to every orientation output (degrees)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MountOffset {
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
}

/// Complementary filter configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct FilterConfig {
    /// Gyro weight
    #[serde(default = "default_alpha")]
    #[validate(range(min = 0.0, max = 1.0, message = "must be within [0, 1]"))]
    pub alpha: f64,

    /// Largest accepted gap between samples (seconds)
    #[serde(default = "default_max_dt")]
    #[validate(range(exclusive_min = 0.0, message = "must be > 0"))]
    pub max_dt_s: f64,

    /// Smoothing factor for absolute attitude readings
    #[serde(default = "default_attitude_smoothing")]
    #[validate(range(exclusive_min = 0.0, max = 1.0, message = "must be within (0, 1]"))]
    pub attitude_smoothing: f64,

    /// EWMA weight of the newest squared tilt disagreement
    #[serde(default = "default_variance_smoothing")]
    #[validate(range(exclusive_min = 0.0, max = 1.0, message = "must be within (0, 1]"))]
    pub variance_smoothing: f64,

    /// Accelerometer norms below this are ignored (m/s²)
    #[serde(default = "default_min_accel_norm")]
    #[validate(range(min = 0.0, message = "must be >= 0"))]
    pub min_accel_norm: f64,

    /// Number of estimates kept for interpolation
    #[serde(default = "default_history_capacity")]
    #[validate(range(min = 2, max = 65536, message = "must be within [2, 65536]"))]
    pub history_capacity: usize,

    #[serde(default)]
    pub mount_offset_deg: MountOffset,
}

fn default_alpha() -> f64 {
    0.98
}

fn default_max_dt() -> f64 {
    0.5
}

fn default_attitude_smoothing() -> f64 {
    0.2
}

fn default_variance_smoothing() -> f64 {
    0.1
}

fn default_min_accel_norm() -> f64 {
    1e-3
}

fn default_history_capacity() -> usize {
    256
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            max_dt_s: default_max_dt(),
            attitude_smoothing: default_attitude_smoothing(),
            variance_smoothing: default_variance_smoothing(),
            min_accel_norm: default_min_accel_norm(),
            history_capacity: default_history_capacity(),
            mount_offset_deg: MountOffset::default(),
        }
    }
}

impl FilterConfig {
    /// Range and finiteness check; field names prefixed with `filter.`
    pub fn check(&self) -> Result<(), ContractError> {
        let offsets = [
            self.mount_offset_deg.yaw,
            self.mount_offset_deg.pitch,
            self.mount_offset_deg.roll,
        ];
        if offsets.iter().any(|v| !v.is_finite()) {
            return Err(ContractError::config_validation(
                "filter.mount_offset_deg",
                "must be finite",
            ));
        }
        self.validate()
            .map_err(|errors| first_validation_error("filter", &errors))
    }
}

/// Coordinator limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct PipelineSettings {
    /// Capacity of each inter-stage queue
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, max = 64, message = "must be within [1, 64]"))]
    pub queue_capacity: usize,

    /// Upper bound for a wait on an empty queue (milliseconds)
    #[serde(default = "default_stage_timeout_ms")]
    #[validate(range(min = 1, max = 10000, message = "must be within [1, 10000]"))]
    pub stage_timeout_ms: u64,

    /// Orientation older than this marks output as stale (seconds)
    #[serde(default = "default_staleness_threshold")]
    #[validate(range(exclusive_min = 0.0, message = "must be > 0"))]
    pub staleness_threshold_s: f64,
}

fn default_queue_capacity() -> usize {
    2
}

fn default_stage_timeout_ms() -> u64 {
    50
}

fn default_staleness_threshold() -> f64 {
    0.25
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            stage_timeout_ms: default_stage_timeout_ms(),
            staleness_threshold_s: default_staleness_threshold(),
        }
    }
}

impl PipelineSettings {
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate()
            .map_err(|errors| first_validation_error("pipeline", &errors))
    }
}

/// Display sink implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    /// Log a line per presented output
    #[default]
    Log,
    /// Write PNG snapshots to a directory
    Png,
}

/// Display output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub kind: DisplayKind,

    #[serde(default)]
    pub layout: DisplayLayout,

    /// Output directory (png)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Write or log every Nth presented output
    #[serde(default = "default_every_nth")]
    pub every_nth: u64,
}

fn default_every_nth() -> u64 {
    30
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            kind: DisplayKind::default(),
            layout: DisplayLayout::default(),
            output_dir: None,
            every_nth: default_every_nth(),
        }
    }
}

/// Screen capture implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    /// Synthetic desktop
    #[default]
    Mock,
    /// Still image file re-emitted at the frame rate
    Image,
}

/// Synthetic desktop content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockPattern {
    Solid,
    #[default]
    Gradient,
}

/// Screen capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub kind: CaptureKind,

    #[serde(default = "default_capture_width")]
    pub width: u32,

    #[serde(default = "default_capture_height")]
    pub height: u32,

    #[serde(default = "default_fps")]
    pub fps: f64,

    #[serde(default)]
    pub pattern: MockPattern,

    /// Fill colour for the solid pattern (RGBA)
    #[serde(default = "default_color")]
    pub color: [u8; 4],

    /// Source image (image)
    #[serde(default)]
    pub image_path: Option<PathBuf>,

    /// Draw a cursor dot at the image centre
    #[serde(default)]
    pub cursor: bool,
}

fn default_capture_width() -> u32 {
    1920
}

fn default_capture_height() -> u32 {
    1080
}

fn default_fps() -> f64 {
    60.0
}

fn default_color() -> [u8; 4] {
    [32, 96, 160, 255]
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            kind: CaptureKind::default(),
            width: default_capture_width(),
            height: default_capture_height(),
            fps: default_fps(),
            pattern: MockPattern::default(),
            color: default_color(),
            image_path: None,
            cursor: false,
        }
    }
}

/// Sensor transport implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Synthetic accel/gyro stream
    #[default]
    Mock,
    /// Replay of a `Yaw: .., Pitch: .., Roll: ..` log
    Replay,
}

/// Backpressure drop policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Evict the oldest queued message
    #[default]
    DropOldest,
    /// Discard the incoming message
    DropNewest,
}

/// Sensor transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub kind: SensorKind,

    #[serde(default = "default_source_id")]
    pub source_id: String,

    /// Sample rate (mock) or replay line rate (Hz)
    #[serde(default = "default_rate")]
    pub rate_hz: f64,

    /// Slow yaw sweep of the mock source (degrees per second)
    #[serde(default = "default_yaw_sweep")]
    pub yaw_sweep_deg_s: f64,

    /// Log file to replay (replay)
    #[serde(default)]
    pub replay_path: Option<PathBuf>,

    /// Restart the replay at EOF instead of disconnecting
    #[serde(default)]
    pub loop_replay: bool,

    /// Transport → tracker channel capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default)]
    pub drop_policy: DropPolicy,
}

fn default_source_id() -> String {
    "imu".to_string()
}

fn default_rate() -> f64 {
    200.0
}

fn default_yaw_sweep() -> f64 {
    10.0
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::default(),
            source_id: default_source_id(),
            rate_hz: default_rate(),
            yaw_sweep_deg_s: default_yaw_sweep(),
            replay_path: None,
            loop_replay: false,
            channel_capacity: default_channel_capacity(),
            drop_policy: DropPolicy::default(),
        }
    }
}

/// Convert the first (alphabetically) field error into a `ConfigValidation` error
pub(crate) fn first_validation_error(section: &str, errors: &ValidationErrors) -> ContractError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.first() {
        Some((field, errs)) => {
            let message = errs
                .first()
                .map(|e| match &e.message {
                    Some(m) => m.to_string(),
                    None => format!("failed '{}' check", e.code),
                })
                .unwrap_or_else(|| "invalid value".to_string());
            ContractError::config_validation(format!("{section}.{field}"), message)
        }
        None => ContractError::config_validation(section, errors.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RigConfig::default();
        assert_eq!(config.filter.alpha, 0.98);
        assert_eq!(config.filter.max_dt_s, 0.5);
        assert_eq!(config.pipeline.queue_capacity, 2);
        assert_eq!(config.pipeline.stage_timeout_ms, 50);
        assert_eq!(config.pipeline.staleness_threshold_s, 0.25);
        assert_eq!(config.sensor.drop_policy, DropPolicy::DropOldest);
        assert!(config.filter.check().is_ok());
        assert!(config.pipeline.check().is_ok());
    }

    #[test]
    fn test_filter_range_error_names_field() {
        let config = FilterConfig {
            alpha: 1.5,
            ..Default::default()
        };
        let err = config.check().unwrap_err();
        assert!(err.to_string().contains("filter.alpha"), "got: {err}");
    }

    #[test]
    fn test_pipeline_zero_capacity_rejected() {
        let settings = PipelineSettings {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(settings.check().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RigConfig =
            serde_json::from_str(r#"{"eye": {"ipd_m": 0.07}, "display": {"kind": "png"}}"#)
                .unwrap();
        assert_eq!(config.eye.ipd_m, 0.07);
        assert_eq!(config.eye.fov_deg, 90.0);
        assert_eq!(config.display.kind, DisplayKind::Png);
        assert_eq!(config.display.layout, DisplayLayout::SideBySide);
    }
}
