//! Optical parameters of the headset and the distortion cache key

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ContractError, EyeSide};

/// Radial lens distortion coefficients for one eye
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LensCoefficients {
    /// r² term
    #[serde(default)]
    pub k1: f64,

    /// r⁴ term
    #[serde(default)]
    pub k2: f64,

    /// Horizontal lens centre offset, in units of the half extent of the eye buffer.
    /// Positive moves the centre toward the nose for the left eye; mirrored for the right.
    #[serde(default)]
    pub center_offset_x: f64,
}

impl LensCoefficients {
    pub fn is_finite(&self) -> bool {
        self.k1.is_finite() && self.k2.is_finite() && self.center_offset_x.is_finite()
    }
}

/// Whether head roll is applied to the projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollMode {
    #[default]
    Apply,
    Ignore,
}

/// Per-session optical setup
///
/// Only replaced through explicit reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct EyeParameters {
    /// Interpupillary distance (metres)
    #[serde(default = "default_ipd")]
    #[validate(range(exclusive_min = 0.0, max = 0.2, message = "must be within (0, 0.2] metres"))]
    pub ipd_m: f64,

    /// Horizontal field of view per eye (degrees)
    #[serde(default = "default_fov")]
    #[validate(range(
        exclusive_min = 0.0,
        exclusive_max = 180.0,
        message = "must be within (0, 180) degrees"
    ))]
    pub fov_deg: f64,

    #[serde(default)]
    pub left_lens: LensCoefficients,

    #[serde(default)]
    pub right_lens: LensCoefficients,

    /// Eye buffer width (pixels)
    #[serde(default = "default_eye_width")]
    #[validate(range(min = 1, max = 8192, message = "must be within [1, 8192]"))]
    pub eye_width: u32,

    /// Eye buffer height (pixels)
    #[serde(default = "default_eye_height")]
    #[validate(range(min = 1, max = 8192, message = "must be within [1, 8192]"))]
    pub eye_height: u32,

    /// Distance from the eyes to the virtual desktop plane (metres)
    #[serde(default = "default_screen_distance")]
    #[validate(range(exclusive_min = 0.0, message = "must be > 0"))]
    pub screen_distance_m: f64,

    /// Width of the virtual desktop plane (metres); height follows the capture aspect
    #[serde(default = "default_screen_width")]
    #[validate(range(exclusive_min = 0.0, message = "must be > 0"))]
    pub screen_width_m: f64,

    #[serde(default)]
    pub roll_mode: RollMode,
}

fn default_ipd() -> f64 {
    0.063
}

fn default_fov() -> f64 {
    90.0
}

fn default_eye_width() -> u32 {
    1080
}

fn default_eye_height() -> u32 {
    1200
}

fn default_screen_distance() -> f64 {
    2.0
}

fn default_screen_width() -> f64 {
    3.2
}

impl Default for EyeParameters {
    fn default() -> Self {
        Self {
            ipd_m: default_ipd(),
            fov_deg: default_fov(),
            left_lens: LensCoefficients::default(),
            right_lens: LensCoefficients::default(),
            eye_width: default_eye_width(),
            eye_height: default_eye_height(),
            screen_distance_m: default_screen_distance(),
            screen_width_m: default_screen_width(),
            roll_mode: RollMode::default(),
        }
    }
}

impl EyeParameters {
    /// Lens coefficients of one eye
    pub fn lens(&self, side: EyeSide) -> &LensCoefficients {
        match side {
            EyeSide::Left => &self.left_lens,
            EyeSide::Right => &self.right_lens,
        }
    }

    /// Full configuration check: ranges plus finiteness of every float
    ///
    /// Field names in errors are prefixed with `eye.`.
    pub fn check(&self) -> Result<(), ContractError> {
        let floats = [
            ("eye.ipd_m", self.ipd_m),
            ("eye.fov_deg", self.fov_deg),
            ("eye.screen_distance_m", self.screen_distance_m),
            ("eye.screen_width_m", self.screen_width_m),
        ];
        for (field, value) in floats {
            if !value.is_finite() {
                return Err(ContractError::config_validation(field, "must be finite"));
            }
        }
        if !self.left_lens.is_finite() {
            return Err(ContractError::config_validation("eye.left_lens", "must be finite"));
        }
        if !self.right_lens.is_finite() {
            return Err(ContractError::config_validation("eye.right_lens", "must be finite"));
        }

        self.validate()
            .map_err(|errors| crate::rig::first_validation_error("eye", &errors))
    }

    /// Cache key for the distortion map of one eye
    pub fn distortion_key(&self, side: EyeSide) -> DistortionKey {
        DistortionKey {
            bits: self.bit_pattern(),
            side,
        }
    }

    /// Stable 64-bit hash of every parameter (FNV-1a over the bit patterns)
    pub fn fingerprint(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut hash = OFFSET;
        for word in self.bit_pattern() {
            for byte in word.to_le_bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(PRIME);
            }
        }
        hash
    }

    fn bit_pattern(&self) -> [u64; 13] {
        [
            self.ipd_m.to_bits(),
            self.fov_deg.to_bits(),
            self.left_lens.k1.to_bits(),
            self.left_lens.k2.to_bits(),
            self.left_lens.center_offset_x.to_bits(),
            self.right_lens.k1.to_bits(),
            self.right_lens.k2.to_bits(),
            self.right_lens.center_offset_x.to_bits(),
            u64::from(self.eye_width),
            u64::from(self.eye_height),
            self.screen_distance_m.to_bits(),
            self.screen_width_m.to_bits(),
            match self.roll_mode {
                RollMode::Apply => 0,
                RollMode::Ignore => 1,
            },
        ]
    }
}

/// Identity of a distortion map: exact parameter bits plus the eye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DistortionKey {
    bits: [u64; 13],
    side: EyeSide,
}

impl DistortionKey {
    pub fn side(&self) -> EyeSide {
        self.side
    }
}
