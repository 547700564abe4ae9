//! Frame data model - capture output, eye buffers and the pipeline unit
//!
//! Pixel payloads of captured frames are immutable `Bytes` so the capture stage
//! can hand them off without copying.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ContractError, OrientationEstimate};

/// Pixel layout of a captured desktop image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Bgra8,
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Rgb8 => 3,
        }
    }
}

/// Captured desktop frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedFrame {
    /// Capture sequence number
    pub frame_id: u64,

    /// Session timestamp at capture (seconds)
    pub timestamp: f64,

    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,

    /// Raw pixel rows, tightly packed
    pub data: Bytes,
}

impl CapturedFrame {
    /// Frame filled with a single RGBA colour
    pub fn solid(frame_id: u64, timestamp: f64, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();

        Self {
            frame_id,
            timestamp,
            width,
            height,
            format: PixelFormat::Rgba8,
            data: Bytes::from(data),
        }
    }

    /// Byte length implied by dimensions and format
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Check the buffer matches the declared dimensions
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.width == 0 || self.height == 0 {
            return Err(ContractError::malformed_frame(
                self.frame_id,
                format!("empty dimensions {}x{}", self.width, self.height),
            ));
        }
        if self.data.len() != self.expected_len() {
            return Err(ContractError::malformed_frame(
                self.frame_id,
                format!(
                    "buffer is {} bytes, expected {} for {}x{} {:?}",
                    self.data.len(),
                    self.expected_len(),
                    self.width,
                    self.height,
                    self.format
                ),
            ));
        }
        if !self.timestamp.is_finite() {
            return Err(ContractError::malformed_frame(
                self.frame_id,
                "non-finite timestamp",
            ));
        }
        Ok(())
    }

    /// RGBA value of one pixel (alpha is 255 for RGB input)
    #[inline]
    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        let bpp = self.format.bytes_per_pixel();
        let idx = (y as usize * self.width as usize + x as usize) * bpp;
        let px = &self.data[idx..idx + bpp];
        match self.format {
            PixelFormat::Rgba8 => [px[0], px[1], px[2], px[3]],
            PixelFormat::Bgra8 => [px[2], px[1], px[0], px[3]],
            PixelFormat::Rgb8 => [px[0], px[1], px[2], 255],
        }
    }
}

/// Which eye a buffer or distortion map belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeSide {
    Left,
    Right,
}

impl EyeSide {
    /// Lateral sign: left eye sits at -IPD/2
    pub fn lateral_sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Rendered RGBA8 buffer for one eye
#[derive(Debug, Clone, PartialEq)]
pub struct EyeBuffer {
    pub side: EyeSide,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,

    /// Capture timestamp of the source frame
    pub frame_timestamp: f64,

    /// Timestamp of the orientation estimate actually used
    pub orientation_timestamp: f64,
}

impl EyeBuffer {
    /// Black, opaque buffer
    pub fn new(side: EyeSide, width: u32, height: u32) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * 4];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            side,
            width,
            height,
            data,
            frame_timestamp: 0.0,
            orientation_timestamp: 0.0,
        }
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// Tracking quality attached to every output
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TrackingStatus {
    /// Orientation is fresh
    #[default]
    Live,
    /// Orientation is older than the staleness threshold
    Stale { age_s: f64 },
    /// No orientation has ever been received
    Lost,
}

impl TrackingStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Eye buffer pair produced by the projector
#[derive(Debug, Clone, PartialEq)]
pub struct StereoFrame {
    pub left: EyeBuffer,
    pub right: EyeBuffer,
    pub tracking: TrackingStatus,
}

/// Stage timestamps of one pipeline frame (session seconds)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTimings {
    pub captured_at: f64,
    pub processed_at: Option<f64>,
    pub presented_at: Option<f64>,
}

/// Unit moving through the coordinator queues
///
/// Created at capture, filled in by the process stage, consumed by the render stage.
#[derive(Debug, Clone)]
pub struct PipelineFrame {
    pub captured: CapturedFrame,
    pub orientation: Option<OrientationEstimate>,
    pub eyes: Option<StereoFrame>,
    pub timings: FrameTimings,
}

impl PipelineFrame {
    pub fn new(captured: CapturedFrame) -> Self {
        let captured_at = captured.timestamp;
        Self {
            captured,
            orientation: None,
            eyes: None,
            timings: FrameTimings {
                captured_at,
                ..Default::default()
            },
        }
    }

    pub fn frame_id(&self) -> u64 {
        self.captured.frame_id
    }

    pub fn timestamp(&self) -> f64 {
        self.captured.timestamp
    }
}

/// How the eye pair is handed to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLayout {
    /// One buffer, left eye in the left half
    #[default]
    SideBySide,
    /// Two separate surfaces
    Dual,
}

/// Pixels handed to the display
#[derive(Debug, Clone, PartialEq)]
pub enum DisplaySurface {
    SideBySide {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    Dual {
        left: EyeBuffer,
        right: EyeBuffer,
    },
}

impl DisplaySurface {
    /// Total output size in pixels (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::SideBySide { width, height, .. } => (*width, *height),
            Self::Dual { left, right } => (left.width + right.width, left.height.max(right.height)),
        }
    }
}

/// Final output of the render stage
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayOutput {
    pub frame_id: u64,
    pub frame_timestamp: f64,
    pub orientation_timestamp: f64,
    pub tracking: TrackingStatus,
    pub surface: DisplaySurface,
}
