//! Stereo projector: captured desktop + head orientation -> two eye buffers.

use std::sync::Arc;

use contracts::{
    CapturedFrame, ContractError, EyeBuffer, EyeParameters, EyeSide, OrientationEstimate,
    StereoFrame, TrackingStatus,
};
use nalgebra::Vector3;
use thiserror::Error;
use tracing::instrument;

use crate::geometry::{eye_origin, focal_length_px, head_rotation, DesktopPlane};
use crate::sampling::sample_frame;
use crate::DistortionCache;

/// Projection failure for a single frame
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("invalid eye parameter '{field}': {message}")]
    InvalidParameters { field: &'static str, message: String },

    #[error("malformed frame {frame_id}: {message}")]
    MalformedFrame { frame_id: u64, message: String },

    #[error("non-finite orientation at t={timestamp}")]
    NonFiniteOrientation { timestamp: f64 },
}

impl From<ProjectionError> for ContractError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::InvalidParameters { field, message } => {
                ContractError::config_validation(format!("eye.{field}"), message)
            }
            ProjectionError::MalformedFrame { frame_id, message } => {
                ContractError::malformed_frame(frame_id, message)
            }
            err @ ProjectionError::NonFiniteOrientation { .. } => ContractError::Projection {
                frame_id: 0,
                message: err.to_string(),
            },
        }
    }
}

/// Per-eye projection with parallax and lens pre-distortion
#[derive(Debug, Clone)]
pub struct StereoProjector {
    cache: Arc<DistortionCache>,
}

impl StereoProjector {
    pub fn new(cache: Arc<DistortionCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<DistortionCache> {
        &self.cache
    }

    /// Render both eyes
    ///
    /// IPD = 0 is accepted here (both eyes at the same point).
    #[instrument(
        name = "stereo_project",
        skip_all,
        fields(frame_id = frame.frame_id, w = params.eye_width, h = params.eye_height)
    )]
    pub fn project(
        &self,
        frame: &CapturedFrame,
        orientation: &OrientationEstimate,
        params: &EyeParameters,
    ) -> Result<(EyeBuffer, EyeBuffer), ProjectionError> {
        validate_parameters(params)?;
        frame
            .validate()
            .map_err(|e| ProjectionError::MalformedFrame {
                frame_id: frame.frame_id,
                message: e.to_string(),
            })?;
        if !orientation.is_finite() {
            return Err(ProjectionError::NonFiniteOrientation {
                timestamp: orientation.timestamp,
            });
        }

        let left = self.render_eye(frame, orientation, params, EyeSide::Left);
        let right = self.render_eye(frame, orientation, params, EyeSide::Right);
        Ok((left, right))
    }

    /// `project` plus the tracking tag
    pub fn project_stereo(
        &self,
        frame: &CapturedFrame,
        orientation: &OrientationEstimate,
        params: &EyeParameters,
        tracking: TrackingStatus,
    ) -> Result<StereoFrame, ProjectionError> {
        let (left, right) = self.project(frame, orientation, params)?;
        Ok(StereoFrame {
            left,
            right,
            tracking,
        })
    }

    fn render_eye(
        &self,
        frame: &CapturedFrame,
        orientation: &OrientationEstimate,
        params: &EyeParameters,
        side: EyeSide,
    ) -> EyeBuffer {
        let undistorted = render_undistorted(frame, orientation, params, side);
        let map = self.cache.map_for(params, side);
        map.apply(&undistorted)
    }
}

/// Ray-cast the desktop plane for one eye, without lens correction
pub fn render_undistorted(
    frame: &CapturedFrame,
    orientation: &OrientationEstimate,
    params: &EyeParameters,
    side: EyeSide,
) -> EyeBuffer {
    let w = params.eye_width;
    let h = params.eye_height;
    let rotation = head_rotation(orientation, params.roll_mode);
    let origin = eye_origin(&rotation, params.ipd_m, side);
    let plane = DesktopPlane::new(params, frame.width, frame.height);
    let focal = focal_length_px(w, params.fov_deg);

    let mut buffer = EyeBuffer::new(side, w, h);
    buffer.frame_timestamp = frame.timestamp;
    buffer.orientation_timestamp = orientation.timestamp;

    let half_w = w as f64 / 2.0;
    let half_h = h as f64 / 2.0;
    let src_w = frame.width as f64;
    let src_h = frame.height as f64;

    for (i, dst) in buffer.data.chunks_exact_mut(4).enumerate() {
        let x = (i % w as usize) as f64;
        let y = (i / w as usize) as f64;
        let ray = Vector3::new(
            (x + 0.5 - half_w) / focal,
            -(y + 0.5 - half_h) / focal,
            1.0,
        );
        let dir = rotation * ray;

        if let Some((u, v)) = plane.intersect(&origin, &dir) {
            let sx = (u * src_w - 0.5) as f32;
            let sy = (v * src_h - 0.5) as f32;
            dst.copy_from_slice(&sample_frame(frame, sx, sy));
        }
    }
    buffer
}

fn validate_parameters(params: &EyeParameters) -> Result<(), ProjectionError> {
    let invalid = |field: &'static str, message: &str| {
        Err(ProjectionError::InvalidParameters {
            field,
            message: message.to_string(),
        })
    };

    if !params.ipd_m.is_finite() || params.ipd_m < 0.0 {
        return invalid("ipd_m", "must be finite and >= 0");
    }
    if !params.fov_deg.is_finite() || params.fov_deg <= 0.0 || params.fov_deg >= 180.0 {
        return invalid("fov_deg", "must be within (0, 180) degrees");
    }
    if params.eye_width == 0 || params.eye_height == 0 {
        return invalid("eye_width", "eye buffer dimensions must be > 0");
    }
    if !params.screen_distance_m.is_finite() || params.screen_distance_m <= 0.0 {
        return invalid("screen_distance_m", "must be finite and > 0");
    }
    if !params.screen_width_m.is_finite() || params.screen_width_m <= 0.0 {
        return invalid("screen_width_m", "must be finite and > 0");
    }
    if !params.left_lens.is_finite() || !params.right_lens.is_finite() {
        return invalid("lens", "coefficients must be finite");
    }
    Ok(())
}
