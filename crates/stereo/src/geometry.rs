//! Head rotation and eye ray geometry.
//!
//! Head frame: x right, y up, z forward (toward the virtual desktop).
//! Rotation order: R = R_yaw(y) · R_pitch(x) · R_roll(z).

use contracts::{EyeParameters, EyeSide, OrientationEstimate, RollMode};
use nalgebra::{Matrix3, Rotation3, Vector3};

/// Head rotation matrix for an orientation
pub fn head_rotation(orientation: &OrientationEstimate, roll_mode: RollMode) -> Matrix3<f64> {
    let roll = match roll_mode {
        RollMode::Apply => orientation.roll,
        RollMode::Ignore => 0.0,
    };
    let yaw = Rotation3::from_axis_angle(&Vector3::y_axis(), orientation.yaw);
    let pitch = Rotation3::from_axis_angle(&Vector3::x_axis(), orientation.pitch);
    let roll = Rotation3::from_axis_angle(&Vector3::z_axis(), roll);
    (yaw * pitch * roll).into_inner()
}

/// Focal length in pixels for a horizontal field of view
#[inline]
pub fn focal_length_px(width: u32, fov_deg: f64) -> f64 {
    (width as f64 / 2.0) / (fov_deg.to_radians() / 2.0).tan()
}

/// Eye position in the head frame, rotated with the head
pub fn eye_origin(rotation: &Matrix3<f64>, ipd_m: f64, side: EyeSide) -> Vector3<f64> {
    rotation * Vector3::new(side.lateral_sign() * ipd_m / 2.0, 0.0, 0.0)
}

/// Virtual desktop plane, centred on the forward axis
#[derive(Debug, Clone, Copy)]
pub struct DesktopPlane {
    pub distance: f64,
    pub half_width: f64,
    pub half_height: f64,
}

impl DesktopPlane {
    /// Plane sized by the configured width and the capture aspect ratio
    pub fn new(params: &EyeParameters, capture_width: u32, capture_height: u32) -> Self {
        let width = params.screen_width_m;
        let height = width * capture_height as f64 / capture_width as f64;
        Self {
            distance: params.screen_distance_m,
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }

    /// Normalised plane coordinate hit by a ray: (0,0) top-left, (1,1) bottom-right
    ///
    /// None if the ray points away from the plane or misses it.
    #[inline]
    pub fn intersect(&self, origin: &Vector3<f64>, dir: &Vector3<f64>) -> Option<(f64, f64)> {
        if dir.z <= 1e-9 {
            return None;
        }
        let t = (self.distance - origin.z) / dir.z;
        if t <= 0.0 {
            return None;
        }
        let x = origin.x + t * dir.x;
        let y = origin.y + t * dir.y;
        if x.abs() > self.half_width || y.abs() > self.half_height {
            return None;
        }
        let u = (x + self.half_width) / (2.0 * self.half_width);
        let v = (self.half_height - y) / (2.0 * self.half_height);
        Some((u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_rotation() {
        let r = head_rotation(&OrientationEstimate::default(), RollMode::Apply);
        assert!((r - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_yaw_turns_forward_to_the_side() {
        let orientation = OrientationEstimate {
            yaw: FRAC_PI_2,
            ..Default::default()
        };
        let r = head_rotation(&orientation, RollMode::Apply);
        let forward = r * Vector3::new(0.0, 0.0, 1.0);
        assert!((forward - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_roll_ignored() {
        let orientation = OrientationEstimate {
            roll: 0.7,
            ..Default::default()
        };
        let r = head_rotation(&orientation, RollMode::Ignore);
        assert!((r - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_focal_length_90_degrees() {
        assert!((focal_length_px(1080, 90.0) - 540.0).abs() < 1e-9);
    }

    #[test]
    fn test_plane_centre_hit() {
        let params = EyeParameters::default();
        let plane = DesktopPlane::new(&params, 1920, 1080);
        let (u, v) = plane
            .intersect(&Vector3::zeros(), &Vector3::new(0.0, 0.0, 1.0))
            .unwrap();
        assert!((u - 0.5).abs() < 1e-12 && (v - 0.5).abs() < 1e-12);
        assert!(plane
            .intersect(&Vector3::zeros(), &Vector3::new(0.0, 0.0, -1.0))
            .is_none());
        assert!(plane
            .intersect(&Vector3::zeros(), &Vector3::new(10.0, 0.0, 1.0))
            .is_none());
    }
}
