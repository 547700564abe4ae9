//! Angle helpers

use std::f64::consts::{PI, TAU};

/// Normalize an angle to (-π, π]
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Interpolate along the shortest arc from `from` to `to`
#[inline]
pub fn lerp_angle(from: f64, to: f64, t: f64) -> f64 {
    wrap_angle(from + t * wrap_angle(to - from))
}

/// Roll and pitch implied by a gravity measurement
///
/// Returns `(roll, pitch)`; gravity along +z is level.
#[inline]
pub fn tilt_from_gravity(ax: f64, ay: f64, az: f64) -> (f64, f64) {
    let roll = ay.atan2(az);
    let pitch = (-ax).atan2((ay * ay + az * az).sqrt());
    (roll, pitch)
}
