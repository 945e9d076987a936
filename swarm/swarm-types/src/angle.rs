//! Angle reduction helpers.
//!
//! Headings accumulate without bound while a formation maneuvers; these
//! helpers reduce them at read boundaries and compute shortest turns.

use std::f64::consts::{PI, TAU};

/// Normalize an angle to `(-pi, pi]`.
///
/// Idempotent: normalizing twice yields the same value as normalizing once.
///
/// # Example
///
/// ```
/// use std::f64::consts::PI;
/// use swarm_types::angle::normalize_angle;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-12);
/// assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Wrap an angle to `[0, 2*pi)`.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    angle.rem_euclid(TAU)
}

/// Signed shortest angular distance from `from` to `to`, in `(-pi, pi]`.
///
/// The sign is the optimal turn direction: positive for counter-clockwise.
#[must_use]
pub fn shortest_turn(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}
