//! Ray casting against collision shapes.
//!
//! Analytic nearest-intersection queries used by the range sensors:
//! quadratic solve for circles, line-line solve for segments, and a slab
//! test in the body frame for oriented rectangles.

use nalgebra::{Point2, Vector2};
use swarm_types::{BodyId, Pose2};

use crate::Shape2;

/// Result of a ray cast against the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit2 {
    /// Distance from ray origin to hit point.
    pub distance: f64,
    /// Hit point in world coordinates.
    pub point: Point2<f64>,
    /// The body that was hit.
    pub body: BodyId,
}

/// Cast a ray against a single shape.
///
/// `direction` must be a unit vector. Returns the hit distance, or `None`
/// if the ray misses within `max_distance`.
#[must_use]
pub(crate) fn raycast_shape(
    shape: &Shape2,
    pose: &Pose2,
    origin: &Point2<f64>,
    direction: &Vector2<f64>,
    max_distance: f64,
) -> Option<f64> {
    match shape {
        Shape2::Circle { radius } => {
            raycast_circle(&pose.position, *radius, origin, direction, max_distance)
        }
        Shape2::Segment { a, b, .. } => {
            let wa = pose.transform_point(a);
            let wb = pose.transform_point(b);
            raycast_segment(&wa, &wb, origin, direction, max_distance)
        }
        Shape2::Rect { half_extents } => {
            raycast_rect(pose, half_extents, origin, direction, max_distance)
        }
    }
}

fn raycast_circle(
    center: &Point2<f64>,
    radius: f64,
    origin: &Point2<f64>,
    direction: &Vector2<f64>,
    max_distance: f64,
) -> Option<f64> {
    let m = origin - center;
    let b = m.dot(direction);
    let c = m.norm_squared() - radius * radius;
    // Outside the circle and pointing away
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()).max(0.0);
    (t <= max_distance).then_some(t)
}

fn raycast_segment(
    a: &Point2<f64>,
    b: &Point2<f64>,
    origin: &Point2<f64>,
    direction: &Vector2<f64>,
    max_distance: f64,
) -> Option<f64> {
    let e = b - a;
    let denom = direction.perp(&e);
    if denom.abs() < 1e-12 {
        return None;
    }
    let ao = a - origin;
    let t = ao.perp(&e) / denom;
    let s = -direction.perp(&ao) / denom;
    (t >= 0.0 && t <= max_distance && (0.0..=1.0).contains(&s)).then_some(t)
}

fn raycast_rect(
    pose: &Pose2,
    half_extents: &Vector2<f64>,
    origin: &Point2<f64>,
    direction: &Vector2<f64>,
    max_distance: f64,
) -> Option<f64> {
    // Slab test in the rectangle's local frame
    let local_origin = pose.inverse_transform_point(origin);
    let local_dir = nalgebra::Rotation2::new(-pose.angle) * direction;

    let mut t_min = 0.0_f64;
    let mut t_max = max_distance;
    for axis in 0..2 {
        let o = local_origin[axis];
        let d = local_dir[axis];
        let h = half_extents[axis];
        if d.abs() < 1e-12 {
            if o.abs() > h {
                return None;
            }
        } else {
            let mut t1 = (-h - o) / d;
            let mut t2 = (h - o) / d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    Some(t_min)
}
