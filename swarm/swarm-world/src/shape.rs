//! Collision shapes and distance queries.

use nalgebra::{Point2, Vector2};
use swarm_types::Pose2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Collision shape of a body, expressed in the body's local frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape2 {
    /// Circle centered on the body origin.
    Circle {
        /// Circle radius.
        radius: f64,
    },
    /// Sphere-swept line segment between two local endpoints.
    ///
    /// Used for arena boundary walls.
    Segment {
        /// First endpoint in local coordinates.
        a: Point2<f64>,
        /// Second endpoint in local coordinates.
        b: Point2<f64>,
        /// Sweep radius (wall thickness).
        radius: f64,
    },
    /// Rectangle centered on the body origin, oriented by the body heading.
    Rect {
        /// Half-extents along the local axes.
        half_extents: Vector2<f64>,
    },
}

impl Shape2 {
    /// Create a circle shape.
    #[must_use]
    pub fn circle(radius: f64) -> Self {
        Self::Circle { radius }
    }

    /// Create a sphere-swept segment shape.
    #[must_use]
    pub fn segment(a: Point2<f64>, b: Point2<f64>, radius: f64) -> Self {
        Self::Segment { a, b, radius }
    }

    /// Create a rectangle shape from half-extents.
    #[must_use]
    pub fn rect(half_extents: Vector2<f64>) -> Self {
        Self::Rect { half_extents }
    }

    /// Create a square rectangle shape with the given side length.
    #[must_use]
    pub fn square(side: f64) -> Self {
        Self::Rect {
            half_extents: Vector2::new(side / 2.0, side / 2.0),
        }
    }

    /// Radius of the smallest circle around the body origin containing the
    /// shape.
    #[must_use]
    pub fn circumradius(&self) -> f64 {
        match self {
            Self::Circle { radius } => *radius,
            Self::Segment { a, b, radius } => a.coords.norm().max(b.coords.norm()) + radius,
            Self::Rect { half_extents } => half_extents.norm(),
        }
    }

    /// Signed distance from a world-space point to the shape surface.
    ///
    /// Negative inside the shape.
    #[must_use]
    pub fn distance_to_point(&self, pose: &Pose2, point: &Point2<f64>) -> f64 {
        match self {
            Self::Circle { radius } => (point - pose.position).norm() - radius,
            Self::Segment { a, b, radius } => {
                let wa = pose.transform_point(a);
                let wb = pose.transform_point(b);
                point_segment_distance(point, &wa, &wb) - radius
            }
            Self::Rect { half_extents } => {
                let local = pose.inverse_transform_point(point);
                let dx = local.x.abs() - half_extents.x;
                let dy = local.y.abs() - half_extents.y;
                if dx <= 0.0 && dy <= 0.0 {
                    dx.max(dy)
                } else {
                    Vector2::new(dx.max(0.0), dy.max(0.0)).norm()
                }
            }
        }
    }

    /// Check whether a world-space point lies inside the shape.
    #[must_use]
    pub fn contains_point(&self, pose: &Pose2, point: &Point2<f64>) -> bool {
        self.distance_to_point(pose, point) < 0.0
    }
}

/// Distance from a point to a line segment.
#[must_use]
pub(crate) fn point_segment_distance(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (p - closest_point_on_segment(p, a, b)).norm()
}

/// Closest point to `p` on the segment `a..b`.
#[must_use]
pub(crate) fn closest_point_on_segment(
    p: &Point2<f64>,
    a: &Point2<f64>,
    b: &Point2<f64>,
) -> Point2<f64> {
    let e = b - a;
    let len_sq = e.norm_squared();
    if len_sq < 1e-12 {
        return *a;
    }
    let t = ((p - a).dot(&e) / len_sq).clamp(0.0, 1.0);
    a + e * t
}
