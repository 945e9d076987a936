//! Rigid body state types.
//!
//! This module provides types for representing body state in the plane:
//! position, heading, linear velocity, and angular velocity.

use nalgebra::{Point2, Rotation2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::angle::normalize_angle;

/// Unique identifier for a rigid body in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for BodyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Position and heading of a body in the plane.
///
/// The heading is stored unwrapped; use [`Pose2::heading`] to read it
/// normalized to `(-pi, pi]`.
///
/// # Example
///
/// ```
/// use nalgebra::Point2;
/// use swarm_types::Pose2;
///
/// let pose = Pose2::new(Point2::new(1.0, 2.0), std::f64::consts::FRAC_PI_2);
/// let forward = pose.forward();
/// assert!(forward.x.abs() < 1e-12);
/// assert!((forward.y - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose2 {
    /// Position in world coordinates.
    pub position: Point2<f64>,
    /// Heading angle in radians (unwrapped).
    pub angle: f64,
}

impl Default for Pose2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose2 {
    /// Create an identity pose (origin, zero heading).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point2::origin(),
            angle: 0.0,
        }
    }

    /// Create a pose from position and heading.
    #[must_use]
    pub const fn new(position: Point2<f64>, angle: f64) -> Self {
        Self { position, angle }
    }

    /// Create a pose from position only (zero heading).
    #[must_use]
    pub const fn from_position(position: Point2<f64>) -> Self {
        Self {
            position,
            angle: 0.0,
        }
    }

    /// Get the heading normalized to `(-pi, pi]`.
    #[must_use]
    pub fn heading(&self) -> f64 {
        normalize_angle(self.angle)
    }

    /// Get the forward direction (unit vector along the heading).
    #[must_use]
    pub fn forward(&self) -> Vector2<f64> {
        Vector2::new(self.angle.cos(), self.angle.sin())
    }

    /// Transform a point from local to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point2<f64>) -> Point2<f64> {
        self.position + Rotation2::new(self.angle) * local.coords
    }

    /// Transform a vector from local to world coordinates (rotation only).
    #[must_use]
    pub fn transform_vector(&self, local: &Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(self.angle) * local
    }

    /// Transform a point from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_point(&self, world: &Point2<f64>) -> Point2<f64> {
        Point2::from(Rotation2::new(-self.angle) * (world - self.position))
    }

    /// Check if the pose contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|x| x.is_finite()) && self.angle.is_finite()
    }
}

/// Linear and angular velocity of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Twist2 {
    /// Linear velocity in world coordinates (cm/s).
    pub linear: Vector2<f64>,
    /// Angular velocity (rad/s), counter-clockwise positive.
    pub angular: f64,
}

impl Default for Twist2 {
    fn default() -> Self {
        Self::zero()
    }
}

impl Twist2 {
    /// Create a twist with specified linear and angular velocity.
    #[must_use]
    pub const fn new(linear: Vector2<f64>, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// Create a zero twist (at rest).
    #[must_use]
    pub fn zero() -> Self {
        Self {
            linear: Vector2::zeros(),
            angular: 0.0,
        }
    }

    /// Create a twist with linear velocity only.
    #[must_use]
    pub fn linear(v: Vector2<f64>) -> Self {
        Self {
            linear: v,
            angular: 0.0,
        }
    }

    /// Create a twist with angular velocity only.
    #[must_use]
    pub fn angular(omega: f64) -> Self {
        Self {
            linear: Vector2::zeros(),
            angular: omega,
        }
    }

    /// Get the linear speed (magnitude of linear velocity).
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.linear.norm()
    }

    /// Check if the twist contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.linear.iter().all(|x| x.is_finite()) && self.angular.is_finite()
    }
}

/// Complete kinematic state of a body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyState2 {
    /// Position and heading.
    pub pose: Pose2,
    /// Linear and angular velocity.
    pub twist: Twist2,
}

impl BodyState2 {
    /// Create a state from pose and twist.
    #[must_use]
    pub const fn new(pose: Pose2, twist: Twist2) -> Self {
        Self { pose, twist }
    }

    /// Create a state at rest at the given pose.
    #[must_use]
    pub fn at_rest(pose: Pose2) -> Self {
        Self {
            pose,
            twist: Twist2::zero(),
        }
    }

    /// Check if the state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.twist.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_body_id() {
        let id = BodyId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "Body(42)");

        let id2: BodyId = 42.into();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_pose_transform_round_trip() {
        let pose = Pose2::new(Point2::new(3.0, -1.0), 0.8);
        let local = Point2::new(2.0, 5.0);
        let world = pose.transform_point(&local);
        let back = pose.inverse_transform_point(&world);
        assert_relative_eq!(back.coords, local.coords, epsilon = 1e-12);
    }

    #[test]
    fn test_pose_rotation() {
        let pose = Pose2::new(Point2::origin(), FRAC_PI_2);
        let world = pose.transform_vector(&Vector2::x());
        assert_relative_eq!(world.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(world.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_heading_normalized() {
        let pose = Pose2::new(Point2::origin(), 3.0 * PI);
        assert_relative_eq!(pose.heading(), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_twist() {
        let twist = Twist2::linear(Vector2::new(3.0, 4.0));
        assert_relative_eq!(twist.speed(), 5.0, epsilon = 1e-12);
        assert!(twist.is_finite());

        let spin = Twist2::angular(1.5);
        assert_relative_eq!(spin.speed(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(spin.angular, 1.5, epsilon = 1e-12);
    }
}
