//! Simulation world container and queries.
//!
//! The [`World2`] is the central data structure for simulation state. It
//! manages rigid bodies, advances them by a fixed timestep, keeps them
//! separated, and answers the geometric queries the controllers need.

use hashbrown::HashMap;
use nalgebra::{Point2, Vector2};
use tracing::debug;

use swarm_types::{BodyId, BodyState2, Pose2, Result, SimConfig, SwarmError, Twist2};

use crate::raycast::raycast_shape;
use crate::shape::closest_point_on_segment;
use crate::{RayHit2, Shape2};

/// A rigid body in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Body2 {
    /// Kinematic state (pose and velocity).
    pub state: BodyState2,
    /// Collision shape in the body frame.
    pub shape: Shape2,
    /// Mass in kg (informational for static bodies).
    pub mass: f64,
    /// Surface friction coefficient.
    pub friction: f64,
    /// Static bodies never move and are never pushed.
    pub is_static: bool,
}

impl Body2 {
    /// Current pose of the body.
    #[must_use]
    pub fn pose(&self) -> Pose2 {
        self.state.pose
    }

    /// Current position of the body.
    #[must_use]
    pub fn position(&self) -> Point2<f64> {
        self.state.pose.position
    }
}

/// The simulation world: a body arena with fixed-timestep stepping.
///
/// # Example
///
/// ```
/// use nalgebra::{Point2, Vector2};
/// use swarm_world::{Shape2, World2};
/// use swarm_types::{Pose2, SimConfig};
///
/// let mut world = World2::new(SimConfig::default());
/// let id = world.add_body(Pose2::identity(), Shape2::circle(10.0), 0.65, 1.0);
/// world.set_velocity(id, Vector2::new(60.0, 0.0)).unwrap();
/// world.step();
/// let pose = world.pose(id).unwrap();
/// assert!((pose.position.x - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct World2 {
    bodies: HashMap<BodyId, Body2>,
    config: SimConfig,
    time: f64,
    next_id: u64,
}

impl World2 {
    /// Create an empty world.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            bodies: HashMap::new(),
            config,
            time: 0.0,
            next_id: 0,
        }
    }

    /// Fixed timestep in seconds.
    #[must_use]
    pub fn timestep(&self) -> f64 {
        self.config.timestep
    }

    /// Simulated time elapsed since construction or the last [`clear`].
    ///
    /// [`clear`]: World2::clear
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of bodies in the world.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Add a dynamic body and return its handle.
    pub fn add_body(&mut self, pose: Pose2, shape: Shape2, mass: f64, friction: f64) -> BodyId {
        self.insert_body(pose, shape, mass, friction, false)
    }

    /// Add a static body (never moves, never pushed) and return its handle.
    pub fn add_static_body(&mut self, pose: Pose2, shape: Shape2) -> BodyId {
        self.insert_body(pose, shape, f64::INFINITY, 1.0, true)
    }

    fn insert_body(
        &mut self,
        pose: Pose2,
        shape: Shape2,
        mass: f64,
        friction: f64,
        is_static: bool,
    ) -> BodyId {
        let id = BodyId::new(self.next_id);
        self.next_id += 1;
        debug!(body = %id, ?shape, is_static, "adding body");
        self.bodies.insert(
            id,
            Body2 {
                state: BodyState2::at_rest(pose),
                shape,
                mass,
                friction,
                is_static,
            },
        );
        id
    }

    /// Remove a body from the world.
    pub fn remove_body(&mut self, id: BodyId) -> Result<()> {
        self.bodies
            .remove(&id)
            .map(|_| ())
            .ok_or(SwarmError::BodyNotFound(id))
    }

    /// Remove every body and reset simulated time.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.time = 0.0;
    }

    /// Get a body by handle.
    pub fn body(&self, id: BodyId) -> Result<&Body2> {
        self.bodies.get(&id).ok_or(SwarmError::BodyNotFound(id))
    }

    /// Get a mutable body by handle.
    pub fn body_mut(&mut self, id: BodyId) -> Result<&mut Body2> {
        self.bodies.get_mut(&id).ok_or(SwarmError::BodyNotFound(id))
    }

    /// Current pose of a body.
    pub fn pose(&self, id: BodyId) -> Result<Pose2> {
        Ok(self.body(id)?.state.pose)
    }

    /// Current velocity of a body.
    pub fn twist(&self, id: BodyId) -> Result<Twist2> {
        Ok(self.body(id)?.state.twist)
    }

    /// Set the linear velocity of a body.
    pub fn set_velocity(&mut self, id: BodyId, linear: Vector2<f64>) -> Result<()> {
        self.body_mut(id)?.state.twist.linear = linear;
        Ok(())
    }

    /// Set the angular velocity of a body.
    pub fn set_angular_velocity(&mut self, id: BodyId, angular: f64) -> Result<()> {
        self.body_mut(id)?.state.twist.angular = angular;
        Ok(())
    }

    /// Set the heading of a body directly.
    pub fn set_angle(&mut self, id: BodyId, angle: f64) -> Result<()> {
        self.body_mut(id)?.state.pose.angle = angle;
        Ok(())
    }

    /// Set the full pose of a body directly.
    pub fn set_pose(&mut self, id: BodyId, pose: Pose2) -> Result<()> {
        self.body_mut(id)?.state.pose = pose;
        Ok(())
    }

    /// Advance the world by one fixed timestep.
    ///
    /// Integrates commanded velocities for every dynamic body, then runs one
    /// positional separation pass so overlapping bodies are pushed apart.
    pub fn step(&mut self) {
        let dt = self.config.timestep;
        for body in self.bodies.values_mut() {
            if body.is_static {
                continue;
            }
            body.state.pose.position += body.state.twist.linear * dt;
            body.state.pose.angle += body.state.twist.angular * dt;
        }
        self.separate_overlaps();
        self.time += dt;
    }

    /// Cast a ray and return the nearest hit, if any.
    ///
    /// `direction` must be a unit vector. `exclude` skips the sensing body so
    /// a robot never detects its own hull.
    #[must_use]
    pub fn raycast(
        &self,
        origin: Point2<f64>,
        direction: Vector2<f64>,
        max_range: f64,
        exclude: Option<BodyId>,
    ) -> Option<RayHit2> {
        let mut nearest: Option<RayHit2> = None;
        for id in self.sorted_ids() {
            if exclude == Some(id) {
                continue;
            }
            let Some(body) = self.bodies.get(&id) else {
                continue;
            };
            let Some(distance) =
                raycast_shape(&body.shape, &body.state.pose, &origin, &direction, max_range)
            else {
                continue;
            };
            if nearest.is_none_or(|hit| distance < hit.distance) {
                nearest = Some(RayHit2 {
                    distance,
                    point: origin + direction * distance,
                    body: id,
                });
            }
        }
        nearest
    }

    /// Signed distance from a world-space point to a body's surface.
    ///
    /// Negative when the point is inside the shape; used for goal-region
    /// membership tests.
    pub fn distance_to_surface(&self, id: BodyId, point: &Point2<f64>) -> Result<f64> {
        let body = self.body(id)?;
        Ok(body.shape.distance_to_point(&body.state.pose, point))
    }

    /// Body ids in creation order, for deterministic iteration.
    fn sorted_ids(&self) -> Vec<BodyId> {
        let mut ids: Vec<BodyId> = self.bodies.keys().copied().collect();
        ids.sort_by_key(|id| id.raw());
        ids
    }

    /// One positional separation pass over every body pair.
    ///
    /// Robots (dynamic circles) push the target (dynamic rect) out of
    /// penetration; static segments (arena walls) push dynamic bodies back
    /// inside; overlapping robots split the correction evenly.
    fn separate_overlaps(&mut self) {
        let ids = self.sorted_ids();
        for (i, &id_a) in ids.iter().enumerate() {
            for &id_b in &ids[i + 1..] {
                let (Some(a), Some(b)) = (self.bodies.get(&id_a), self.bodies.get(&id_b)) else {
                    continue;
                };
                if a.is_static && b.is_static {
                    continue;
                }
                let Some((push_a, push_b)) = Self::separation(a, b) else {
                    continue;
                };
                if let Some(body) = self.bodies.get_mut(&id_a) {
                    body.state.pose.position += push_a;
                }
                if let Some(body) = self.bodies.get_mut(&id_b) {
                    body.state.pose.position += push_b;
                }
            }
        }
    }

    /// Positional corrections separating two overlapping bodies, or `None`
    /// when the pair is clear (or unhandled).
    fn separation(a: &Body2, b: &Body2) -> Option<(Vector2<f64>, Vector2<f64>)> {
        let (pen, normal) = Self::penetration(a, b)?;
        if pen <= 0.0 {
            return None;
        }
        let correction = normal * pen;
        match (a.is_static, b.is_static) {
            (true, false) => Some((Vector2::zeros(), correction)),
            (false, true) => Some((-correction, Vector2::zeros())),
            (false, false) => match (&a.shape, &b.shape) {
                // The robot is the actuator; the pushed box yields fully
                (Shape2::Circle { .. }, Shape2::Rect { .. }) => {
                    Some((Vector2::zeros(), correction))
                }
                (Shape2::Rect { .. }, Shape2::Circle { .. }) => {
                    Some((-correction, Vector2::zeros()))
                }
                _ => Some((-correction / 2.0, correction / 2.0)),
            },
            (true, true) => None,
        }
    }

    /// Penetration depth and contact normal (pointing from `a` toward `b`)
    /// for an overlapping pair, or `None` when the combination is unhandled.
    fn penetration(a: &Body2, b: &Body2) -> Option<(f64, Vector2<f64>)> {
        match (&a.shape, &b.shape) {
            (Shape2::Circle { radius: ra }, Shape2::Circle { radius: rb }) => {
                let delta = b.position() - a.position();
                let dist = delta.norm();
                let pen = ra + rb - dist;
                let normal = if dist > 1e-9 {
                    delta / dist
                } else {
                    Vector2::x()
                };
                Some((pen, normal))
            }
            (Shape2::Circle { radius }, Shape2::Rect { .. }) => {
                let dist = b.shape.distance_to_point(&b.state.pose, &a.position());
                let pen = radius - dist;
                if pen <= 0.0 {
                    return None;
                }
                // Push the rect along the line from the circle center to its
                // own center; robust even when the center is inside the rect
                let delta = b.position() - a.position();
                let dist_c = delta.norm();
                let normal = if dist_c > 1e-9 {
                    delta / dist_c
                } else {
                    Vector2::x()
                };
                Some((pen, normal))
            }
            (Shape2::Rect { .. }, Shape2::Circle { .. }) => {
                Self::penetration(b, a).map(|(pen, n)| (pen, -n))
            }
            (Shape2::Segment { a: sa, b: sb, radius }, _) => {
                let wa = a.state.pose.transform_point(sa);
                let wb = a.state.pose.transform_point(sb);
                let center = b.position();
                let closest = closest_point_on_segment(&center, &wa, &wb);
                let delta = center - closest;
                let dist = delta.norm();
                let pen = b.shape.circumradius() + radius - dist;
                let normal = if dist > 1e-9 {
                    delta / dist
                } else {
                    Vector2::x()
                };
                Some((pen, normal))
            }
            (_, Shape2::Segment { .. }) => Self::penetration(b, a).map(|(pen, n)| (pen, -n)),
            (Shape2::Rect { .. }, Shape2::Rect { .. }) => None,
        }
    }
}
