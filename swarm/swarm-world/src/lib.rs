//! Minimal 2-D physics world for the swarm foraging simulation.
//!
//! This crate is the physics collaborator consumed by the formation
//! controller. It owns rigid bodies and shapes and provides:
//!
//! - [`World2`] - body arena with fixed-timestep kinematic stepping
//! - [`Shape2`] - circle, sphere-swept segment, and oriented rectangle
//! - Ray casting for range sensing ([`World2::raycast`])
//! - Point-distance queries for goal-region tests
//!   ([`World2::distance_to_surface`])
//!
//! It is deliberately **not** a dynamics engine: bodies integrate their
//! commanded velocities and a positional separation pass keeps them from
//! interpenetrating (robots push the target box, walls contain everything).
//! Forces, restitution, and friction-driven dynamics are out of scope; the
//! controllers command velocities directly.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod raycast;
mod shape;
mod world;

pub use raycast::RayHit2;
pub use shape::Shape2;
pub use world::{Body2, World2};

pub use swarm_types::{BodyId, BodyState2, Pose2, Result, SimConfig, SwarmError, Twist2};
