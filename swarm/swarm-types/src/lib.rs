//! Core types for the swarm foraging simulation.
//!
//! This crate provides the foundational types shared by the world, control,
//! and environment crates:
//!
//! - [`Pose2`] - Position and heading of a body in the 2-D arena
//! - [`Twist2`] - Linear and angular velocity
//! - [`BodyId`] - Opaque handle into the world's body arena
//! - [`SimConfig`] - Fixed-timestep settings
//! - [`SwarmError`] - Shared error taxonomy
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no physics and no control logic.
//! They're the common language between:
//!
//! - The physics collaborator (`swarm-world`)
//! - The formation controller and robot primitives (`swarm-control`)
//! - The episode harness (`swarm-env`)
//!
//! # Coordinate System
//!
//! - X: right, Y: up, right-handed
//! - Angles in radians, counter-clockwise positive
//! - Headings are unwrapped internally and normalized to `(-pi, pi]` at read
//!   boundaries via [`angle::normalize_angle`]
//! - Distances in centimeters (the arena is a few hundred centimeters across)

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

pub mod angle;
mod body;
mod config;
mod error;

pub use body::{BodyId, BodyState2, Pose2, Twist2};
pub use config::SimConfig;
pub use error::SwarmError;

// Re-export math types for convenience
pub use nalgebra::{Point2, Rotation2, Vector2};

/// Result type for swarm operations.
pub type Result<T> = std::result::Result<T, SwarmError>;
