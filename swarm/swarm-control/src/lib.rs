//! Formation control for a foraging robot swarm.
//!
//! This crate is the control core of the simulation. It coordinates a small
//! formation of mobile robots that locate a movable object, converge on it,
//! and transport it to a fixed goal region, reacting to obstacles sensed
//! through range measurements:
//!
//! - [`RangeSensor`] - fan of ranging beams anchored to a robot pose
//! - [`FuzzyVelocityController`] - stateless inference from sensed distances
//!   and goal geometry to velocity commands
//! - [`Robot`] - one body, one sensor, one fuzzy controller, and the
//!   low-level motion primitives that drive it
//! - [`FormationController`] - the maneuver state machine that translates or
//!   rotates the whole formation as a unit
//!
//! # Control Flow
//!
//! The environment harness requests one discrete [`Maneuver`] per control
//! tick through [`FormationController::run`]. The controller drives its
//! robots through a sequence of internal states, each state invoking robot
//! primitives, which in turn advance the physics world by exactly one fixed
//! timestep and refresh the sensors. When the maneuver completes, the state
//! returns to idle and the harness regains control.
//!
//! Execution is single-threaded and synchronous; "waiting" is modeled by
//! remaining in a non-idle state across successive `run` calls.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod formation;
mod fuzzy;
mod robot;
mod sensor;

pub use formation::{
    FormationConfig, FormationController, Maneuver, ManeuverState, Task,
};
pub use fuzzy::{FuzzyConfig, FuzzyVelocityController, VelocityCommand};
pub use robot::{Robot, RobotConfig};
pub use sensor::{RangeSensor, RangeSensorConfig, SectorReading};

pub use swarm_types::{Result, SwarmError};
