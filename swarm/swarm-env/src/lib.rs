//! Episode harness for the swarm foraging simulation.
//!
//! A [`ForagingEnv`] wires the physics world, the target object, and the
//! [`FormationController`] into a reinforcement-learning-style episode
//! interface:
//!
//! - [`ForagingEnv::reset`] tears the world down wholesale and rebuilds it,
//!   returning the initial state vector
//! - [`ForagingEnv::step`] executes one discrete maneuver to completion and
//!   returns the new state vector, a scalar reward, and the done flag
//!
//! The state vector is `[dist(formation, target), angle(formation -> target)
//! relative to the formation heading, dist(target, goal), angle(target ->
//! goal) relative to the target heading, formation heading]`, with all
//! angles normalized to `(-pi, pi]`.
//!
//! [`FormationController`]: swarm_control::FormationController

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod config;
mod env;

pub use config::EnvConfig;
pub use env::{ForagingEnv, StepInfo, StepOutcome};

pub use swarm_control::{Maneuver, Task};
pub use swarm_types::{Result, SwarmError};
