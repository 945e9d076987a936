//! Environment configuration.

use nalgebra::Point2;
use swarm_control::FormationConfig;
use swarm_types::{Result, SimConfig, SwarmError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a foraging episode.
///
/// The target and goal positions are randomized inside fixed arena regions
/// on every reset unless pinned through the placement overrides, which
/// tests and scripted scenarios use for determinism.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvConfig {
    /// Arena width and height (cm).
    pub arena: (f64, f64),
    /// Sweep radius of the boundary walls (cm).
    pub wall_radius: f64,
    /// Formation-to-target distance below which the task switches to
    /// returning the object (cm).
    pub near_threshold: f64,
    /// Minimum distance change that counts as progress for the reward (cm).
    pub min_dist_change: f64,
    /// Radius of the goal region (cm); the episode is done when the target
    /// center is closer than this to the goal center.
    pub goal_radius: f64,
    /// Side length of the square target object (cm).
    pub target_side: f64,
    /// Mass of the target object (kg).
    pub target_mass: f64,
    /// Friction of the target object.
    pub target_friction: f64,
    /// Steps after which the episode is truncated.
    pub max_steps: u32,
    /// Formation heading at reset (radians).
    pub start_angle: f64,
    /// Pin the formation start position (defaults to the goal position).
    pub start_pos: Option<Point2<f64>>,
    /// Pin the target placement instead of randomizing it.
    pub target_pos: Option<Point2<f64>>,
    /// Pin the goal placement instead of randomizing it.
    pub goal_pos: Option<Point2<f64>>,
    /// Formation controller settings.
    pub formation: FormationConfig,
    /// Simulation timing settings.
    pub sim: SimConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            arena: (500.0, 500.0),
            wall_radius: 1.0,
            near_threshold: 20.0,
            min_dist_change: 1e-4,
            goal_radius: 25.0,
            target_side: 20.0,
            target_mass: 1.0,
            target_friction: 1.0,
            max_steps: 700,
            start_angle: -std::f64::consts::FRAC_PI_2,
            start_pos: None,
            target_pos: None,
            goal_pos: None,
            formation: FormationConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

impl EnvConfig {
    /// Pin the scenario geometry (start, target, goal) for deterministic
    /// episodes.
    #[must_use]
    pub fn with_scenario(
        mut self,
        start_pos: Point2<f64>,
        start_angle: f64,
        target_pos: Point2<f64>,
        goal_pos: Point2<f64>,
    ) -> Self {
        self.start_pos = Some(start_pos);
        self.start_angle = start_angle;
        self.target_pos = Some(target_pos);
        self.goal_pos = Some(goal_pos);
        self
    }

    /// Set the episode step limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.arena.0 <= 0.0 || self.arena.1 <= 0.0 {
            return Err(SwarmError::invalid_config("arena must have positive size"));
        }
        if self.goal_radius <= 0.0 {
            return Err(SwarmError::invalid_config("goal radius must be positive"));
        }
        if self.near_threshold <= 0.0 {
            return Err(SwarmError::invalid_config(
                "near threshold must be positive",
            ));
        }
        if self.target_side <= 0.0 {
            return Err(SwarmError::invalid_config("target side must be positive"));
        }
        self.sim.validate()?;
        self.formation.validate()
    }
}
