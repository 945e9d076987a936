//! The foraging episode environment.

use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use swarm_control::{FormationController, Maneuver, Task};
use swarm_types::angle::normalize_angle;
use swarm_types::{BodyId, Pose2, Result};
use swarm_world::{Shape2, World2};

use crate::EnvConfig;

/// Everything one environment step returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// The observed state vector.
    pub state: [f64; 5],
    /// Scalar reward for the step.
    pub reward: f64,
    /// Whether the target reached the goal region.
    pub done: bool,
    /// Auxiliary step information.
    pub info: StepInfo,
}

/// Auxiliary information attached to a step outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepInfo {
    /// The task that governed this step's reward.
    pub task: Task,
    /// Steps taken since the last reset.
    pub steps: u32,
    /// Whether the episode hit the step limit.
    pub truncated: bool,
}

/// The foraging environment: world, target object, goal region, and the
/// robot formation, behind a `reset`/`step` episode interface.
///
/// # Example
///
/// ```
/// use swarm_env::{EnvConfig, ForagingEnv};
///
/// let mut env = ForagingEnv::with_seed(EnvConfig::default(), 7).unwrap();
/// let state = env.reset().unwrap();
/// assert_eq!(state.len(), 5);
///
/// let outcome = env.step(0).unwrap();
/// assert!(!outcome.done);
/// ```
#[derive(Debug)]
pub struct ForagingEnv {
    config: EnvConfig,
    world: World2,
    rng: StdRng,
    controller: FormationController,
    target: BodyId,
    goal: Point2<f64>,
    steps: u32,
}

impl ForagingEnv {
    /// Number of discrete actions (translate, rotate).
    pub const ACTION_SPACE: usize = 2;
    /// Length of the state vector.
    pub const OBSERVATION_SPACE: usize = 5;

    /// Create an environment with entropy-seeded placement.
    pub fn new(config: EnvConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an environment with a fixed placement seed.
    pub fn with_seed(config: EnvConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Create an environment with the given random source.
    pub fn with_rng(config: EnvConfig, mut rng: StdRng) -> Result<Self> {
        config.validate()?;
        let mut world = World2::new(config.sim);
        let (controller, target, goal) = Self::populate(&config, &mut world, &mut rng)?;
        Ok(Self {
            config,
            world,
            rng,
            controller,
            target,
            goal,
            steps: 0,
        })
    }

    /// The environment configuration.
    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// The formation controller (read access for inspection).
    #[must_use]
    pub fn controller(&self) -> &FormationController {
        &self.controller
    }

    /// The goal region center.
    #[must_use]
    pub fn goal(&self) -> Point2<f64> {
        self.goal
    }

    /// Tear the world down wholesale and rebuild the episode.
    ///
    /// Robots and the target are recreated from scratch; there is no
    /// partial robot replacement.
    pub fn reset(&mut self) -> Result<[f64; 5]> {
        info!("resetting episode");
        self.world.clear();
        let (controller, target, goal) =
            Self::populate(&self.config, &mut self.world, &mut self.rng)?;
        self.controller = controller;
        self.target = target;
        self.goal = goal;
        self.steps = 0;
        self.observe()
    }

    /// Execute one discrete action (0 = translate, 1 = rotate) to
    /// completion and observe the outcome.
    ///
    /// An unrecognized action value is rejected before anything moves.
    pub fn step(&mut self, action: u8) -> Result<StepOutcome> {
        let maneuver = Maneuver::from_index(action)?;

        let (prev_formation_dist, prev_target_dist) = self.distances()?;
        let task = if prev_formation_dist > self.config.near_threshold {
            Task::SeekObject
        } else {
            Task::ReturnToNest
        };
        self.controller.set_task(task);

        // Run the requested maneuver to completion; the controller's stall
        // guard bounds how long a rotation can stay in flight
        self.controller.run(&mut self.world, Some(maneuver))?;
        while !self.controller.state().is_idle() {
            self.controller.run(&mut self.world, None)?;
        }
        self.steps += 1;

        let (formation_dist, target_dist) = self.distances()?;
        let done = target_dist * target_dist < self.config.goal_radius * self.config.goal_radius;
        let reward = if done {
            100.0
        } else if self.any_robot_outside()? {
            -10.0
        } else {
            match task {
                Task::SeekObject => {
                    if prev_formation_dist - formation_dist > self.config.min_dist_change {
                        1.0
                    } else {
                        -1.0
                    }
                }
                Task::ReturnToNest => {
                    if prev_target_dist - target_dist > self.config.min_dist_change {
                        5.0
                    } else {
                        -3.0
                    }
                }
            }
        };
        debug!(?task, reward, done, steps = self.steps, "episode step");

        Ok(StepOutcome {
            state: self.observe()?,
            reward,
            done,
            info: StepInfo {
                task,
                steps: self.steps,
                truncated: self.steps >= self.config.max_steps,
            },
        })
    }

    /// The current state vector.
    pub fn observe(&self) -> Result<[f64; 5]> {
        let center = self.controller.center();
        let heading = self.controller.heading();
        let target_pose = self.world.pose(self.target)?;

        let to_target = target_pose.position - center;
        let formation_dist = to_target.norm();
        let formation_angle = normalize_angle(to_target.y.atan2(to_target.x) - heading);

        let to_goal = self.goal - target_pose.position;
        let target_dist = to_goal.norm();
        let target_angle = normalize_angle(to_goal.y.atan2(to_goal.x) - target_pose.angle);

        Ok([
            formation_dist,
            formation_angle,
            target_dist,
            target_angle,
            heading,
        ])
    }

    /// Formation-to-target and target-to-goal distances.
    fn distances(&self) -> Result<(f64, f64)> {
        let target_pos = self.world.pose(self.target)?.position;
        Ok((
            (target_pos - self.controller.center()).norm(),
            (self.goal - target_pos).norm(),
        ))
    }

    /// Whether any robot has left the arena bounds.
    fn any_robot_outside(&self) -> Result<bool> {
        let (w, h) = self.config.arena;
        for robot in self.controller.robots() {
            let pos = robot.position(&self.world)?;
            if pos.x < 0.0 || pos.x > w || pos.y < 0.0 || pos.y > h {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Build the arena, the target, and the formation into the world.
    fn populate(
        config: &EnvConfig,
        world: &mut World2,
        rng: &mut StdRng,
    ) -> Result<(FormationController, BodyId, Point2<f64>)> {
        let (w, h) = config.arena;
        let r = config.wall_radius;
        for (a, b) in [
            (Point2::new(0.0, 0.0), Point2::new(0.0, h)),
            (Point2::new(w, 0.0), Point2::new(w, h)),
            (Point2::new(0.0, 0.0), Point2::new(w, 0.0)),
            (Point2::new(0.0, h), Point2::new(w, h)),
        ] {
            world.add_static_body(Pose2::identity(), Shape2::segment(a, b, r));
        }

        // Goal in the lower-left region, target in the upper-right, unless
        // pinned by the scenario overrides
        let goal = config.goal_pos.unwrap_or_else(|| {
            Point2::new(
                rng.gen_range(w / 10.0..=w / 5.0 - w / 25.0),
                rng.gen_range(h - h / 5.0..=h - (h / 5.0 - h / 25.0)),
            )
        });
        let target_pos = config.target_pos.unwrap_or_else(|| {
            Point2::new(
                rng.gen_range(w - w / 5.0..=w - (w / 5.0 - w / 25.0)),
                rng.gen_range(h / 5.0 - h / 25.0..=h / 5.0 + h / 25.0),
            )
        });
        let target = world.add_body(
            Pose2::from_position(target_pos),
            Shape2::square(config.target_side),
            config.target_mass,
            config.target_friction,
        );

        let start = config.start_pos.unwrap_or(goal);
        let controller = FormationController::new(
            world,
            start,
            config.start_angle,
            goal,
            target,
            config.formation.clone(),
        )?;
        Ok((controller, target, goal))
    }
}
