//! Formation maneuver coordination.
//!
//! A [`FormationController`] keeps a set of robots arranged in a U-shaped
//! arc around a logical formation center and executes one discrete maneuver
//! at a time - translating or rotating the whole formation - to completion.
//! Each call to [`FormationController::run`] is one control tick; a maneuver
//! spans several ticks and the controller stays in a non-idle state until it
//! finishes.

use nalgebra::Point2;
use tracing::{debug, info, warn};

use swarm_types::angle::{normalize_angle, shortest_turn, wrap_angle};
use swarm_types::{BodyId, Pose2, Result, SwarmError};
use swarm_world::World2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fuzzy::VelocityCommand;
use crate::robot::{Robot, RobotConfig};

/// A discrete maneuver the harness can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Maneuver {
    /// Translate the formation along its heading.
    Translate,
    /// Rotate the formation around its center.
    Rotate,
}

impl Maneuver {
    /// Decode a raw action value (0 = translate, 1 = rotate).
    pub fn from_index(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Translate),
            1 => Ok(Self::Rotate),
            _ => Err(SwarmError::UnknownAction { value }),
        }
    }

    /// The other maneuver kind.
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::Translate => Self::Rotate,
            Self::Rotate => Self::Translate,
        }
    }
}

/// The formation's current sub-goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Task {
    /// Approach the movable target object.
    #[default]
    SeekObject,
    /// Transport the object back to the goal region.
    ReturnToNest,
}

/// Maneuver state of the formation, with its per-state transient data.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ManeuverState {
    /// Ready to accept a maneuver request.
    #[default]
    Idle,
    /// Applying the averaged forward velocity to every robot.
    TranslateApply,
    /// Stopping every robot after a translation.
    TranslateStop,
    /// Robots are moving to their rotated slot positions.
    RotateMove {
        /// Target slot position per robot, in slot order.
        slots: Vec<Point2<f64>>,
    },
    /// Robots are aligning their headings to the new formation heading.
    RotateAlign {
        /// Optimal turn direction per robot (sign of the shortest turn).
        turn_dirs: Vec<f64>,
    },
}

impl ManeuverState {
    /// Whether the controller is ready to accept a maneuver request.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Configuration for the formation controller.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormationConfig {
    /// Number of robots in the formation.
    pub swarm_size: usize,
    /// Formation radius (cm): distance from the center to every robot.
    pub radius: f64,
    /// Angular gap left open in the formation circle (radians); the open
    /// side is the mouth of the U, centered on the heading.
    pub open_arc: f64,
    /// Scale factor from the averaged rotational velocity to the per-
    /// maneuver heading increment (applied per timestep).
    pub rotation_gain: f64,
    /// Consecutive identical maneuver requests tolerated before a request
    /// is inverted for one tick (anti-oscillation guard).
    pub repeat_limit: u32,
    /// Simulated seconds a rotation may run before stall recovery fires.
    pub stall_timeout: f64,
    /// Per-robot settings.
    pub robot: RobotConfig,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            swarm_size: 3,
            radius: 23.0,
            open_arc: std::f64::consts::PI,
            rotation_gain: 5.0,
            repeat_limit: 150,
            stall_timeout: 5.0,
            robot: RobotConfig::default(),
        }
    }
}

impl FormationConfig {
    /// Angular spacing between adjacent slots on the closed side of the
    /// formation circle.
    #[must_use]
    pub fn slot_spacing(&self) -> f64 {
        (std::f64::consts::TAU - self.open_arc) / (self.swarm_size - 1) as f64
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.swarm_size < 2 {
            return Err(SwarmError::invalid_config(
                "formation needs at least 2 robots",
            ));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(SwarmError::invalid_config(
                "formation radius must be positive",
            ));
        }
        if !(0.0..std::f64::consts::TAU).contains(&self.open_arc) {
            return Err(SwarmError::invalid_config(
                "open arc must be in [0, 2*pi)",
            ));
        }
        if self.stall_timeout <= 0.0 {
            return Err(SwarmError::invalid_config(
                "stall timeout must be positive",
            ));
        }
        self.robot.validate()
    }
}

/// The multi-robot formation maneuver coordinator.
///
/// Owns the robots, the formation geometry, and the maneuver state machine.
/// While idle, the formation center and heading are the authoritative pose
/// used to compute every robot's slot; during a maneuver they are updated
/// exactly once (in the translate-apply or the rotate-arrival step).
#[derive(Debug)]
pub struct FormationController {
    config: FormationConfig,
    robots: Vec<Robot>,
    center: Point2<f64>,
    /// Formation heading, unwrapped; normalized at read boundaries.
    heading: f64,
    goal: Point2<f64>,
    target: BodyId,
    task: Task,
    state: ManeuverState,
    /// Simulated time at which the current state was entered.
    state_entered: f64,
    /// Consecutive identical maneuver requests seen while idle.
    repeat_count: u32,
    last_request: Option<Maneuver>,
    /// Averaged velocity command captured on the last idle tick.
    command: VelocityCommand,
}

impl FormationController {
    /// Create a formation of robots arranged in a U shape around the start
    /// position, with the mouth of the U facing the start heading.
    pub fn new(
        world: &mut World2,
        start_pos: Point2<f64>,
        start_angle: f64,
        goal: Point2<f64>,
        target: BodyId,
        config: FormationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let beta = config.slot_spacing();
        let robots = (0..config.swarm_size)
            .map(|i| {
                let pos = slot_position(
                    start_pos,
                    config.radius,
                    start_angle + config.open_arc / 2.0 + i as f64 * beta,
                );
                Robot::spawn(
                    world,
                    i,
                    Pose2::new(pos, start_angle),
                    config.robot.clone(),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            robots,
            center: start_pos,
            heading: start_angle,
            goal,
            target,
            task: Task::default(),
            state: ManeuverState::Idle,
            state_entered: world.time(),
            repeat_count: 0,
            last_request: None,
            command: VelocityCommand::zero(),
        })
    }

    /// Current maneuver state.
    #[must_use]
    pub fn state(&self) -> &ManeuverState {
        &self.state
    }

    /// Formation center position.
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        self.center
    }

    /// Formation heading, normalized to `(-pi, pi]`.
    #[must_use]
    pub fn heading(&self) -> f64 {
        normalize_angle(self.heading)
    }

    /// Current task of the formation.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Switch the formation's task.
    pub fn set_task(&mut self, task: Task) {
        if self.task != task {
            info!(?task, "switching task");
        }
        self.task = task;
    }

    /// The robots, in slot order.
    #[must_use]
    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    /// The velocity command captured on the last idle tick.
    #[must_use]
    pub fn command(&self) -> VelocityCommand {
        self.command
    }

    /// The formation configuration.
    #[must_use]
    pub fn config(&self) -> &FormationConfig {
        &self.config
    }

    /// One control tick of the maneuver state machine.
    ///
    /// While idle, a given `action` starts a maneuver; further ticks with
    /// no action advance the maneuver in flight. Only one maneuver runs at
    /// a time: a request arriving mid-maneuver is ignored with a notice and
    /// nothing moves that tick.
    pub fn run(&mut self, world: &mut World2, action: Option<Maneuver>) -> Result<()> {
        if !self.state.is_idle() {
            if action.is_some() {
                info!(state = ?self.state, "formation is already running a maneuver");
                return Ok(());
            }
        } else if action.is_none() {
            return Ok(());
        }
        debug!(state = ?self.state, repeat = self.repeat_count, "formation tick");

        let state = std::mem::take(&mut self.state);
        self.state = match state {
            ManeuverState::Idle => {
                // Checked above: action is present here
                let Some(request) = action else {
                    return Ok(());
                };
                self.begin_maneuver(world, request)?
            }
            ManeuverState::TranslateApply => {
                let speed = self.command.translate;
                for robot in &mut self.robots {
                    robot.drive(world, speed)?;
                }
                // The formation center advances exactly once per maneuver:
                // every robot stepped the world once at this speed
                let travelled = speed * self.config.swarm_size as f64 * world.timestep();
                self.center +=
                    nalgebra::Vector2::new(self.heading.cos(), self.heading.sin()) * travelled;
                self.enter(world, ManeuverState::TranslateStop)
            }
            ManeuverState::TranslateStop => {
                for robot in &mut self.robots {
                    robot.stop(world)?;
                }
                ManeuverState::Idle
            }
            ManeuverState::RotateMove { slots } => self.advance_rotation(world, slots)?,
            ManeuverState::RotateAlign { turn_dirs } => {
                let aligned = wrap_angle(self.heading);
                debug!(?turn_dirs, heading = aligned, "aligning robot headings");
                for robot in &mut self.robots {
                    robot.set_heading(world, aligned)?;
                }
                ManeuverState::Idle
            }
        };
        Ok(())
    }

    /// Process a maneuver request on an idle tick.
    fn begin_maneuver(&mut self, world: &mut World2, request: Maneuver) -> Result<ManeuverState> {
        // Anti-oscillation guard: too many identical requests in a row
        // force the other maneuver kind for this tick
        let request = if self.repeat_count >= self.config.repeat_limit {
            let inverted = request.inverted();
            warn!(?request, ?inverted, "repeat limit hit, inverting request");
            inverted
        } else {
            request
        };

        if self.last_request == Some(request) {
            self.repeat_count += 1;
        } else {
            self.repeat_count = 0;
            self.last_request = Some(request);
        }

        self.command = self.average_velocities(world)?;
        debug!(
            vtras = self.command.translate,
            vrot = self.command.rotate,
            "averaged velocity command"
        );

        Ok(match request {
            Maneuver::Translate => self.enter(world, ManeuverState::TranslateApply),
            Maneuver::Rotate => {
                let slots = self.rotated_slots(world.timestep());
                for robot in &mut self.robots {
                    robot.stop(world)?;
                }
                self.enter(world, ManeuverState::RotateMove { slots })
            }
        })
    }

    /// One tick of the rotate-move sub-state.
    fn advance_rotation(
        &mut self,
        world: &mut World2,
        slots: Vec<Point2<f64>>,
    ) -> Result<ManeuverState> {
        // Stall recovery: a rotation that cannot complete in time is
        // abandoned and the formation snaps back into shape
        if world.time() - self.state_entered > self.config.stall_timeout {
            warn!(
                elapsed = world.time() - self.state_entered,
                "rotation stalled, recovering"
            );
            for robot in &mut self.robots {
                robot.set_heading(world, self.heading)?;
            }
            return Ok(ManeuverState::Idle);
        }

        let threshold = self.config.robot.arrive_threshold_sq;
        let mut arrived = 0;
        for (robot, slot) in self.robots.iter_mut().zip(&slots) {
            let dist_sq = (slot - robot.position(world)?).norm_squared();
            if dist_sq >= threshold {
                robot.drive_to(world, *slot)?;
            } else {
                robot.stop(world)?;
                arrived += 1;
            }
        }
        if arrived < self.robots.len() {
            return Ok(ManeuverState::RotateMove { slots });
        }

        // All robots on their new slots: the heading advances exactly once,
        // then every robot gets its optimal turn direction to it
        self.heading += self.heading_increment(world.timestep());
        let heading = self.heading;
        let turn_dirs = self
            .robots
            .iter()
            .map(|robot| {
                let pose = robot.pose(world)?;
                Ok(shortest_turn(pose.angle, heading).signum())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.enter(world, ManeuverState::RotateAlign { turn_dirs }))
    }

    /// Record the state entry time and return the new state.
    fn enter(&mut self, world: &World2, state: ManeuverState) -> ManeuverState {
        self.state_entered = world.time();
        state
    }

    /// Average the fuzzy velocity commands of every robot against the
    /// task-appropriate target.
    fn average_velocities(&self, world: &World2) -> Result<VelocityCommand> {
        let target = self.task_target(world)?;
        let mut sum = VelocityCommand::zero();
        for robot in &self.robots {
            let cmd = robot.sense_velocities(world, target)?;
            sum.translate += cmd.translate;
            sum.rotate += cmd.rotate;
        }
        let n = self.robots.len() as f64;
        Ok(VelocityCommand {
            translate: sum.translate / n,
            rotate: sum.rotate / n,
        })
    }

    /// Position the formation is currently pursuing: the target object when
    /// seeking, the goal region when returning.
    fn task_target(&self, world: &World2) -> Result<Point2<f64>> {
        match self.task {
            Task::SeekObject => Ok(world.pose(self.target)?.position),
            Task::ReturnToNest => Ok(self.goal),
        }
    }

    /// Heading change of one completed rotate maneuver, signed by the
    /// averaged rotational velocity.
    fn heading_increment(&self, timestep: f64) -> f64 {
        self.config.rotation_gain * self.command.rotate * timestep
    }

    /// Target slot positions for a rotation, swung around the center by the
    /// signed heading increment.
    fn rotated_slots(&self, timestep: f64) -> Vec<Point2<f64>> {
        let beta = self.config.slot_spacing();
        let increment = self.heading_increment(timestep);
        (0..self.config.swarm_size)
            .map(|i| {
                let slot_angle =
                    self.heading + self.config.open_arc / 2.0 + i as f64 * beta + increment;
                slot_position(self.center, self.config.radius, slot_angle)
            })
            .collect()
    }
}

/// Position on the formation circle at the given absolute slot angle.
fn slot_position(center: Point2<f64>, radius: f64, slot_angle: f64) -> Point2<f64> {
    center + nalgebra::Vector2::new(slot_angle.cos(), slot_angle.sin()) * radius
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;
    use swarm_types::SimConfig;
    use swarm_world::Shape2;

    fn setup(config: FormationConfig) -> (World2, FormationController) {
        let mut world = World2::new(SimConfig::default());
        let target = world.add_body(
            Pose2::from_position(Point2::new(300.0, 100.0)),
            Shape2::square(20.0),
            1.0,
            1.0,
        );
        let controller = FormationController::new(
            &mut world,
            Point2::new(100.0, 100.0),
            0.0,
            Point2::new(50.0, 400.0),
            target,
            config,
        )
        .unwrap();
        (world, controller)
    }

    fn run_to_idle(world: &mut World2, controller: &mut FormationController) -> usize {
        let mut ticks = 0;
        while !controller.state().is_idle() {
            controller.run(world, None).unwrap();
            ticks += 1;
            assert!(ticks < 10_000, "maneuver never completed");
        }
        ticks
    }

    #[test]
    fn test_u_shape_closure() {
        for swarm_size in [2, 3, 5, 8] {
            let config = FormationConfig {
                swarm_size,
                ..FormationConfig::default()
            };
            let closure = (swarm_size - 1) as f64 * config.slot_spacing() + config.open_arc;
            assert_relative_eq!(closure, TAU, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_robots_spawn_on_slots() {
        let (world, controller) = setup(FormationConfig::default());
        for robot in controller.robots() {
            let dist = (robot.position(&world).unwrap() - controller.center()).norm();
            assert_relative_eq!(dist, 23.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_translate_takes_two_ticks_and_moves_center() {
        let (mut world, mut controller) = setup(FormationConfig::default());

        controller.run(&mut world, Some(Maneuver::Translate)).unwrap();
        assert!(matches!(controller.state(), ManeuverState::TranslateApply));

        let before = controller.center();
        let ticks = run_to_idle(&mut world, &mut controller);
        assert_eq!(ticks, 2);

        // Center moved by v * (n / tick_rate) along the heading (+x)
        let expected = controller.command().translate * 3.0 / 60.0;
        let moved = controller.center() - before;
        assert_relative_eq!(moved.x, expected, epsilon = 1e-9);
        assert_relative_eq!(moved.y, 0.0, epsilon = 1e-9);
        assert!(expected > 0.0, "command had zero forward speed");
    }

    #[test]
    fn test_rotate_completes_and_changes_heading_once() {
        let (mut world, mut controller) = setup(FormationConfig::default());
        let heading_before = controller.heading();

        controller.run(&mut world, Some(Maneuver::Rotate)).unwrap();
        assert!(matches!(controller.state(), ManeuverState::RotateMove { .. }));
        run_to_idle(&mut world, &mut controller);

        let increment = controller.config().rotation_gain
            * controller.command().rotate
            * world.timestep();
        assert_relative_eq!(
            controller.heading(),
            normalize_angle(heading_before + increment),
            epsilon = 1e-9
        );

        // Every robot ends aligned with the formation heading
        for robot in controller.robots() {
            let pose = robot.pose(&world).unwrap();
            assert_relative_eq!(
                normalize_angle(pose.angle),
                controller.heading(),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_action_rejected_while_maneuver_in_flight() {
        let (mut world, mut controller) = setup(FormationConfig::default());

        controller.run(&mut world, Some(Maneuver::Translate)).unwrap();
        assert!(matches!(controller.state(), ManeuverState::TranslateApply));

        // A second request is ignored and the tick is not spent
        let center = controller.center();
        controller.run(&mut world, Some(Maneuver::Rotate)).unwrap();
        assert!(matches!(controller.state(), ManeuverState::TranslateApply));
        assert_relative_eq!(controller.center().coords, center.coords, epsilon = 1e-12);

        run_to_idle(&mut world, &mut controller);
    }

    #[test]
    fn test_idle_without_action_is_a_no_op() {
        let (mut world, mut controller) = setup(FormationConfig::default());
        let time = world.time();
        controller.run(&mut world, None).unwrap();
        assert!(controller.state().is_idle());
        assert_relative_eq!(world.time(), time, epsilon = 1e-12);
    }

    #[test]
    fn test_repeat_limit_inverts_request() {
        let config = FormationConfig {
            repeat_limit: 2,
            ..FormationConfig::default()
        };
        let (mut world, mut controller) = setup(config);

        // Three translations count the repeat counter up to the limit
        for _ in 0..3 {
            controller.run(&mut world, Some(Maneuver::Translate)).unwrap();
            run_to_idle(&mut world, &mut controller);
        }
        // The next identical request crosses the limit and is inverted
        controller.run(&mut world, Some(Maneuver::Translate)).unwrap();
        assert!(
            matches!(controller.state(), ManeuverState::RotateMove { .. }),
            "request was not inverted: {:?}",
            controller.state()
        );
        run_to_idle(&mut world, &mut controller);
    }

    #[test]
    fn test_stall_recovery_resolves_to_idle() {
        // A near-zero stall timeout trips on the second rotate-move tick;
        // the target sits off-axis so the averaged rotation is nonzero and
        // the slots genuinely move
        let mut world = World2::new(SimConfig::default());
        let target = world.add_body(
            Pose2::from_position(Point2::new(300.0, 300.0)),
            Shape2::square(20.0),
            1.0,
            1.0,
        );
        let config = FormationConfig {
            stall_timeout: 1e-9,
            ..FormationConfig::default()
        };
        let mut controller = FormationController::new(
            &mut world,
            Point2::new(100.0, 100.0),
            0.0,
            Point2::new(50.0, 400.0),
            target,
            config,
        )
        .unwrap();
        let heading_before = controller.heading();

        controller.run(&mut world, Some(Maneuver::Rotate)).unwrap();
        assert!(controller.command().rotate.abs() > 0.0);
        let ticks = run_to_idle(&mut world, &mut controller);
        assert_eq!(ticks, 2, "stall recovery should fire on the second tick");

        // Abandoned: the heading did not change, the robots snapped back
        assert_relative_eq!(controller.heading(), heading_before, epsilon = 1e-12);
        for robot in controller.robots() {
            let pose = robot.pose(&world).unwrap();
            assert_relative_eq!(
                normalize_angle(pose.angle),
                heading_before,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_task_switch_changes_pursued_target() {
        let (mut world, mut controller) = setup(FormationConfig::default());

        // Seeking: the target object sits straight ahead (+x), so the
        // averaged command drives forward
        controller.run(&mut world, Some(Maneuver::Translate)).unwrap();
        let seek = controller.command();
        run_to_idle(&mut world, &mut controller);
        assert!(seek.translate > 0.0);

        // Returning: the goal is up and behind-left, so the averaged
        // command wants to turn counter-clockwise
        controller.set_task(Task::ReturnToNest);
        controller.run(&mut world, Some(Maneuver::Rotate)).unwrap();
        let ret = controller.command();
        run_to_idle(&mut world, &mut controller);
        assert!(ret.rotate > 0.0, "rotate command {}", ret.rotate);
    }

    #[test]
    fn test_config_validation() {
        assert!(FormationConfig::default().validate().is_ok());
        let bad = FormationConfig {
            swarm_size: 1,
            ..FormationConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = FormationConfig {
            radius: 0.0,
            ..FormationConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_maneuver_decoding() {
        assert_eq!(Maneuver::from_index(0).unwrap(), Maneuver::Translate);
        assert_eq!(Maneuver::from_index(1).unwrap(), Maneuver::Rotate);
        assert!(matches!(
            Maneuver::from_index(7),
            Err(SwarmError::UnknownAction { value: 7 })
        ));
    }
}
