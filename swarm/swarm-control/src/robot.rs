//! A single swarm robot and its motion primitives.
//!
//! A [`Robot`] owns one physical body in the world, one [`RangeSensor`], and
//! one [`FuzzyVelocityController`]. Every mutating primitive advances the
//! world by exactly one fixed timestep and then refreshes the sensor pose,
//! so the sensor pose always equals the body pose when a primitive returns.

use nalgebra::Point2;
use swarm_types::angle::{normalize_angle, wrap_angle};
use swarm_types::{BodyId, Pose2, Result};
use swarm_world::{Shape2, World2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fuzzy::{FuzzyConfig, FuzzyVelocityController, VelocityCommand};
use crate::sensor::{RangeSensor, RangeSensorConfig, SectorReading};

/// Configuration for one swarm robot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RobotConfig {
    /// Body mass (kg).
    pub mass: f64,
    /// Hull radius (cm).
    pub radius: f64,
    /// Surface friction coefficient.
    pub friction: f64,
    /// Fixed speed used by [`Robot::drive_to`] (cm/s).
    pub approach_speed: f64,
    /// Squared distance below which [`Robot::drive_to`] considers the
    /// target reached (cm^2).
    pub arrive_threshold_sq: f64,
    /// Angular difference below which [`Robot::rotate_to`] considers the
    /// heading aligned (rad).
    pub align_threshold: f64,
    /// Angular speed used by [`Robot::rotate_to`] (rad/s).
    pub turn_rate: f64,
    /// Range sensor settings.
    pub sensor: RangeSensorConfig,
    /// Fuzzy controller settings.
    pub fuzzy: FuzzyConfig,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            mass: 0.65,
            radius: 10.0,
            friction: 1.0,
            approach_speed: 10.0,
            arrive_threshold_sq: 0.25,
            align_threshold: 0.09,
            turn_rate: std::f64::consts::FRAC_PI_3,
            sensor: RangeSensorConfig::default(),
            fuzzy: FuzzyConfig::default(),
        }
    }
}

impl RobotConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(swarm_types::SwarmError::invalid_config(
                "robot radius must be positive",
            ));
        }
        if self.approach_speed <= 0.0 || self.turn_rate <= 0.0 {
            return Err(swarm_types::SwarmError::invalid_config(
                "robot speeds must be positive",
            ));
        }
        self.sensor.validate()
    }
}

/// One robot of the formation.
#[derive(Debug, Clone)]
pub struct Robot {
    index: usize,
    body: BodyId,
    sensor: RangeSensor,
    fuzzy: FuzzyVelocityController,
    config: RobotConfig,
}

impl Robot {
    /// Create the robot's body in the world and attach its sensor and fuzzy
    /// controller.
    pub fn spawn(
        world: &mut World2,
        index: usize,
        pose: Pose2,
        config: RobotConfig,
    ) -> Result<Self> {
        config.validate()?;
        let body = world.add_body(
            pose,
            Shape2::circle(config.radius),
            config.mass,
            config.friction,
        );
        Ok(Self {
            index,
            body,
            sensor: RangeSensor::new(body, pose.position, pose.angle, config.sensor.clone()),
            fuzzy: FuzzyVelocityController::new(config.fuzzy.clone()),
            config,
        })
    }

    /// Slot index of this robot within the formation.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Handle of the robot's body.
    #[must_use]
    pub fn body(&self) -> BodyId {
        self.body
    }

    /// The robot configuration.
    #[must_use]
    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    /// The attached range sensor.
    #[must_use]
    pub fn sensor(&self) -> &RangeSensor {
        &self.sensor
    }

    /// Current pose of the robot's body.
    pub fn pose(&self, world: &World2) -> Result<Pose2> {
        world.pose(self.body)
    }

    /// Current position of the robot's body.
    pub fn position(&self, world: &World2) -> Result<Point2<f64>> {
        Ok(world.pose(self.body)?.position)
    }

    /// Drive forward along the current heading at the given speed.
    ///
    /// Does not change the heading.
    pub fn drive(&mut self, world: &mut World2, speed: f64) -> Result<()> {
        let pose = world.pose(self.body)?;
        world.set_velocity(self.body, pose.forward() * speed)?;
        self.tick(world)
    }

    /// Zero the linear and angular velocity.
    pub fn stop(&mut self, world: &mut World2) -> Result<()> {
        world.set_velocity(self.body, nalgebra::Vector2::zeros())?;
        world.set_angular_velocity(self.body, 0.0)?;
        self.tick(world)
    }

    /// Turn to face a target point and drive toward it at the approach
    /// speed; stop once within the arrival threshold.
    ///
    /// The re-orientation is instantaneous (a holonomic low-level
    /// controller), so repeated calls near the target are idempotent: once
    /// arrived the velocity stays at zero.
    pub fn drive_to(&mut self, world: &mut World2, target: Point2<f64>) -> Result<()> {
        let pose = world.pose(self.body)?;
        let delta = target - pose.position;
        if delta.norm_squared() < self.config.arrive_threshold_sq {
            world.set_velocity(self.body, nalgebra::Vector2::zeros())?;
        } else {
            let heading = delta.y.atan2(delta.x);
            world.set_angle(self.body, heading)?;
            let forward = nalgebra::Vector2::new(heading.cos(), heading.sin());
            world.set_velocity(self.body, forward * self.config.approach_speed)?;
        }
        self.tick(world)
    }

    /// Rotate toward a target heading with a fixed angular speed signed by
    /// `direction`; zero the angular velocity once within the alignment
    /// threshold (headings compared mod 2*pi).
    pub fn rotate_to(&mut self, world: &mut World2, angle: f64, direction: f64) -> Result<()> {
        let pose = world.pose(self.body)?;
        let diff = (wrap_angle(pose.angle) - wrap_angle(angle)).abs();
        if diff < self.config.align_threshold {
            world.set_angular_velocity(self.body, 0.0)?;
        } else {
            world.set_angular_velocity(self.body, direction.signum() * self.config.turn_rate)?;
        }
        self.tick(world)
    }

    /// Snap the body heading directly.
    ///
    /// Used by formation alignment and stall recovery; unlike the motion
    /// primitives this does not advance the world.
    pub fn set_heading(&mut self, world: &mut World2, angle: f64) -> Result<()> {
        world.set_angle(self.body, angle)?;
        self.refresh_sensor(world)
    }

    /// Sample the sensor, partition it into sectors, and ask the fuzzy
    /// controller for a velocity command toward `target`.
    ///
    /// Read-only: neither the world nor the robot state changes. This is
    /// the only place sensing and fuzzy inference are composed.
    pub fn sense_velocities(&self, world: &World2, target: Point2<f64>) -> Result<VelocityCommand> {
        let sectors = SectorReading::from_reading(&self.sensor.sample(world));
        let pose = world.pose(self.body)?;
        let delta = target - pose.position;
        let dist = delta.norm();
        let angle = normalize_angle(pose.angle - delta.y.atan2(delta.x));
        Ok(self
            .fuzzy
            .evaluate(sectors.left, sectors.front, sectors.right, angle, dist))
    }

    /// Advance the world one timestep and refresh the sensor pose.
    fn tick(&mut self, world: &mut World2) -> Result<()> {
        world.step();
        self.refresh_sensor(world)
    }

    fn refresh_sensor(&mut self, world: &World2) -> Result<()> {
        let pose = world.pose(self.body)?;
        self.sensor.update_pose(pose.position, pose.angle);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;
    use swarm_types::SimConfig;

    fn world() -> World2 {
        World2::new(SimConfig::default())
    }

    fn spawn(world: &mut World2, pose: Pose2) -> Robot {
        Robot::spawn(world, 0, pose, RobotConfig::default()).unwrap()
    }

    #[test]
    fn test_drive_moves_along_heading() {
        let mut w = world();
        let mut robot = spawn(&mut w, Pose2::new(Point2::origin(), FRAC_PI_2));

        robot.drive(&mut w, 60.0).unwrap();
        let pose = robot.pose(&w).unwrap();
        assert_relative_eq!(pose.position.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pose.position.y, 1.0, epsilon = 1e-9);
        // Heading untouched
        assert_relative_eq!(pose.angle, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_sensor_follows_body() {
        let mut w = world();
        let mut robot = spawn(&mut w, Pose2::identity());

        robot.drive(&mut w, 60.0).unwrap();
        robot.drive(&mut w, 60.0).unwrap();

        let pose = robot.pose(&w).unwrap();
        assert_relative_eq!(
            robot.sensor().position().coords,
            pose.position.coords,
            epsilon = 1e-12
        );
        assert_relative_eq!(robot.sensor().angle(), pose.angle, epsilon = 1e-12);
    }

    #[test]
    fn test_stop_zeroes_velocities() {
        let mut w = world();
        let mut robot = spawn(&mut w, Pose2::identity());

        robot.drive(&mut w, 60.0).unwrap();
        robot.stop(&mut w).unwrap();
        let twist = w.twist(robot.body()).unwrap();
        assert_relative_eq!(twist.speed(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(twist.angular, 0.0, epsilon = 1e-12);

        // Stopped: further steps do not move the body
        let before = robot.position(&w).unwrap();
        w.step();
        assert_relative_eq!(
            robot.position(&w).unwrap().coords,
            before.coords,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_drive_to_converges_and_is_idempotent() {
        let mut w = world();
        let mut robot = spawn(&mut w, Pose2::identity());
        let target = Point2::new(10.0, 5.0);

        for _ in 0..200 {
            robot.drive_to(&mut w, target).unwrap();
        }
        let pose = robot.pose(&w).unwrap();
        assert!(
            (target - pose.position).norm_squared() < 0.25,
            "did not arrive: {:?}",
            pose.position
        );

        // Arrived: repeated calls keep the velocity at zero
        robot.drive_to(&mut w, target).unwrap();
        assert_relative_eq!(w.twist(robot.body()).unwrap().speed(), 0.0, epsilon = 1e-12);

        // Heading faces the target along the way
        let expected = (5.0_f64).atan2(10.0);
        assert_relative_eq!(normalize_angle(pose.angle), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_rotate_to_turns_and_settles() {
        let mut w = world();
        let mut robot = spawn(&mut w, Pose2::identity());

        for _ in 0..200 {
            robot.rotate_to(&mut w, FRAC_PI_2, 1.0).unwrap();
        }
        let pose = robot.pose(&w).unwrap();
        let diff = (wrap_angle(pose.angle) - FRAC_PI_2).abs();
        assert!(diff < 0.09, "heading off by {diff}");

        // Settled: angular velocity is zero
        assert_relative_eq!(w.twist(robot.body()).unwrap().angular, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_set_heading_does_not_advance_time() {
        let mut w = world();
        let mut robot = spawn(&mut w, Pose2::identity());

        let before = w.time();
        robot.set_heading(&mut w, 1.0).unwrap();
        assert_relative_eq!(w.time(), before, epsilon = 1e-12);
        assert_relative_eq!(robot.pose(&w).unwrap().angle, 1.0, epsilon = 1e-12);
        assert_relative_eq!(robot.sensor().angle(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sense_velocities_reads_without_mutating() {
        let mut w = world();
        let robot = spawn(&mut w, Pose2::identity());
        let time_before = w.time();

        let cmd = robot
            .sense_velocities(&w, Point2::new(200.0, 0.0))
            .unwrap();
        assert_relative_eq!(w.time(), time_before, epsilon = 1e-12);

        // Open arena, goal dead ahead: full speed, no turn
        assert_relative_eq!(cmd.translate, 20.0, epsilon = 1e-9);
        assert_relative_eq!(cmd.rotate, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sense_velocities_turns_toward_target() {
        let mut w = world();
        let robot = spawn(&mut w, Pose2::identity());

        // Target to the left (+y): angle_to_goal is negative, so the
        // command turns counter-clockwise
        let cmd = robot.sense_velocities(&w, Point2::new(0.0, 200.0)).unwrap();
        assert!(cmd.rotate > 0.0);
    }
}
