//! Fuzzy velocity inference.
//!
//! A [`FuzzyVelocityController`] converts the three sector minima of a range
//! reading plus the goal-relative angle and distance into a translational
//! and a rotational speed command. It is a pure function of its five inputs:
//! no state is retained between calls, and every input combination produces
//! a bounded output.
//!
//! The inference is Mamdani-style with shoulder membership functions over
//! the distance domain and weighted-singleton defuzzification:
//!
//! - obstacle avoidance dominates goal seeking in proportion to the
//!   strongest `near` membership among the sectors;
//! - with every sector clear, the rotational output steers the goal-relative
//!   angle toward zero and the translational output saturates at the
//!   configured top speed;
//! - mirrored rule pairs keep the output antisymmetric under a left/right
//!   swap, except for a deliberate counter-clockwise escape rule that breaks
//!   head-on deadlocks when the front sector is blocked and the sides read
//!   the same.

use swarm_types::angle::normalize_angle;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A velocity command produced by fuzzy inference.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VelocityCommand {
    /// Translational speed (cm/s), non-negative.
    pub translate: f64,
    /// Rotational speed (rad/s), counter-clockwise positive.
    pub rotate: f64,
}

impl VelocityCommand {
    /// A zero command (stay put).
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Configuration for the fuzzy velocity controller.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FuzzyConfig {
    /// Upper end of the distance domain (the sensor's maximum range, cm).
    pub max_range: f64,
    /// Top translational speed (cm/s).
    pub max_speed: f64,
    /// Top rotational speed (rad/s).
    pub max_turn_rate: f64,
    /// Distance below which a sector counts as `near` (cm); membership
    /// ramps from 1 at contact to 0 here.
    pub near_band: f64,
    /// Distance at which the front sector counts as fully `clear` (cm);
    /// forward speed ramps up to the top speed here.
    pub clear_band: f64,
    /// Proportional gain turning goal-relative angle into rotation.
    pub goal_gain: f64,
    /// Distance softening of the goal term (cm): the bearing gain fades
    /// as the goal gets closer than this, so the robot does not orbit it.
    pub goal_falloff: f64,
    /// Counter-clockwise turn fraction applied when the front sector is
    /// blocked and the sides read the same (head-on escape).
    pub escape_bias: f64,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            max_range: 400.0,
            max_speed: 20.0,
            max_turn_rate: 2.0,
            near_band: 55.0,
            clear_band: 150.0,
            goal_gain: 1.0,
            goal_falloff: 25.0,
            escape_bias: 0.25,
        }
    }
}

impl FuzzyConfig {
    /// Set the top translational speed.
    #[must_use]
    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Set the top rotational speed.
    #[must_use]
    pub fn with_max_turn_rate(mut self, max_turn_rate: f64) -> Self {
        self.max_turn_rate = max_turn_rate;
        self
    }

    /// Set the `near` membership band.
    #[must_use]
    pub fn with_near_band(mut self, near_band: f64) -> Self {
        self.near_band = near_band;
        self
    }
}

/// Stateless fuzzy inference from sensed distances and goal geometry to a
/// velocity command.
#[derive(Debug, Clone)]
pub struct FuzzyVelocityController {
    config: FuzzyConfig,
}

impl Default for FuzzyVelocityController {
    fn default() -> Self {
        Self::new(FuzzyConfig::default())
    }
}

impl FuzzyVelocityController {
    /// Create a controller with the given configuration.
    #[must_use]
    pub fn new(config: FuzzyConfig) -> Self {
        Self { config }
    }

    /// The controller configuration.
    #[must_use]
    pub fn config(&self) -> &FuzzyConfig {
        &self.config
    }

    /// Evaluate the rule base for one set of inputs.
    ///
    /// `left`, `front`, and `right` are sector-minimum distances;
    /// `angle_to_goal` is the robot heading minus the goal bearing, and
    /// `dist_to_goal` the distance to the pursued target. Out-of-range
    /// inputs are clamped, never rejected.
    #[must_use]
    pub fn evaluate(
        &self,
        left: f64,
        front: f64,
        right: f64,
        angle_to_goal: f64,
        dist_to_goal: f64,
    ) -> VelocityCommand {
        let c = &self.config;
        let left = left.clamp(0.0, c.max_range);
        let front = front.clamp(0.0, c.max_range);
        let right = right.clamp(0.0, c.max_range);
        let angle = normalize_angle(angle_to_goal);
        let dist = dist_to_goal.max(0.0);

        // Linguistic terms: `near` memberships per sector
        let near_l = shoulder_down(left, c.near_band);
        let near_f = shoulder_down(front, c.near_band);
        let near_r = shoulder_down(right, c.near_band);

        // Avoidance rules (mirrored pair): steer away from the nearer side,
        // harder when the front is also closing
        let steer = (near_r - near_l) * (1.0 + near_f);

        // Head-on escape rule: only fires when the sides cannot break the
        // tie themselves; continuous in all inputs
        let escape = c.escape_bias * near_f * (1.0 - (near_l - near_r).abs());

        // Goal-seeking rule: turn the goal-relative angle toward zero,
        // fading as the goal is reached
        let softening = dist / (dist + c.goal_falloff);
        let goal = (-c.goal_gain * angle * softening).clamp(-1.0, 1.0);

        // Aggregate: avoidance dominates in proportion to the strongest
        // `near` membership
        let dominance = near_l.max(near_f).max(near_r);
        let avoid = (steer + escape).clamp(-1.0, 1.0);
        let rotate_fraction = (dominance * avoid + (1.0 - dominance) * goal).clamp(-1.0, 1.0);

        // Forward speed: proportional to front-sector clearance
        let clearance = (front / c.clear_band).min(1.0) * (1.0 - near_f);

        VelocityCommand {
            translate: c.max_speed * clearance,
            rotate: c.max_turn_rate * rotate_fraction,
        }
    }
}

/// Descending shoulder membership: 1 at zero, linear to 0 at `band`.
fn shoulder_down(x: f64, band: f64) -> f64 {
    (1.0 - x / band).clamp(0.0, 1.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    const MAX: f64 = 400.0;

    fn controller() -> FuzzyVelocityController {
        FuzzyVelocityController::default()
    }

    #[test]
    fn test_all_clear_facing_goal_is_full_speed_straight() {
        let cmd = controller().evaluate(MAX, MAX, MAX, 0.0, 200.0);
        assert_relative_eq!(cmd.translate, 20.0, epsilon = 1e-12);
        assert_relative_eq!(cmd.rotate, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_all_clear_turns_toward_goal() {
        let flc = controller();
        // Goal to the right of the heading (negative bearing error is a
        // positive angle_to_goal here): turn clockwise
        let cmd = flc.evaluate(MAX, MAX, MAX, 0.5, 200.0);
        assert!(cmd.rotate < 0.0);
        // Mirror image turns counter-clockwise
        let cmd = flc.evaluate(MAX, MAX, MAX, -0.5, 200.0);
        assert!(cmd.rotate > 0.0);
        // Full speed either way while everything is clear
        assert_relative_eq!(cmd.translate, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_front_blocked_escapes_even_on_a_tie() {
        let cmd = controller().evaluate(MAX, 1.0, MAX, 0.0, 200.0);
        assert!(cmd.rotate > 0.05, "no escape turn: {}", cmd.rotate);
        assert!(cmd.translate < 1.0, "still driving into the wall");
    }

    #[test]
    fn test_front_blocked_turns_away_from_nearer_side() {
        let flc = controller();
        // Right side much closer: turn counter-clockwise, away from it
        let cmd = flc.evaluate(MAX, 5.0, 10.0, 0.0, 200.0);
        assert!(cmd.rotate > 0.0);
        // Left side much closer: turn clockwise
        let cmd = flc.evaluate(10.0, 5.0, MAX, 0.0, 200.0);
        assert!(cmd.rotate < 0.0);
    }

    #[test]
    fn test_avoidance_dominates_goal_seeking() {
        let flc = controller();
        // Goal hard to the left, but the left sector is nearly touching:
        // the obstacle wins and the robot turns right
        let cmd = flc.evaluate(1.0, MAX, MAX, -PI / 2.0, 200.0);
        assert!(cmd.rotate < 0.0, "goal seeking overrode avoidance");
    }

    #[test]
    fn test_left_right_antisymmetry() {
        let flc = controller();
        // Front clear keeps the escape rule quiet; the mirrored inputs must
        // produce an exactly mirrored command
        for (l, r, a) in [
            (30.0, 120.0, 0.7),
            (200.0, 40.0, -1.2),
            (55.0, 54.0, 0.1),
            (MAX, 90.0, 2.5),
        ] {
            let fwd = flc.evaluate(l, MAX, r, a, 150.0);
            let mir = flc.evaluate(r, MAX, l, -a, 150.0);
            assert_relative_eq!(fwd.rotate, -mir.rotate, epsilon = 1e-12);
            assert_relative_eq!(fwd.translate, mir.translate, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_outputs_bounded_and_finite() {
        let flc = controller();
        for l in [-10.0, 0.0, 20.0, 55.0, 400.0, 1e6] {
            for f in [0.0, 30.0, 400.0] {
                for r in [0.0, 70.0, 400.0] {
                    for a in [-10.0, -PI, 0.0, 1.0, 10.0] {
                        for d in [-5.0, 0.0, 3.0, 1e9] {
                            let cmd = flc.evaluate(l, f, r, a, d);
                            assert!(cmd.translate >= 0.0 && cmd.translate <= 20.0);
                            assert!(cmd.rotate.abs() <= 2.0);
                            assert!(cmd.translate.is_finite() && cmd.rotate.is_finite());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_goal_term_fades_near_target() {
        let flc = controller();
        let far = flc.evaluate(MAX, MAX, MAX, 1.0, 500.0);
        let close = flc.evaluate(MAX, MAX, MAX, 1.0, 2.0);
        assert!(close.rotate.abs() < far.rotate.abs());
    }
}
