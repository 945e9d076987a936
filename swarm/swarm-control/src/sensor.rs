//! Simulated range sensing.
//!
//! A [`RangeSensor`] casts a fan of beams from a robot's pose and measures
//! the distance to the nearest obstruction along each beam, up to a maximum
//! range. Readings are partitioned downstream into three contiguous sectors
//! (left / front / right) by [`SectorReading`].

use nalgebra::{Point2, Vector2};
use swarm_types::{BodyId, Result, SwarmError};
use swarm_world::World2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a range sensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RangeSensorConfig {
    /// Number of beams in the fan.
    pub beams: usize,
    /// Angular span of the fan (radians), centered on the forward axis.
    pub span: f64,
    /// Maximum detectable range (cm). Beams with no intersection report
    /// this value.
    pub max_range: f64,
}

impl Default for RangeSensorConfig {
    fn default() -> Self {
        Self {
            beams: 32,
            span: std::f64::consts::PI,
            max_range: 400.0,
        }
    }
}

impl RangeSensorConfig {
    /// Set the number of beams.
    #[must_use]
    pub fn with_beams(mut self, beams: usize) -> Self {
        self.beams = beams;
        self
    }

    /// Set the angular span of the fan.
    #[must_use]
    pub fn with_span(mut self, span: f64) -> Self {
        self.span = span;
        self
    }

    /// Set the maximum range.
    #[must_use]
    pub fn with_max_range(mut self, max_range: f64) -> Self {
        self.max_range = max_range;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.beams < 3 {
            return Err(SwarmError::invalid_config(
                "range sensor needs at least 3 beams",
            ));
        }
        if !self.span.is_finite() || self.span <= 0.0 {
            return Err(SwarmError::invalid_config("sensor span must be positive"));
        }
        if !self.max_range.is_finite() || self.max_range <= 0.0 {
            return Err(SwarmError::invalid_config(
                "sensor max range must be positive",
            ));
        }
        Ok(())
    }
}

/// A fan of ranging beams anchored to a robot's pose.
///
/// Beam 0 is at the start of the angular span (leftmost, at `+span/2`
/// relative to the heading); the last beam is at `-span/2`. Sampling never
/// mutates the pose; [`RangeSensor::update_pose`] repositions the fan
/// without re-sampling.
#[derive(Debug, Clone)]
pub struct RangeSensor {
    /// Body this sensor is attached to (excluded from its own beams).
    body: BodyId,
    config: RangeSensorConfig,
    position: Point2<f64>,
    angle: f64,
}

impl RangeSensor {
    /// Create a sensor attached to a body, initially at the given pose.
    #[must_use]
    pub fn new(body: BodyId, position: Point2<f64>, angle: f64, config: RangeSensorConfig) -> Self {
        Self {
            body,
            config,
            position,
            angle,
        }
    }

    /// The body this sensor is attached to.
    #[must_use]
    pub fn body(&self) -> BodyId {
        self.body
    }

    /// The sensor configuration.
    #[must_use]
    pub fn config(&self) -> &RangeSensorConfig {
        &self.config
    }

    /// Current anchor position of the fan.
    #[must_use]
    pub fn position(&self) -> Point2<f64> {
        self.position
    }

    /// Current anchor heading of the fan.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Reposition the beam fan without re-sampling.
    pub fn update_pose(&mut self, position: Point2<f64>, angle: f64) {
        self.position = position;
        self.angle = angle;
    }

    /// Perform all angular readings and return one distance per beam.
    ///
    /// Beams that intersect nothing report the configured maximum range.
    #[must_use]
    pub fn sample(&self, world: &World2) -> Vec<f64> {
        let n = self.config.beams;
        let step = self.config.span / (n - 1) as f64;
        (0..n)
            .map(|i| {
                let beam_angle = self.angle + self.config.span / 2.0 - i as f64 * step;
                let direction = Vector2::new(beam_angle.cos(), beam_angle.sin());
                world
                    .raycast(
                        self.position,
                        direction,
                        self.config.max_range,
                        Some(self.body),
                    )
                    .map_or(self.config.max_range, |hit| hit.distance)
            })
            .collect()
    }
}

/// Sector minima of one sensor reading.
///
/// The fan is split into three contiguous sectors of `n/3`, `n/3 + n%3`,
/// and `n/3` beams; remainder beams go to the front sector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorReading {
    /// Minimum distance over the left sector.
    pub left: f64,
    /// Minimum distance over the front sector.
    pub front: f64,
    /// Minimum distance over the right sector.
    pub right: f64,
}

impl SectorReading {
    /// Partition a full reading into sector minima.
    ///
    /// # Panics
    ///
    /// Panics if the reading has fewer than 3 beams (ruled out by
    /// [`RangeSensorConfig::validate`]).
    #[must_use]
    pub fn from_reading(distances: &[f64]) -> Self {
        let n = distances.len();
        assert!(n >= 3, "sector partition needs at least 3 beams");
        let third = n / 3;
        let min_of = |slice: &[f64]| slice.iter().copied().fold(f64::INFINITY, f64::min);
        Self {
            left: min_of(&distances[0..third]),
            front: min_of(&distances[third..n - third]),
            right: min_of(&distances[n - third..n]),
        }
    }
}
