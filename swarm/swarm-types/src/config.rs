//! Simulation timing configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed-timestep settings shared by the world and the controllers.
///
/// Every robot motion primitive advances the world by exactly one timestep,
/// so the tick rate couples control cadence to physics integration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimConfig {
    /// Fixed timestep for physics integration (seconds).
    pub timestep: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 60.0,
        }
    }
}

impl SimConfig {
    /// Create a config with the given timestep.
    #[must_use]
    pub const fn with_timestep(timestep: f64) -> Self {
        Self { timestep }
    }

    /// Get the tick frequency in Hz.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        1.0 / self.timestep
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(crate::SwarmError::InvalidTimestep(self.timestep));
        }
        Ok(())
    }
}
