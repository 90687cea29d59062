//! Physics configuration

use crate::error::{PhysicsError, Result};
use serde::{Deserialize, Serialize};

/// Physics engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gravity vector (default: -10 in Y)
    pub gravity: [f64; 3],

    /// Smallest collision impulse that makes a body with restitution bounce
    pub min_bounce_impulse: f64,

    /// Linear drag applied outside fluids, unless a body overrides it
    pub air_drag: f64,

    /// Linear drag applied inside fluids, unless a body overrides it
    pub fluid_drag: f64,

    /// Fluid density used for buoyancy
    pub fluid_density: f64,

    /// Bias used by the sweep to place faces lying on a voxel boundary
    pub sweep_epsilon: f64,

    /// Largest timestep a single `update` will simulate; longer frames are clamped
    pub max_timestep: f64,

    /// Idle ticks before a body falls asleep, for bodies that don't override it
    pub sleep_frames: u32,

    /// Auto-step only triggers when movement is mostly into the blocked axis;
    /// this is the minimum ratio of blocked to unblocked horizontal movement
    pub auto_step_cutoff: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -10.0, 0.0],
            min_bounce_impulse: 0.5,
            air_drag: 0.1,
            fluid_drag: 0.4,
            fluid_density: 2.0,
            sweep_epsilon: 1e-10,
            max_timestep: 0.018,
            sleep_frames: 10,
            auto_step_cutoff: 4.0,
        }
    }
}

impl EngineConfig {
    /// Configuration without gravity, e.g. for flying cameras or space scenes
    pub fn zero_gravity() -> Self {
        Self {
            gravity: [0.0, 0.0, 0.0],
            ..Default::default()
        }
    }

    /// Configuration without air or fluid drag
    pub fn frictionless() -> Self {
        Self {
            air_drag: 0.0,
            fluid_drag: 0.0,
            ..Default::default()
        }
    }

    /// Set gravity
    pub fn with_gravity(mut self, x: f64, y: f64, z: f64) -> Self {
        self.gravity = [x, y, z];
        self
    }

    /// Set the timestep clamp
    pub fn with_max_timestep(mut self, max_timestep: f64) -> Self {
        self.max_timestep = max_timestep;
        self
    }

    /// Set air drag
    pub fn with_air_drag(mut self, air_drag: f64) -> Self {
        self.air_drag = air_drag;
        self
    }

    /// Set the sweep's boundary bias
    pub fn with_sweep_epsilon(mut self, epsilon: f64) -> Self {
        self.sweep_epsilon = epsilon;
        self
    }

    /// Set fluid drag and density
    pub fn with_fluid(mut self, fluid_drag: f64, fluid_density: f64) -> Self {
        self.fluid_drag = fluid_drag;
        self.fluid_density = fluid_density;
        self
    }

    /// Parse and validate a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PhysicsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PhysicsError::InvalidConfig(e.to_string()))
    }

    /// Check that every parameter is usable
    pub fn validate(&self) -> Result<()> {
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(PhysicsError::InvalidConfig("gravity must be finite".into()));
        }
        let non_negative = [
            ("min_bounce_impulse", self.min_bounce_impulse),
            ("air_drag", self.air_drag),
            ("fluid_drag", self.fluid_drag),
            ("fluid_density", self.fluid_density),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PhysicsError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        if !(self.sweep_epsilon > 0.0 && self.sweep_epsilon < 0.01) {
            return Err(PhysicsError::InvalidConfig(format!(
                "sweep_epsilon must be in (0, 0.01) (got {})",
                self.sweep_epsilon
            )));
        }
        if !(self.max_timestep.is_finite() && self.max_timestep > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "max_timestep must be positive (got {})",
                self.max_timestep
            )));
        }
        if self.sleep_frames == 0 {
            return Err(PhysicsError::InvalidConfig("sleep_frames must be at least 1".into()));
        }
        if !(self.auto_step_cutoff >= 1.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "auto_step_cutoff must be at least 1 (got {})",
                self.auto_step_cutoff
            )));
        }
        Ok(())
    }
}
