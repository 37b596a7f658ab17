//! Engine and solver configuration.
//!
//! Every field has a default, so a YAML file only needs the keys it
//! overrides:
//!
//! ```yaml
//! fixed_dt: 0.016666666666666666
//! solver:
//!   iterations: 10
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{PhysicsError, Result as PhysicsResult};
use crate::types::constants;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid engine configuration")]
    Invalid(#[from] PhysicsError),
}

/// Tuning of the sequential-impulse solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Velocity iterations per step
    pub iterations: u32,
    /// Fraction of the penetration beyond `slop` removed per step
    pub baumgarte: f64,
    /// Penetration tolerated without correction (length units)
    pub slop: f64,
    /// Approach speed (units/s) below which contacts do not bounce
    pub restitution_threshold: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: constants::DEFAULT_SOLVER_ITERATIONS,
            baumgarte: constants::DEFAULT_BAUMGARTE,
            slop: constants::DEFAULT_SLOP,
            restitution_threshold: constants::DEFAULT_RESTITUTION_THRESHOLD,
        }
    }
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Step size used by [`Engine::advance`](crate::engine::Engine::advance)
    pub fixed_dt: f64,
    /// Upper bound on steps run by one `advance` call
    pub max_substeps: u32,
    /// Acceleration (units/s²) produced by a gravity component of 1.0
    pub gravity_scale: f64,
    pub solver: SolverConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_dt: constants::DEFAULT_FIXED_DT,
            max_substeps: 5,
            gravity_scale: constants::DEFAULT_GRAVITY_SCALE,
            solver: SolverConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&contents)?;
        tracing::debug!(path = %path.as_ref().display(), ?config, "loaded engine config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(self.check()?)
    }

    /// Range checks shared by [`validate`](Self::validate) and engine construction.
    pub(crate) fn check(&self) -> PhysicsResult<()> {
        let positive = |name: &str, v: f64| {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(PhysicsError::config(format!("{name} must be positive and finite, got {v}")))
            }
        };
        let non_negative = |name: &str, v: f64| {
            if v >= 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(PhysicsError::config(format!("{name} must be finite and >= 0, got {v}")))
            }
        };

        positive("fixed_dt", self.fixed_dt)?;
        positive("gravity_scale", self.gravity_scale)?;
        if self.max_substeps == 0 {
            return Err(PhysicsError::config("max_substeps must be at least 1"));
        }
        if self.solver.iterations == 0 {
            return Err(PhysicsError::config("solver.iterations must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.solver.baumgarte) {
            return Err(PhysicsError::config(format!(
                "solver.baumgarte must be in [0, 1], got {}",
                self.solver.baumgarte
            )));
        }
        non_negative("solver.slop", self.solver.slop)?;
        non_negative("solver.restitution_threshold", self.solver.restitution_threshold)
    }
}
