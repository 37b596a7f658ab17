//! Forces acting on playground bodies.
//!
//! The playground model is deliberately small:
//!
//! - **Gravity**: uniform acceleration, the same for every dynamic body
//!   regardless of mass
//! - **Applied forces**: whatever was accumulated on the body through
//!   `World::apply_force` / `World::apply_torque` since the last step
//!
//! ```text
//! a = g · gravity_scale + F / m
//! α = τ / I
//! ```

use crate::body::Body;
use crate::integrator::ForceModel;
use crate::types::Vec2;

/// Gravity plus the body's accumulated forces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaygroundForces {
    /// Gravitational acceleration in units/s², already scaled
    pub gravity: Vec2,

    /// Enable/disable individual forces (useful for testing)
    pub enable_gravity: bool,
    pub enable_applied: bool,
}

impl PlaygroundForces {
    /// Force model for a world gravity expressed in playground units.
    pub fn new(gravity: Vec2, gravity_scale: f64) -> Self {
        Self {
            gravity: gravity * gravity_scale,
            enable_gravity: true,
            enable_applied: true,
        }
    }

    /// Only the accumulated forces and torques.
    pub fn applied_only() -> Self {
        Self {
            gravity: Vec2::ZERO,
            enable_gravity: false,
            enable_applied: true,
        }
    }

    /// Gravity as the integrator will apply it.
    pub fn effective_gravity(&self) -> Vec2 {
        if self.enable_gravity {
            self.gravity
        } else {
            Vec2::ZERO
        }
    }
}

impl ForceModel for PlaygroundForces {
    fn linear_acceleration(&self, body: &Body) -> Vec2 {
        let mut accel = self.effective_gravity();
        if self.enable_applied {
            accel += body.force() * body.inv_mass();
        }
        accel
    }

    fn angular_acceleration(&self, body: &Body) -> f64 {
        if self.enable_applied {
            body.torque() * body.inv_inertia()
        } else {
            0.0
        }
    }
}
