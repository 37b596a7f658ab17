//! Time integration for dynamic bodies.
//!
//! The engine uses semi-implicit (symplectic) Euler, split around the
//! contact solver so the solver corrects the velocity that will actually
//! move the body:
//!
//! ```text
//! 1. v  += (g + F/m) · dt          integrate_velocity   (before collision)
//!    ω  += (τ/I) · dt
//! 2. ... contact solver adjusts v, ω ...
//! 3. x  += v · dt                  integrate_position   (after collision)
//!    θ  += ω · dt
//! ```
//!
//! `dt` here is the effective step, already multiplied by the world's time
//! scale. Fixed bodies (static or frozen) are skipped entirely.
//!
//! ## Degenerate states
//!
//! A new velocity or position that is not finite is never committed. The
//! body is frozen instead (velocity zeroed, excluded from integration and
//! treated as an obstacle) and the caller receives
//! [`PhysicsError::DegenerateState`].

use crate::body::Body;
use crate::error::{PhysicsError, Result};
use crate::types::Vec2;

/// Trait for computing the accelerations acting on a body.
///
/// Implementations provide the force model (gravity, user forces, ...).
pub trait ForceModel {
    /// Linear acceleration given the body's current state.
    fn linear_acceleration(&self, body: &Body) -> Vec2;

    /// Angular acceleration. Default: accumulated torque over inertia.
    fn angular_acceleration(&self, body: &Body) -> f64 {
        body.torque() * body.inv_inertia()
    }
}

/// Semi-implicit Euler integrator.
pub struct SemiImplicitEuler;

impl SemiImplicitEuler {
    /// Velocity half of the step, including air friction damping.
    pub fn integrate_velocity<F: ForceModel>(body: &mut Body, forces: &F, dt: f64) -> Result<()> {
        if body.is_fixed() {
            return Ok(());
        }

        let accel = forces.linear_acceleration(body);
        let alpha = forces.angular_acceleration(body);
        let damping = 1.0 / (1.0 + body.air_friction() * dt);

        let velocity = (body.linear_velocity() + accel * dt) * damping;
        let angular_velocity = (body.angular_velocity() + alpha * dt) * damping;

        if !velocity.is_finite() || !angular_velocity.is_finite() {
            return Err(Self::contain(body));
        }
        body.linear_velocity = velocity;
        body.angular_velocity = angular_velocity;
        Ok(())
    }

    /// Position half of the step.
    pub fn integrate_position(body: &mut Body, dt: f64) -> Result<()> {
        if body.is_fixed() {
            return Ok(());
        }

        let position = body.position() + body.linear_velocity() * dt;
        let angle = body.angle() + body.angular_velocity() * dt;

        if !position.is_finite() || !angle.is_finite() {
            return Err(Self::contain(body));
        }
        body.position = position;
        body.angle = angle;
        Ok(())
    }

    /// Both halves back to back, for bodies outside a world.
    pub fn step<F: ForceModel>(body: &mut Body, forces: &F, dt: f64) -> Result<()> {
        Self::integrate_velocity(body, forces, dt)?;
        Self::integrate_position(body, dt)
    }

    fn contain(body: &mut Body) -> PhysicsError {
        body.freeze();
        PhysicsError::DegenerateState { id: body.id() }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{make_circle, BodyOptions};
    use approx::assert_relative_eq;

    struct ConstantGravity(Vec2);

    impl ForceModel for ConstantGravity {
        fn linear_acceleration(&self, _body: &Body) -> Vec2 {
            self.0
        }
    }

    fn ball() -> Body {
        make_circle(Vec2::ZERO, 10.0, BodyOptions::default()).unwrap()
    }

    #[test]
    fn test_free_fall_semi_implicit() {
        let mut body = ball();
        let g = ConstantGravity(Vec2::new(0.0, 1000.0));
        let dt = 0.01;
        for _ in 0..100 {
            SemiImplicitEuler::step(&mut body, &g, dt).unwrap();
        }
        // v = g·t exactly; x = g·dt²·n(n+1)/2 for the symplectic update
        assert_relative_eq!(body.linear_velocity().y, 1000.0, max_relative = 1e-12);
        assert_relative_eq!(body.position().y, 1000.0 * dt * dt * 5050.0, max_relative = 1e-12);
    }

    #[test]
    fn test_static_body_skipped() {
        let mut body = make_circle(Vec2::new(3.0, 4.0), 1.0, BodyOptions::fixed()).unwrap();
        let g = ConstantGravity(Vec2::new(0.0, 1000.0));
        SemiImplicitEuler::step(&mut body, &g, 1.0 / 60.0).unwrap();
        assert_eq!(body.position(), Vec2::new(3.0, 4.0));
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_torque_spins_body() {
        let mut body = ball();
        body.apply_torque(2.0);
        SemiImplicitEuler::step(&mut body, &ConstantGravity(Vec2::ZERO), 0.5).unwrap();
        let expected_w = 2.0 * body.inv_inertia() * 0.5;
        assert_relative_eq!(body.angular_velocity(), expected_w);
        assert_relative_eq!(body.angle(), expected_w * 0.5);
    }

    #[test]
    fn test_air_friction_damps_velocity() {
        let opts = BodyOptions::default().with_air_friction(1.0);
        let mut body = make_circle(Vec2::ZERO, 10.0, opts).unwrap();
        body.set_linear_velocity(Vec2::new(100.0, 0.0));
        SemiImplicitEuler::integrate_velocity(&mut body, &ConstantGravity(Vec2::ZERO), 0.25).unwrap();
        assert_relative_eq!(body.linear_velocity().x, 80.0);
    }

    #[test]
    fn test_zero_mass_body_is_contained() {
        let opts = BodyOptions::default().with_density(0.0);
        let mut body = make_circle(Vec2::new(5.0, 5.0), 10.0, opts).unwrap();
        let g = ConstantGravity(Vec2::new(0.0, 1000.0));

        let err = SemiImplicitEuler::step(&mut body, &g, 1.0 / 60.0).unwrap_err();
        assert!(matches!(err, PhysicsError::DegenerateState { .. }));
        assert!(body.is_degenerate());
        assert_eq!(body.position(), Vec2::new(5.0, 5.0));
        assert_eq!(body.linear_velocity(), Vec2::ZERO);

        // Frozen bodies are no longer integrated
        SemiImplicitEuler::step(&mut body, &g, 1.0 / 60.0).unwrap();
        assert_eq!(body.position(), Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_non_finite_position_not_committed() {
        let mut body = ball();
        body.set_linear_velocity(Vec2::new(f64::MAX, 0.0));
        let err = SemiImplicitEuler::integrate_position(&mut body, 10.0).unwrap_err();
        assert!(matches!(err, PhysicsError::DegenerateState { .. }));
        assert_eq!(body.position(), Vec2::ZERO);
    }
}
