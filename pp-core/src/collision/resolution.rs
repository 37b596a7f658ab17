//! Sequential-impulse contact solver.
//!
//! Each contact point is a one-sided velocity constraint along the normal
//! plus a friction constraint along the tangent. The solver sweeps all
//! points a fixed number of times, each time applying the impulse that
//! would satisfy the point on its own, and clamps the *accumulated* impulse
//! so that contacts only ever push.
//!
//! ## Per-point constraint
//!
//! ```text
//! vn = (vB + ωB × rB − vA − ωA × rA) · n        relative normal velocity
//! λ  = mₙ · (bias − vn)                        mₙ = 1 / (1/mA + 1/mB + (rA×n)²/IA + (rB×n)²/IB)
//! Λ  = max(Λ + λ, 0)                           accumulated, never pulls
//! bias = max(−e·vn₀  if −vn₀ > threshold,  β/dt · max(depth − slop, 0))
//! ```
//!
//! Friction uses the same form along `t = n⊥` with `|Λt| ≤ μ·Λn`.
//!
//! ## Combination rules
//!
//! - restitution: `e = eA · eB`
//! - friction: `μ = √(μA · μB)`
//!
//! Fixed bodies (static or frozen) contribute zero inverse mass and their
//! velocities are never written.

use smallvec::SmallVec;

use crate::body::Body;
use crate::collision::Contact;
use crate::config::SolverConfig;
use crate::types::Vec2;

/// Solver working data for one contact point.
#[derive(Debug, Clone, Copy)]
struct PointConstraint {
    ra: Vec2,
    rb: Vec2,
    normal_mass: f64,
    tangent_mass: f64,
    /// Target relative normal velocity
    bias: f64,
}

#[derive(Debug, Clone)]
struct ContactConstraint {
    index_a: usize,
    index_b: usize,
    normal: Vec2,
    tangent: Vec2,
    friction: f64,
    inv_mass_a: f64,
    inv_inertia_a: f64,
    inv_mass_b: f64,
    inv_inertia_b: f64,
    points: SmallVec<[PointConstraint; 2]>,
}

/// Iterative contact solver.
#[derive(Debug, Clone)]
pub struct ContactSolver {
    config: SolverConfig,
}

impl ContactSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Approach speed below which a contact does not bounce.
    ///
    /// Never lower than the speed gravity adds over two steps, so a body
    /// resting on another does not re-bounce off its own weight.
    pub fn restitution_threshold(&self, gravity: Vec2, dt: f64) -> f64 {
        self.config
            .restitution_threshold
            .max(2.0 * gravity.magnitude() * dt)
    }

    /// Resolves `contacts` in place, updating body velocities.
    ///
    /// `gravity` is the effective acceleration applied this step and `dt`
    /// the effective (time-scaled) step size. Accumulated impulses are
    /// written back into each contact point.
    pub fn solve(&self, bodies: &mut [Body], contacts: &mut [Contact], gravity: Vec2, dt: f64) {
        if contacts.is_empty() || dt <= 0.0 {
            return;
        }
        let threshold = self.restitution_threshold(gravity, dt);
        let mut constraints: Vec<ContactConstraint> = contacts
            .iter()
            .map(|c| self.prepare(bodies, c, threshold, dt))
            .collect();

        for _ in 0..self.config.iterations {
            for (constraint, contact) in constraints.iter_mut().zip(contacts.iter_mut()) {
                solve_contact(bodies, constraint, contact);
            }
        }
    }

    fn prepare(&self, bodies: &[Body], contact: &Contact, threshold: f64, dt: f64) -> ContactConstraint {
        let a = &bodies[contact.index_a];
        let b = &bodies[contact.index_b];
        let normal = contact.normal;
        let tangent = normal.perp();

        let inv_mass_a = a.effective_inv_mass();
        let inv_inertia_a = a.effective_inv_inertia();
        let inv_mass_b = b.effective_inv_mass();
        let inv_inertia_b = b.effective_inv_inertia();

        let restitution = a.restitution() * b.restitution();
        let friction = (a.friction() * b.friction()).sqrt();

        let effective_mass = |ra: Vec2, rb: Vec2, axis: Vec2| {
            let rna = ra.cross(&axis);
            let rnb = rb.cross(&axis);
            let k = inv_mass_a + inv_mass_b + inv_inertia_a * rna * rna + inv_inertia_b * rnb * rnb;
            if k > 0.0 && k.is_finite() {
                1.0 / k
            } else {
                0.0
            }
        };

        let points = contact
            .points
            .iter()
            .map(|p| {
                let ra = p.position - a.position();
                let rb = p.position - b.position();
                let vn = (b.velocity_at(p.position) - a.velocity_at(p.position)).dot(&normal);

                let bounce = if -vn > threshold { -restitution * vn } else { 0.0 };
                let correction = self.config.baumgarte / dt * (p.depth - self.config.slop).max(0.0);

                PointConstraint {
                    ra,
                    rb,
                    normal_mass: effective_mass(ra, rb, normal),
                    tangent_mass: effective_mass(ra, rb, tangent),
                    bias: bounce.max(correction),
                }
            })
            .collect();

        ContactConstraint {
            index_a: contact.index_a,
            index_b: contact.index_b,
            normal,
            tangent,
            friction,
            inv_mass_a,
            inv_inertia_a,
            inv_mass_b,
            inv_inertia_b,
            points,
        }
    }
}

impl Default for ContactSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

fn solve_contact(bodies: &mut [Body], cc: &ContactConstraint, contact: &mut Contact) {
    let Some((a, b)) = pair_mut(bodies, cc.index_a, cc.index_b) else {
        return;
    };

    for (pc, point) in cc.points.iter().zip(contact.points.iter_mut()) {
        // Normal first so friction sees this iteration's normal impulse.
        let dv = relative_velocity(a, b, pc);
        let vn = dv.dot(&cc.normal);
        let lambda = pc.normal_mass * (pc.bias - vn);
        let accumulated = (point.normal_impulse + lambda).max(0.0);
        let applied = accumulated - point.normal_impulse;
        point.normal_impulse = accumulated;
        apply(a, b, cc, pc, cc.normal * applied);

        let dv = relative_velocity(a, b, pc);
        let vt = dv.dot(&cc.tangent);
        let lambda = -pc.tangent_mass * vt;
        let max_friction = cc.friction * point.normal_impulse;
        let accumulated = (point.tangent_impulse + lambda).clamp(-max_friction, max_friction);
        let applied = accumulated - point.tangent_impulse;
        point.tangent_impulse = accumulated;
        apply(a, b, cc, pc, cc.tangent * applied);
    }
}

fn relative_velocity(a: &Body, b: &Body, pc: &PointConstraint) -> Vec2 {
    let va = a.linear_velocity + Vec2::cross_scalar(a.angular_velocity, &pc.ra);
    let vb = b.linear_velocity + Vec2::cross_scalar(b.angular_velocity, &pc.rb);
    vb - va
}

/// Applies `impulse` to B and its opposite to A.
fn apply(a: &mut Body, b: &mut Body, cc: &ContactConstraint, pc: &PointConstraint, impulse: Vec2) {
    if !a.is_fixed() {
        a.linear_velocity -= impulse * cc.inv_mass_a;
        a.angular_velocity -= cc.inv_inertia_a * pc.ra.cross(&impulse);
    }
    if !b.is_fixed() {
        b.linear_velocity += impulse * cc.inv_mass_b;
        b.angular_velocity += cc.inv_inertia_b * pc.rb.cross(&impulse);
    }
}

/// Two distinct mutable bodies, `i < k`.
fn pair_mut(bodies: &mut [Body], i: usize, k: usize) -> Option<(&mut Body, &mut Body)> {
    if i >= k || k >= bodies.len() {
        return None;
    }
    let (head, tail) = bodies.split_at_mut(k);
    Some((&mut head[i], &mut tail[0]))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{make_circle, make_rectangle, BodyOptions};
    use crate::collision::collide;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;

    fn solve_pair(bodies: &mut [Body], gravity: Vec2) -> Contact {
        let mut contacts = vec![collide(0, &bodies[0], 1, &bodies[1]).expect("bodies should touch")];
        ContactSolver::default().solve(bodies, &mut contacts, gravity, DT);
        contacts.remove(0)
    }

    #[test]
    fn test_elastic_head_on_circles_swap_velocities() {
        let opts = BodyOptions::default().with_restitution(1.0).with_friction(0.0);
        let mut a = make_circle(Vec2::new(0.0, 0.0), 1.0, opts).unwrap();
        let mut b = make_circle(Vec2::new(1.9, 0.0), 1.0, opts).unwrap();
        a.linear_velocity = Vec2::new(10.0, 0.0);
        b.linear_velocity = Vec2::new(-10.0, 0.0);
        let mut bodies = vec![a, b];

        let before = bodies[0].momentum() + bodies[1].momentum();
        let contact = solve_pair(&mut bodies, Vec2::ZERO);
        let after = bodies[0].momentum() + bodies[1].momentum();

        assert_relative_eq!(bodies[0].linear_velocity().x, -10.0, epsilon = 1e-9);
        assert_relative_eq!(bodies[1].linear_velocity().x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(before.x, after.x, epsilon = 1e-12);
        assert_relative_eq!(before.y, after.y, epsilon = 1e-12);
        assert!(contact.total_normal_impulse() > 0.0);
    }

    #[test]
    fn test_static_body_velocity_untouched() {
        let floor = make_rectangle(Vec2::new(0.0, 10.0), 100.0, 20.0, BodyOptions::fixed()).unwrap();
        let opts = BodyOptions::default().with_restitution(0.0);
        let mut ball = make_circle(Vec2::new(0.0, -0.8), 1.0, opts).unwrap();
        ball.linear_velocity = Vec2::new(0.0, 30.0);
        let mut bodies = vec![floor, ball];

        solve_pair(&mut bodies, Vec2::new(0.0, 1000.0));

        assert_eq!(bodies[0].linear_velocity(), Vec2::ZERO);
        assert_eq!(bodies[0].angular_velocity(), 0.0);
        // Inelastic: approach velocity removed, no correction since depth < slop
        assert_relative_eq!(bodies[1].linear_velocity().y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slow_approach_does_not_bounce() {
        let floor = make_rectangle(Vec2::new(0.0, 10.0), 100.0, 20.0, BodyOptions::fixed()).unwrap();
        let mut ball = make_circle(Vec2::new(0.0, -0.8), 1.0, BodyOptions::default()).unwrap();
        // Less than 2·g·dt with g = 1000
        ball.linear_velocity = Vec2::new(0.0, 20.0);
        let mut bodies = vec![floor, ball];

        solve_pair(&mut bodies, Vec2::new(0.0, 1000.0));
        assert_relative_eq!(bodies[1].linear_velocity().y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_deep_penetration_pushes_apart() {
        let floor = make_rectangle(Vec2::new(0.0, 10.0), 100.0, 20.0, BodyOptions::fixed()).unwrap();
        let ball = make_circle(Vec2::new(0.0, 0.0), 3.0, BodyOptions::default()).unwrap();
        let mut bodies = vec![floor, ball];

        // Depth 3 beyond a slop of 0.5: bias = 0.2 · 60 · 2.5 = 30 away from the floor
        solve_pair(&mut bodies, Vec2::ZERO);
        assert_relative_eq!(bodies[1].linear_velocity().y, -30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_separating_contact_gets_no_impulse() {
        let mut a = make_circle(Vec2::new(0.0, 0.0), 1.0, BodyOptions::default()).unwrap();
        let mut b = make_circle(Vec2::new(1.9, 0.0), 1.0, BodyOptions::default()).unwrap();
        a.linear_velocity = Vec2::new(-5.0, 0.0);
        b.linear_velocity = Vec2::new(5.0, 0.0);
        let mut bodies = vec![a, b];

        let contact = solve_pair(&mut bodies, Vec2::ZERO);
        assert_eq!(contact.total_normal_impulse(), 0.0);
        assert_eq!(bodies[0].linear_velocity(), Vec2::new(-5.0, 0.0));
    }

    #[test]
    fn test_friction_bounded_by_coulomb_cone() {
        let floor = make_rectangle(Vec2::new(0.0, 10.0), 100.0, 20.0, BodyOptions::fixed()).unwrap();
        let opts = BodyOptions::default().with_restitution(0.0).with_friction(0.5);
        let mut crate_box = make_rectangle(Vec2::new(0.0, -4.9), 10.0, 10.0, opts).unwrap();
        crate_box.linear_velocity = Vec2::new(200.0, 30.0);
        let mut bodies = vec![floor, crate_box];

        let contact = solve_pair(&mut bodies, Vec2::new(0.0, 1000.0));
        let mu = (0.5_f64 * 0.1).sqrt();
        for p in &contact.points {
            assert!(p.normal_impulse >= 0.0);
            assert!(p.tangent_impulse.abs() <= mu * p.normal_impulse + 1e-12);
        }
        // Friction slows the slide without reversing it
        let vx = bodies[1].linear_velocity().x;
        assert!(vx > 0.0 && vx < 200.0);
    }

    #[test]
    fn test_frozen_body_acts_as_fixed() {
        let mut a = make_circle(Vec2::new(0.0, 0.0), 1.0, BodyOptions::default()).unwrap();
        let mut b = make_circle(Vec2::new(1.9, 0.0), 1.0, BodyOptions::default()).unwrap();
        a.freeze();
        b.linear_velocity = Vec2::new(-10.0, 0.0);
        let mut bodies = vec![a, b];

        solve_pair(&mut bodies, Vec2::ZERO);
        assert_eq!(bodies[0].linear_velocity(), Vec2::ZERO);
        // e = 0.64 against an immovable body
        assert_relative_eq!(bodies[1].linear_velocity().x, 6.4, epsilon = 1e-9);
    }

    #[test]
    fn test_threshold_scales_with_gravity() {
        let solver = ContactSolver::default();
        assert_eq!(solver.restitution_threshold(Vec2::ZERO, DT), 1.0);
        assert_relative_eq!(solver.restitution_threshold(Vec2::new(0.0, 1000.0), DT), 2000.0 * DT);
    }
}
