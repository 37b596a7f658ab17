//! The body container and its global parameters.
//!
//! Structural mutations (`add_body`, `remove_body`, `clear`) never touch the
//! live body list directly. They are queued and applied, in the order they
//! were issued, by [`World::commit_pending`], which the engine calls at the
//! start of every step:
//!
//! ```text
//!  add_body ─┐
//!  remove ───┼──► pending queue ──(step start)──► bodies [id order]
//!  clear ────┘
//! ```
//!
//! Ids are handed out when a body is enqueued and grow monotonically, so the
//! live list stays sorted by id and iteration order equals insertion order.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::body::{Body, ShapeSpec};
use crate::error::{ensure_finite, PhysicsError, Result};
use crate::types::{constants, BodyId, ShapeKind, Vec2};

/// Read-only transform of one body, for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub kind: ShapeKind,
    pub position: Vec2,
    pub angle: f64,
}

/// Outcome of applying the pending queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone)]
enum Mutation {
    Add(Box<Body>),
    Remove(BodyId),
    Clear { keep_statics: bool },
}

/// Owns the simulated bodies, gravity and time scale.
#[derive(Debug, Clone)]
pub struct World {
    bodies: Vec<Body>,
    pending: Vec<Mutation>,
    next_id: u64,
    gravity: Vec2,
    time_scale: f64,
}

impl Default for World {
    fn default() -> Self {
        Self {
            bodies: Vec::new(),
            pending: Vec::new(),
            next_id: 1,
            gravity: Vec2::new(0.0, constants::DEFAULT_GRAVITY_Y),
            time_scale: 1.0,
        }
    }
}

impl World {
    /// Empty world with the given gravity and time scale.
    pub fn new(gravity: Vec2, time_scale: f64) -> Result<Self> {
        let mut world = Self::default();
        world.set_gravity(gravity)?;
        world.set_time_scale(time_scale)?;
        Ok(world)
    }

    // ===== Global parameters =====

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Accepts any finite vector. Range policies belong to the caller.
    pub fn set_gravity(&mut self, gravity: Vec2) -> Result<()> {
        ensure_finite("gravity.x", gravity.x)?;
        ensure_finite("gravity.y", gravity.y)?;
        self.gravity = gravity;
        Ok(())
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Accepts any finite, non-negative scale. Zero freezes time.
    pub fn set_time_scale(&mut self, time_scale: f64) -> Result<()> {
        ensure_finite("time scale", time_scale)?;
        if time_scale < 0.0 {
            return Err(PhysicsError::config(format!(
                "time scale must be >= 0, got {time_scale}"
            )));
        }
        self.time_scale = time_scale;
        Ok(())
    }

    // ===== Structural mutations =====

    /// Enqueues `body` and returns the id it will carry.
    pub fn add_body(&mut self, mut body: Body) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        body.id = id;
        debug!(%id, kind = %body.kind(), is_static = body.is_static(), "body queued");
        self.pending.push(Mutation::Add(Box::new(body)));
        id
    }

    /// Builds a body from `spec` and enqueues it.
    ///
    /// A factory failure leaves the world untouched, id counter included.
    pub fn spawn(&mut self, spec: &ShapeSpec) -> Result<BodyId> {
        let body = spec.build()?;
        Ok(self.add_body(body))
    }

    /// Enqueues removal of a live or queued body.
    pub fn remove_body(&mut self, id: BodyId) -> Result<()> {
        if !self.contains(id) {
            warn!(%id, "remove_body: unknown body");
            return Err(PhysicsError::NotFound(id));
        }
        self.pending.push(Mutation::Remove(id));
        Ok(())
    }

    /// Enqueues removal of every body, or of every dynamic body when
    /// `keep_statics` is set.
    pub fn clear(&mut self, keep_statics: bool) {
        debug!(keep_statics, "clear queued");
        self.pending.push(Mutation::Clear { keep_statics });
    }

    /// Applies every queued mutation in issue order.
    pub fn commit_pending(&mut self) -> CommitSummary {
        let mut summary = CommitSummary::default();
        if self.pending.is_empty() {
            return summary;
        }

        for mutation in std::mem::take(&mut self.pending) {
            match mutation {
                Mutation::Add(body) => {
                    self.bodies.push(*body);
                    summary.added += 1;
                }
                Mutation::Remove(id) => {
                    // Already gone when a clear ran in between
                    if let Ok(idx) = self.search(id) {
                        self.bodies.remove(idx);
                        summary.removed += 1;
                    }
                }
                Mutation::Clear { keep_statics } => {
                    let before = self.bodies.len();
                    self.bodies.retain(|b| keep_statics && b.is_static());
                    summary.removed += before - self.bodies.len();
                }
            }
        }

        debug!(
            added = summary.added,
            removed = summary.removed,
            bodies = self.bodies.len(),
            "pending mutations applied"
        );
        summary
    }

    // ===== Queries =====

    /// Ordered snapshot of every live body.
    pub fn query_state(&self) -> Vec<BodySnapshot> {
        self.bodies
            .iter()
            .map(|b| BodySnapshot {
                id: b.id(),
                kind: b.kind(),
                position: b.position(),
                angle: b.angle(),
            })
            .collect()
    }

    /// Live bodies in id order.
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.search(id).ok().map(|idx| &self.bodies[idx])
    }

    /// True if `id` is live or waiting in the queue.
    pub fn contains(&self, id: BodyId) -> bool {
        self.search(id).is_ok() || self.queued(id).is_some()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn static_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_static()).count()
    }

    pub fn dynamic_count(&self) -> usize {
        self.body_count() - self.static_count()
    }

    /// Number of queued mutations.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ===== Per-body control =====
    //
    // These act on live bodies and on bodies still waiting in the queue.
    // Writes to static bodies are ignored.

    pub fn apply_force(&mut self, id: BodyId, force: Vec2) -> Result<()> {
        ensure_vec("force", force)?;
        self.body_mut(id)?.apply_force(force);
        Ok(())
    }

    pub fn apply_torque(&mut self, id: BodyId, torque: f64) -> Result<()> {
        ensure_finite("torque", torque)?;
        self.body_mut(id)?.apply_torque(torque);
        Ok(())
    }

    /// Impulse applied at world position `point`.
    pub fn apply_impulse(&mut self, id: BodyId, impulse: Vec2, point: Vec2) -> Result<()> {
        ensure_vec("impulse", impulse)?;
        ensure_vec("impulse point", point)?;
        self.body_mut(id)?.apply_impulse(impulse, point);
        Ok(())
    }

    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec2) -> Result<()> {
        ensure_vec("velocity", velocity)?;
        self.body_mut(id)?.set_linear_velocity(velocity);
        Ok(())
    }

    pub fn set_angular_velocity(&mut self, id: BodyId, angular_velocity: f64) -> Result<()> {
        ensure_finite("angular velocity", angular_velocity)?;
        self.body_mut(id)?.set_angular_velocity(angular_velocity);
        Ok(())
    }

    /// Clears the degenerate condition so the body is integrated again.
    pub fn reset_body(&mut self, id: BodyId) -> Result<()> {
        let body = self.body_mut(id)?;
        if body.is_degenerate() {
            body.unfreeze();
            debug!(%id, "degenerate body reset");
        }
        Ok(())
    }

    pub(crate) fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut Body> {
        if let Ok(idx) = self.search(id) {
            return Ok(&mut self.bodies[idx]);
        }
        let idx = self.queued(id).ok_or(PhysicsError::NotFound(id))?;
        match &mut self.pending[idx] {
            Mutation::Add(body) => Ok(body.as_mut()),
            _ => Err(PhysicsError::NotFound(id)),
        }
    }

    fn search(&self, id: BodyId) -> std::result::Result<usize, usize> {
        self.bodies.binary_search_by_key(&id, |b| b.id())
    }

    fn queued(&self, id: BodyId) -> Option<usize> {
        self.pending
            .iter()
            .position(|m| matches!(m, Mutation::Add(body) if body.id() == id))
    }
}

fn ensure_vec(name: &str, v: Vec2) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::config(format!("{name} must be finite, got {v}")))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{make_circle, make_rectangle, BodyOptions};

    fn circle_at(x: f64, y: f64) -> Body {
        make_circle(Vec2::new(x, y), 10.0, BodyOptions::default()).unwrap()
    }

    #[test]
    fn test_add_is_deferred_until_commit() {
        let mut world = World::default();
        let id = world.add_body(circle_at(0.0, 0.0));
        assert_eq!(id, BodyId(1));
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.pending_count(), 1);
        assert!(world.contains(id));

        let summary = world.commit_pending();
        assert_eq!(summary, CommitSummary { added: 1, removed: 0 });
        assert_eq!(world.body(id).unwrap().id(), id);
        assert_eq!(world.pending_count(), 0);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut world = World::default();
        let a = world.add_body(circle_at(0.0, 0.0));
        world.commit_pending();
        world.remove_body(a).unwrap();
        world.commit_pending();
        let b = world.add_body(circle_at(0.0, 0.0));
        assert!(b > a);
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut world = World::default();
        let ids: Vec<_> = (0..5).map(|i| world.add_body(circle_at(100.0 - i as f64, 0.0))).collect();
        world.commit_pending();
        world.remove_body(ids[2]).unwrap();
        world.commit_pending();
        let order: Vec<_> = world.query_state().iter().map(|s| s.id).collect();
        assert_eq!(order, vec![ids[0], ids[1], ids[3], ids[4]]);
    }

    #[test]
    fn test_remove_unknown_body_is_not_found() {
        let mut world = World::default();
        world.add_body(circle_at(0.0, 0.0));
        world.commit_pending();
        assert_eq!(world.remove_body(BodyId(42)), Err(PhysicsError::NotFound(BodyId(42))));
        assert_eq!(world.pending_count(), 0);
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_remove_of_queued_body_cancels_it() {
        let mut world = World::default();
        let id = world.add_body(circle_at(0.0, 0.0));
        world.remove_body(id).unwrap();
        assert_eq!(world.commit_pending(), CommitSummary { added: 1, removed: 1 });
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_clear_keeps_statics_on_request() {
        let mut world = World::default();
        world.add_body(make_rectangle(Vec2::ZERO, 10.0, 10.0, BodyOptions::fixed()).unwrap());
        world.add_body(circle_at(0.0, 0.0));
        world.add_body(circle_at(5.0, 0.0));
        world.commit_pending();

        world.clear(true);
        world.commit_pending();
        assert_eq!(world.static_count(), 1);
        assert_eq!(world.dynamic_count(), 0);

        world.clear(false);
        world.commit_pending();
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_mutations_apply_in_issue_order() {
        let mut world = World::default();
        world.add_body(circle_at(0.0, 0.0));
        world.clear(false);
        let survivor = world.add_body(circle_at(1.0, 0.0));
        world.commit_pending();
        assert_eq!(world.body_count(), 1);
        assert!(world.body(survivor).is_some());
    }

    #[test]
    fn test_spawn_failure_leaves_world_unchanged() {
        let mut world = World::default();
        let err = world.spawn(&ShapeSpec::circle(Vec2::ZERO, -5.0)).unwrap_err();
        assert!(matches!(err, PhysicsError::Configuration(_)));
        assert_eq!(world.pending_count(), 0);
        // The failed spawn did not consume an id
        assert_eq!(world.add_body(circle_at(0.0, 0.0)), BodyId(1));
    }

    #[test]
    fn test_gravity_and_time_scale_validation() {
        let mut world = World::default();
        assert!(world.set_gravity(Vec2::new(0.0, -7.5)).is_ok());
        assert_eq!(world.gravity(), Vec2::new(0.0, -7.5));
        assert!(world.set_gravity(Vec2::new(f64::NAN, 0.0)).is_err());
        assert_eq!(world.gravity(), Vec2::new(0.0, -7.5));

        assert!(world.set_time_scale(0.0).is_ok());
        assert!(world.set_time_scale(5.0).is_ok());
        assert!(world.set_time_scale(-0.5).is_err());
        assert!(world.set_time_scale(f64::INFINITY).is_err());
        assert_eq!(world.time_scale(), 5.0);
    }

    #[test]
    fn test_control_surface() {
        let mut world = World::default();
        let id = world.add_body(circle_at(0.0, 0.0));
        // Works on a queued body
        world.set_velocity(id, Vec2::new(3.0, 0.0)).unwrap();
        world.commit_pending();
        assert_eq!(world.body(id).unwrap().linear_velocity(), Vec2::new(3.0, 0.0));

        world.apply_force(id, Vec2::new(1.0, 2.0)).unwrap();
        assert_eq!(world.body(id).unwrap().force(), Vec2::new(1.0, 2.0));
        assert!(world.apply_force(id, Vec2::new(f64::NAN, 0.0)).is_err());
        assert_eq!(world.apply_torque(BodyId(99), 1.0), Err(PhysicsError::NotFound(BodyId(99))));
    }

    #[test]
    fn test_reset_body_unfreezes() {
        let mut world = World::default();
        let id = world.add_body(circle_at(0.0, 0.0));
        world.commit_pending();
        world.bodies_mut()[0].freeze();
        assert!(world.body(id).unwrap().is_degenerate());
        world.reset_body(id).unwrap();
        assert!(!world.body(id).unwrap().is_degenerate());
    }
}
