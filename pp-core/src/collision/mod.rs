//! Collision detection and resolution.
//!
//! Each step runs three stages over the live bodies:
//! - **Broad-phase** (`broadphase`): sort-and-sweep over bounding boxes,
//!   yielding candidate pairs in deterministic order
//! - **Narrow-phase** (`narrowphase`): exact shape tests producing contacts
//! - **Resolution** (`resolution`): sequential impulses with friction and
//!   Baumgarte position correction
//!
//! Contacts are transient: they are rebuilt every step and never persisted.

pub mod broadphase;
pub mod narrowphase;
pub mod resolution;

pub use broadphase::{sweep_and_prune, Aabb, Proxy};
pub use narrowphase::{collide, collide_shapes, Manifold, ManifoldPoint, Placement};
pub use resolution::ContactSolver;

use smallvec::SmallVec;

use crate::types::{BodyId, Vec2};

/// A touching or overlapping pair of bodies.
///
/// `body_a` always has the lower id and `normal` points from `body_a` toward
/// `body_b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub normal: Vec2,
    /// Deepest penetration over the contact points (>= 0).
    pub depth: f64,
    pub points: SmallVec<[ContactPoint; 2]>,
    pub(crate) index_a: usize,
    pub(crate) index_b: usize,
}

/// One contact point with the solver's accumulated impulses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub position: Vec2,
    pub depth: f64,
    pub normal_impulse: f64,
    pub tangent_impulse: f64,
}

impl Contact {
    /// Sorted id pair, used to key collision events.
    pub fn pair(&self) -> (BodyId, BodyId) {
        (self.body_a, self.body_b)
    }

    /// Sum of the accumulated normal impulses over all points.
    pub fn total_normal_impulse(&self) -> f64 {
        self.points.iter().map(|p| p.normal_impulse).sum()
    }
}
