//! Core types for the physics simulation.
//!
//! Units follow the playground canvas:
//! - Position: canvas units (pixels), x to the right, y pointing **down**
//! - Velocity: units per second
//! - Angle: radians, angular velocity in rad/s
//! - Time: seconds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Vec2 - 2D Vector
// =============================================================================

/// A 2D vector used for positions, velocities, forces and contact normals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared magnitude (avoids sqrt for comparisons)
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Magnitude (length) of the vector
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Unit vector in the same direction. Only the zero vector maps to zero,
    /// however short the input.
    pub fn normalized(&self) -> Self {
        let mag = self.magnitude();
        if mag > 0.0 {
            *self / mag
        } else {
            Self::ZERO
        }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Scalar (z component of the) cross product.
    pub fn cross(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Cross product of a scalar angular velocity with this vector: `w × r`.
    pub fn cross_scalar(w: f64, r: &Self) -> Self {
        Self::new(-w * r.y, w * r.x)
    }

    /// Perpendicular vector, rotated +90° in math orientation.
    pub fn perp(&self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Rotate by `angle` radians.
    pub fn rotate(&self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(c * self.x - s * self.y, s * self.x + c * self.y)
    }

    pub fn distance(&self, other: &Self) -> f64 {
        (*other - *self).magnitude()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn min(&self, other: &Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(&self, other: &Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl Div<f64> for Vec2 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self::new(self.x / scalar, self.y / scalar)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Stable body identifier. Assigned by the [`World`](crate::world::World) when a
/// body is enqueued and never reused, so ordering by id equals insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u64);

impl BodyId {
    /// Placeholder carried by bodies that have not been added to a world yet.
    pub const UNASSIGNED: BodyId = BodyId(0);
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyId({})", self.0)
    }
}

/// Shape tag exposed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Circle,
    Polygon,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Circle => write!(f, "circle"),
            ShapeKind::Polygon => write!(f, "polygon"),
        }
    }
}

// =============================================================================
// Physical Constants
// =============================================================================

/// Constants and playground defaults used across the engine.
pub mod constants {
    /// Default gravity in playground units; scaled by `EngineConfig::gravity_scale`.
    pub const DEFAULT_GRAVITY_Y: f64 = 1.0;

    /// Units/s² produced by a gravity of 1.0
    pub const DEFAULT_GRAVITY_SCALE: f64 = 1000.0;

    /// Mass per unit area
    pub const DEFAULT_DENSITY: f64 = 0.001;

    pub const DEFAULT_RESTITUTION: f64 = 0.8;

    pub const DEFAULT_FRICTION: f64 = 0.1;

    pub const DEFAULT_FIXED_DT: f64 = 1.0 / 60.0;

    pub const DEFAULT_SOLVER_ITERATIONS: u32 = 8;

    /// Fraction of penetration (beyond slop) corrected per step
    pub const DEFAULT_BAUMGARTE: f64 = 0.2;

    /// Penetration allowed without positional correction (canvas units)
    pub const DEFAULT_SLOP: f64 = 0.5;

    /// Minimum approach speed (units/s) for restitution to apply
    pub const DEFAULT_RESTITUTION_THRESHOLD: f64 = 1.0;

    /// Small value for floating-point comparisons
    pub const EPSILON: f64 = 1e-10;
}

// =============================================================================
// Tests
// =============================================================================
