//! Rigid bodies and the shape factories that create them.
//!
//! A [`Body`] is built by one of the factories ([`make_circle`],
//! [`make_rectangle`], [`make_polygon`] or a [`ShapeSpec`]) and then handed
//! to a [`World`](crate::world::World), which assigns its id and owns it from
//! then on.
//!
//! ## Mass model
//!
//! ```text
//! circle     m = ρ·π·r²        I = ½·m·r²
//! rectangle  m = ρ·w·h         I = m·(w² + h²)/12
//! polygon    m = ρ·area        I = triangle fan about the centroid
//! ```
//!
//! Static bodies keep their computed mass and inertia for reporting, but
//! `inv_mass` and `inv_inertia` are forced to zero.

use serde::{Deserialize, Serialize};

use crate::collision::Aabb;
use crate::error::{ensure_finite, PhysicsError, Result};
use crate::materials::Material;
use crate::shape::{Polygon, Shape};
use crate::types::{constants, BodyId, ShapeKind, Vec2};

// =============================================================================
// Body Options
// =============================================================================

/// Options accepted by the shape factories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyOptions {
    pub is_static: bool,
    /// Bounciness in [0, 1]
    pub restitution: f64,
    /// Coulomb friction coefficient (>= 0)
    pub friction: f64,
    /// Mass per unit area (>= 0)
    pub density: f64,
    /// Velocity damping per second (>= 0)
    pub air_friction: f64,
    /// Initial rotation in radians
    pub angle: f64,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            is_static: false,
            restitution: constants::DEFAULT_RESTITUTION,
            friction: constants::DEFAULT_FRICTION,
            density: constants::DEFAULT_DENSITY,
            air_friction: 0.0,
            angle: 0.0,
        }
    }
}

impl BodyOptions {
    /// Default options for an immovable body.
    pub fn fixed() -> Self {
        Self {
            is_static: true,
            ..Self::default()
        }
    }

    /// Options taking their coefficients from a material preset.
    pub fn from_material(material: &Material) -> Self {
        Self {
            restitution: material.restitution,
            friction: material.friction,
            density: material.density,
            air_friction: material.air_friction,
            ..Self::default()
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_air_friction(mut self, air_friction: f64) -> Self {
        self.air_friction = air_friction;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Rejects coefficients outside their physical range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(PhysicsError::config(format!(
                "restitution must be in [0, 1], got {}",
                self.restitution
            )));
        }
        if !(self.friction >= 0.0 && self.friction.is_finite()) {
            return Err(PhysicsError::config(format!(
                "friction must be finite and >= 0, got {}",
                self.friction
            )));
        }
        if !(self.density >= 0.0 && self.density.is_finite()) {
            return Err(PhysicsError::config(format!(
                "density must be finite and >= 0, got {}",
                self.density
            )));
        }
        if !(self.air_friction >= 0.0 && self.air_friction.is_finite()) {
            return Err(PhysicsError::config(format!(
                "air friction must be finite and >= 0, got {}",
                self.air_friction
            )));
        }
        ensure_finite("angle", self.angle)
    }
}

// =============================================================================
// Body
// =============================================================================

/// One simulated rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub(crate) id: BodyId,
    pub(crate) shape: Shape,
    pub(crate) position: Vec2,
    pub(crate) angle: f64,
    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f64,
    pub(crate) mass: f64,
    pub(crate) inv_mass: f64,
    pub(crate) inertia: f64,
    pub(crate) inv_inertia: f64,
    pub(crate) restitution: f64,
    pub(crate) friction: f64,
    pub(crate) air_friction: f64,
    pub(crate) is_static: bool,
    pub(crate) degenerate: bool,
    /// Force accumulated since the last step
    pub(crate) force: Vec2,
    /// Torque accumulated since the last step
    pub(crate) torque: f64,
}

impl Body {
    fn new(shape: Shape, position: Vec2, opts: &BodyOptions) -> Result<Self> {
        opts.validate()?;
        if !position.is_finite() {
            return Err(PhysicsError::config(format!(
                "body position must be finite, got {position}"
            )));
        }

        let props = shape.mass_properties(opts.density);
        let (inv_mass, inv_inertia) = if opts.is_static {
            (0.0, 0.0)
        } else {
            // A zero mass yields an infinite reciprocal; the integrator
            // contains the resulting non-finite state.
            (props.mass.recip(), props.inertia.recip())
        };

        Ok(Self {
            id: BodyId::UNASSIGNED,
            shape,
            position,
            angle: opts.angle,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: props.mass,
            inv_mass,
            inertia: props.inertia,
            inv_inertia,
            restitution: opts.restitution,
            friction: opts.friction,
            air_friction: opts.air_friction,
            is_static: opts.is_static,
            degenerate: false,
            force: Vec2::ZERO,
            torque: 0.0,
        })
    }

    // ===== Accessors =====

    /// Id assigned by the world; [`BodyId::UNASSIGNED`] before insertion.
    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn inv_inertia(&self) -> f64 {
        self.inv_inertia
    }

    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    pub fn air_friction(&self) -> f64 {
        self.air_friction
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// True once a non-finite state froze the body.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Static or frozen: behaves as an infinite-mass obstacle.
    pub fn is_fixed(&self) -> bool {
        self.is_static || self.degenerate
    }

    pub fn force(&self) -> Vec2 {
        self.force
    }

    pub fn torque(&self) -> f64 {
        self.torque
    }

    /// Inverse mass as seen by the solver.
    pub(crate) fn effective_inv_mass(&self) -> f64 {
        if self.is_fixed() {
            0.0
        } else {
            self.inv_mass
        }
    }

    pub(crate) fn effective_inv_inertia(&self) -> f64 {
        if self.is_fixed() {
            0.0
        } else {
            self.inv_inertia
        }
    }

    pub fn aabb(&self) -> Aabb {
        self.shape.aabb(self.position, self.angle)
    }

    /// Polygon vertices in world space; empty for circles.
    pub fn world_vertices(&self) -> Vec<Vec2> {
        match &self.shape {
            Shape::Circle { .. } => Vec::new(),
            Shape::Polygon(poly) => poly
                .vertices()
                .iter()
                .map(|v| self.position + v.rotate(self.angle))
                .collect(),
        }
    }

    /// Velocity of the material point at world position `point`.
    pub fn velocity_at(&self, point: Vec2) -> Vec2 {
        self.linear_velocity + Vec2::cross_scalar(self.angular_velocity, &(point - self.position))
    }

    pub fn momentum(&self) -> Vec2 {
        self.linear_velocity * self.mass
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.linear_velocity.magnitude_squared()
            + 0.5 * self.inertia * self.angular_velocity * self.angular_velocity
    }

    // ===== Mutators =====
    //
    // Kinematic writes are silently ignored on fixed bodies.

    pub fn apply_force(&mut self, force: Vec2) {
        if !self.is_fixed() {
            self.force += force;
        }
    }

    pub fn apply_torque(&mut self, torque: f64) {
        if !self.is_fixed() {
            self.torque += torque;
        }
    }

    /// Instantaneous impulse at world position `point`.
    pub fn apply_impulse(&mut self, impulse: Vec2, point: Vec2) {
        if self.is_fixed() {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += (point - self.position).cross(&impulse) * self.inv_inertia;
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec2) {
        if !self.is_fixed() {
            self.linear_velocity = velocity;
        }
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: f64) {
        if !self.is_fixed() {
            self.angular_velocity = angular_velocity;
        }
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    /// Enters the degenerate condition: motion stops and integration is skipped.
    pub(crate) fn freeze(&mut self) {
        self.degenerate = true;
        self.linear_velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
        self.clear_forces();
    }

    /// Leaves the degenerate condition with the body at rest.
    pub(crate) fn unfreeze(&mut self) {
        self.degenerate = false;
        self.linear_velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
        self.clear_forces();
    }
}

// =============================================================================
// Factories
// =============================================================================

/// Circle centered at `center`.
pub fn make_circle(center: Vec2, radius: f64, opts: BodyOptions) -> Result<Body> {
    if !(radius > 0.0 && radius.is_finite()) {
        return Err(PhysicsError::config(format!(
            "circle radius must be positive and finite, got {radius}"
        )));
    }
    Body::new(Shape::Circle { radius }, center, &opts)
}

/// Axis-aligned rectangle centered at `center` (rotated by `opts.angle`).
pub fn make_rectangle(center: Vec2, width: f64, height: f64, opts: BodyOptions) -> Result<Body> {
    let poly = Polygon::rectangle(width, height)?;
    Body::new(Shape::Polygon(poly), center, &opts)
}

/// Convex polygon with `vertices` given relative to `center`.
///
/// The body is placed at the polygon's centroid, which differs from
/// `center` when the vertices are not centered on it.
pub fn make_polygon(center: Vec2, vertices: &[Vec2], opts: BodyOptions) -> Result<Body> {
    let (poly, centroid) = Polygon::from_vertices(vertices)?;
    Body::new(Shape::Polygon(poly), center + centroid, &opts)
}

/// Declarative description of a body, used by [`World::spawn`](crate::world::World::spawn)
/// and by scene files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ShapeSpec {
    Circle {
        center: Vec2,
        radius: f64,
        #[serde(default)]
        options: BodyOptions,
    },
    Rectangle {
        center: Vec2,
        width: f64,
        height: f64,
        #[serde(default)]
        options: BodyOptions,
    },
    Polygon {
        center: Vec2,
        vertices: Vec<Vec2>,
        #[serde(default)]
        options: BodyOptions,
    },
}

impl ShapeSpec {
    pub fn circle(center: Vec2, radius: f64) -> Self {
        ShapeSpec::Circle {
            center,
            radius,
            options: BodyOptions::default(),
        }
    }

    pub fn rectangle(center: Vec2, width: f64, height: f64) -> Self {
        ShapeSpec::Rectangle {
            center,
            width,
            height,
            options: BodyOptions::default(),
        }
    }

    pub fn polygon(center: Vec2, vertices: Vec<Vec2>) -> Self {
        ShapeSpec::Polygon {
            center,
            vertices,
            options: BodyOptions::default(),
        }
    }

    pub fn with_options(mut self, opts: BodyOptions) -> Self {
        match &mut self {
            ShapeSpec::Circle { options, .. }
            | ShapeSpec::Rectangle { options, .. }
            | ShapeSpec::Polygon { options, .. } => *options = opts,
        }
        self
    }

    pub fn options(&self) -> &BodyOptions {
        match self {
            ShapeSpec::Circle { options, .. }
            | ShapeSpec::Rectangle { options, .. }
            | ShapeSpec::Polygon { options, .. } => options,
        }
    }

    /// Runs the matching factory.
    pub fn build(&self) -> Result<Body> {
        match self {
            ShapeSpec::Circle {
                center,
                radius,
                options,
            } => make_circle(*center, *radius, *options),
            ShapeSpec::Rectangle {
                center,
                width,
                height,
                options,
            } => make_rectangle(*center, *width, *height, *options),
            ShapeSpec::Polygon {
                center,
                vertices,
                options,
            } => make_polygon(*center, vertices, *options),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
