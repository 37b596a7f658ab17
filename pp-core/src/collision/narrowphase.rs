//! Exact contact generation for candidate pairs.
//!
//! Dispatches on the shape combination:
//! - **circle–circle**: center distance against the sum of radii
//! - **circle–polygon**: Voronoi-region test of the circle center against
//!   every polygon edge (face region, or one of the edge's end vertices)
//! - **polygon–polygon**: separating axis test over both polygons' edge
//!   normals, then the incident edge is clipped against the side planes of
//!   the reference edge, leaving at most two contact points
//!
//! ```text
//!   reference edge (body A)      n
//!   v1 ───────────────── v2      ↑
//!        ╲ · · · · · · ╱ ← side planes clip the incident edge
//!         ●═══════════●          incident edge (body B)
//! ```
//!
//! Every manifold normal points from the first body to the second.

use smallvec::SmallVec;

use crate::body::Body;
use crate::collision::{Contact, ContactPoint};
use crate::shape::{Polygon, Shape};
use crate::types::{constants, Vec2};

/// Separations closer than this are treated as ties. Ties keep the first
/// polygon's axis so a pair does not flip reference faces between steps.
const AXIS_TIE_TOLERANCE: f64 = 1e-9;

/// A shape placed in the world.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub shape: &'a Shape,
    pub position: Vec2,
    pub angle: f64,
}

impl<'a> Placement<'a> {
    pub fn of(body: &'a Body) -> Self {
        Self {
            shape: body.shape(),
            position: body.position(),
            angle: body.angle(),
        }
    }
}

/// Geometric result of a pair test, before solver state is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    /// Unit normal from the first shape toward the second.
    pub normal: Vec2,
    pub points: SmallVec<[ManifoldPoint; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldPoint {
    pub position: Vec2,
    pub depth: f64,
}

impl Manifold {
    fn single(normal: Vec2, position: Vec2, depth: f64) -> Self {
        let mut points = SmallVec::new();
        points.push(ManifoldPoint { position, depth });
        Self { normal, points }
    }

    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }

    /// Deepest penetration over all points.
    pub fn depth(&self) -> f64 {
        self.points.iter().fold(0.0, |acc, p| acc.max(p.depth))
    }
}

/// Builds the contact for bodies stored at `index_a` and `index_b`.
///
/// `a` must be the body with the lower id.
pub fn collide(index_a: usize, a: &Body, index_b: usize, b: &Body) -> Option<Contact> {
    let manifold = collide_shapes(&Placement::of(a), &Placement::of(b))?;
    let depth = manifold.depth();
    Some(Contact {
        body_a: a.id(),
        body_b: b.id(),
        normal: manifold.normal,
        depth,
        points: manifold
            .points
            .iter()
            .map(|p| ContactPoint {
                position: p.position,
                depth: p.depth,
                normal_impulse: 0.0,
                tangent_impulse: 0.0,
            })
            .collect(),
        index_a,
        index_b,
    })
}

/// Tests two placed shapes. `None` when they are separated by a positive gap.
pub fn collide_shapes(a: &Placement<'_>, b: &Placement<'_>) -> Option<Manifold> {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.position, *ra, b.position, *rb)
        }
        (Shape::Polygon(poly), Shape::Circle { radius }) => {
            polygon_circle(poly, a.position, a.angle, b.position, *radius)
        }
        (Shape::Circle { radius }, Shape::Polygon(poly)) => {
            polygon_circle(poly, b.position, b.angle, a.position, *radius).map(Manifold::flipped)
        }
        (Shape::Polygon(pa), Shape::Polygon(pb)) => polygon_polygon(
            &WorldPolygon::new(pa, a.position, a.angle),
            &WorldPolygon::new(pb, b.position, b.angle),
        ),
    }
}

fn circle_circle(ca: Vec2, ra: f64, cb: Vec2, rb: f64) -> Option<Manifold> {
    let delta = cb - ca;
    let radii = ra + rb;
    let dist_sq = delta.magnitude_squared();
    if dist_sq > radii * radii {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > constants::EPSILON {
        delta / dist
    } else {
        // Coincident centers: any axis separates them, pick a fixed one.
        Vec2::new(1.0, 0.0)
    };
    let depth = radii - dist;
    let point = ca + normal * (ra - 0.5 * depth);
    Some(Manifold::single(normal, point, depth))
}

/// Normal points from the polygon to the circle.
fn polygon_circle(poly: &Polygon, position: Vec2, angle: f64, center: Vec2, radius: f64) -> Option<Manifold> {
    let local = (center - position).rotate(-angle);
    let vertices = poly.vertices();
    let normals = poly.normals();
    let n = vertices.len();

    let mut separation = f64::NEG_INFINITY;
    let mut edge = 0;
    for i in 0..n {
        let s = normals[i].dot(&(local - vertices[i]));
        if s > radius {
            return None;
        }
        if s > separation {
            separation = s;
            edge = i;
        }
    }

    let v1 = vertices[edge];
    let v2 = vertices[(edge + 1) % n];
    let face = normals[edge];

    let (normal, point, depth) = if separation < constants::EPSILON {
        // Center inside the polygon
        (face, local - face * separation, radius - separation)
    } else {
        let u1 = (local - v1).dot(&(v2 - v1));
        let u2 = (local - v2).dot(&(v1 - v2));
        if u1 <= 0.0 {
            vertex_region(local, v1, radius)?
        } else if u2 <= 0.0 {
            vertex_region(local, v2, radius)?
        } else {
            (face, local - face * separation, radius - separation)
        }
    };

    Some(Manifold::single(
        normal.rotate(angle),
        position + point.rotate(angle),
        depth,
    ))
}

fn vertex_region(center: Vec2, vertex: Vec2, radius: f64) -> Option<(Vec2, Vec2, f64)> {
    let delta = center - vertex;
    let dist = delta.magnitude();
    if dist > radius {
        return None;
    }
    Some((delta / dist, vertex, radius - dist))
}

/// Polygon vertices and normals transformed into world space.
struct WorldPolygon {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
}

impl WorldPolygon {
    fn new(poly: &Polygon, position: Vec2, angle: f64) -> Self {
        Self {
            vertices: poly.vertices().iter().map(|v| position + v.rotate(angle)).collect(),
            normals: poly.normals().iter().map(|n| n.rotate(angle)).collect(),
        }
    }

    fn edge(&self, i: usize) -> (Vec2, Vec2) {
        (self.vertices[i], self.vertices[(i + 1) % self.vertices.len()])
    }
}

/// Largest separation of `other` along the edge normals of `reference`.
///
/// Strict comparison keeps the lowest edge index among equal separations.
fn max_separation(reference: &WorldPolygon, other: &WorldPolygon) -> (f64, usize) {
    let mut best = f64::NEG_INFINITY;
    let mut best_edge = 0;
    for (i, (normal, vertex)) in reference.normals.iter().zip(&reference.vertices).enumerate() {
        let s = other
            .vertices
            .iter()
            .map(|v| normal.dot(&(*v - *vertex)))
            .fold(f64::INFINITY, f64::min);
        if s > best {
            best = s;
            best_edge = i;
        }
    }
    (best, best_edge)
}

fn polygon_polygon(a: &WorldPolygon, b: &WorldPolygon) -> Option<Manifold> {
    let (sep_a, edge_a) = max_separation(a, b);
    if sep_a > 0.0 {
        return None;
    }
    let (sep_b, edge_b) = max_separation(b, a);
    if sep_b > 0.0 {
        return None;
    }

    let (reference, incident, ref_edge, flip) = if sep_b > sep_a + AXIS_TIE_TOLERANCE {
        (b, a, edge_b, true)
    } else {
        (a, b, edge_a, false)
    };

    let ref_normal = reference.normals[ref_edge];

    // Incident edge: the one whose normal opposes the reference normal most.
    let mut inc_edge = 0;
    let mut min_dot = f64::INFINITY;
    for (i, n) in incident.normals.iter().enumerate() {
        let d = ref_normal.dot(n);
        if d < min_dot {
            min_dot = d;
            inc_edge = i;
        }
    }

    let (inc_v1, inc_v2) = incident.edge(inc_edge);
    let (ref_v1, ref_v2) = reference.edge(ref_edge);
    let tangent = (ref_v2 - ref_v1).normalized();

    let clipped = clip_segment([inc_v1, inc_v2], -tangent, -tangent.dot(&ref_v1));
    if clipped.len() < 2 {
        return None;
    }
    let clipped = clip_segment([clipped[0], clipped[1]], tangent, tangent.dot(&ref_v2));
    if clipped.len() < 2 {
        return None;
    }

    let mut points = SmallVec::new();
    for p in clipped {
        let separation = ref_normal.dot(&(p - ref_v1));
        if separation <= 0.0 {
            points.push(ManifoldPoint {
                // Midway between the two surfaces
                position: p - ref_normal * (0.5 * separation),
                depth: -separation,
            });
        }
    }
    if points.is_empty() {
        return None;
    }

    Some(Manifold {
        normal: if flip { -ref_normal } else { ref_normal },
        points,
    })
}

/// Keeps the part of segment `seg` where `normal · p <= offset`.
fn clip_segment(seg: [Vec2; 2], normal: Vec2, offset: f64) -> SmallVec<[Vec2; 2]> {
    let mut out = SmallVec::new();
    let d0 = normal.dot(&seg[0]) - offset;
    let d1 = normal.dot(&seg[1]) - offset;
    if d0 <= 0.0 {
        out.push(seg[0]);
    }
    if d1 <= 0.0 {
        out.push(seg[1]);
    }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        out.push(seg[0] + (seg[1] - seg[0]) * t);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn circle(r: f64) -> Shape {
        Shape::Circle { radius: r }
    }

    fn boxed(w: f64, h: f64) -> Shape {
        Shape::Polygon(Polygon::rectangle(w, h).unwrap())
    }

    fn at(shape: &Shape, x: f64, y: f64) -> Placement<'_> {
        Placement {
            shape,
            position: Vec2::new(x, y),
            angle: 0.0,
        }
    }

    #[test]
    fn test_circle_circle_overlap() {
        let c = circle(1.0);
        let m = collide_shapes(&at(&c, 0.0, 0.0), &at(&c, 1.5, 0.0)).unwrap();
        assert_eq!(m.normal, Vec2::new(1.0, 0.0));
        assert_relative_eq!(m.depth(), 0.5);
        assert_relative_eq!(m.points[0].position.x, 0.75);
    }

    #[test]
    fn test_circle_circle_separated_and_touching() {
        let c = circle(1.0);
        assert!(collide_shapes(&at(&c, 0.0, 0.0), &at(&c, 2.01, 0.0)).is_none());
        let touching = collide_shapes(&at(&c, 0.0, 0.0), &at(&c, 2.0, 0.0)).unwrap();
        assert_abs_diff_eq!(touching.depth(), 0.0);
    }

    #[test]
    fn test_coincident_circles_get_fixed_axis() {
        let c = circle(1.0);
        let m = collide_shapes(&at(&c, 3.0, 3.0), &at(&c, 3.0, 3.0)).unwrap();
        assert_eq!(m.normal, Vec2::new(1.0, 0.0));
        assert_relative_eq!(m.depth(), 2.0);
    }

    #[test]
    fn test_circle_on_box_face() {
        let b = boxed(4.0, 2.0);
        let c = circle(1.0);
        let m = collide_shapes(&at(&b, 0.0, 0.0), &at(&c, 0.0, 1.5)).unwrap();
        assert_abs_diff_eq!(m.normal.x, 0.0);
        assert_relative_eq!(m.normal.y, 1.0);
        assert_relative_eq!(m.depth(), 0.5);
        assert_relative_eq!(m.points[0].position.y, 1.0);

        // Reversed order flips the normal so it still points first → second
        let flipped = collide_shapes(&at(&c, 0.0, 1.5), &at(&b, 0.0, 0.0)).unwrap();
        assert_relative_eq!(flipped.normal.y, -1.0);
    }

    #[test]
    fn test_circle_near_box_corner() {
        let b = boxed(4.0, 2.0);
        let c = circle(1.0);
        let m = collide_shapes(&at(&b, 0.0, 0.0), &at(&c, 2.5, 1.5)).unwrap();
        let diag = std::f64::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(m.normal.x, diag, epsilon = 1e-12);
        assert_relative_eq!(m.normal.y, diag, epsilon = 1e-12);
        assert_relative_eq!(m.depth(), 1.0 - 0.5_f64.sqrt(), epsilon = 1e-12);

        // Outside the corner's reach
        assert!(collide_shapes(&at(&b, 0.0, 0.0), &at(&c, 2.8, 1.8)).is_none());
    }

    #[test]
    fn test_circle_against_rotated_box() {
        // 4 × 2 box turned a quarter turn spans x in [-1, 1], y in [-2, 2]
        let b = boxed(4.0, 2.0);
        let c = circle(1.0);
        let turned = Placement {
            shape: &b,
            position: Vec2::ZERO,
            angle: std::f64::consts::FRAC_PI_2,
        };

        let m = collide_shapes(&turned, &at(&c, 1.5, 0.0)).unwrap();
        assert_relative_eq!(m.normal.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.normal.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(m.depth(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(m.points[0].position.x, 1.0, epsilon = 1e-12);

        let m = collide_shapes(&turned, &at(&c, 0.0, 2.5)).unwrap();
        assert_abs_diff_eq!(m.normal.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(m.normal.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.depth(), 0.5, epsilon = 1e-12);

        // Unrotated, the box would reach x = 2 and swallow this circle's center
        assert!(collide_shapes(&turned, &at(&c, 2.1, 0.0)).is_none());
    }

    #[test]
    fn test_circle_center_inside_box() {
        let b = boxed(4.0, 2.0);
        let c = circle(0.25);
        let m = collide_shapes(&at(&b, 0.0, 0.0), &at(&c, 0.0, 0.5)).unwrap();
        assert_relative_eq!(m.normal.y, 1.0);
        assert_relative_eq!(m.depth(), 0.75);
    }

    #[test]
    fn test_box_resting_on_box_has_two_points() {
        let wide = boxed(4.0, 2.0);
        let small = boxed(2.0, 2.0);
        let m = collide_shapes(&at(&wide, 0.0, 0.0), &at(&small, 0.0, 1.9)).unwrap();
        assert_abs_diff_eq!(m.normal.x, 0.0);
        assert_relative_eq!(m.normal.y, 1.0);
        assert_eq!(m.points.len(), 2);
        for p in &m.points {
            assert_relative_eq!(p.depth, 0.1, epsilon = 1e-12);
            assert_relative_eq!(p.position.y, 0.95, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_tie_keeps_first_polygon_as_reference() {
        let small = boxed(2.0, 2.0);
        let wide = boxed(4.0, 2.0);
        // Small box first; its bottom face and the wide box's top face tie,
        // so the small box stays the reference and the normal points down.
        let m = collide_shapes(&at(&small, 0.0, 1.9), &at(&wide, 0.0, 0.0)).unwrap();
        assert_relative_eq!(m.normal.y, -1.0);
        assert_relative_eq!(m.depth(), 0.1, epsilon = 1e-12);
        assert_eq!(m.points.len(), 2);
    }

    #[test]
    fn test_reference_on_second_polygon_flips_normal() {
        let b = boxed(2.0, 2.0);
        let ceiling = boxed(10.0, 2.0);
        let diamond = Placement {
            shape: &b,
            position: Vec2::ZERO,
            angle: std::f64::consts::FRAC_PI_4,
        };
        // The ceiling's bottom face separates best, so it is the reference;
        // the normal is negated to keep pointing from the diamond upward.
        let m = collide_shapes(&diamond, &at(&ceiling, 0.0, 2.3)).unwrap();
        assert_abs_diff_eq!(m.normal.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(m.normal.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.depth(), 2.0_f64.sqrt() - 1.3, epsilon = 1e-9);
    }

    #[test]
    fn test_separated_boxes() {
        let b = boxed(2.0, 2.0);
        assert!(collide_shapes(&at(&b, 0.0, 0.0), &at(&b, 5.0, 0.0)).is_none());
        assert!(collide_shapes(&at(&b, 0.0, 0.0), &at(&b, 1.0, 2.5)).is_none());
    }

    #[test]
    fn test_tied_axes_pick_lowest_index() {
        let b = boxed(2.0, 2.0);
        // Equal overlap along x (edge 1) and y (edge 2): edge 1 wins.
        let m = collide_shapes(&at(&b, 0.0, 0.0), &at(&b, 1.5, 1.5)).unwrap();
        assert_eq!(m.normal, Vec2::new(1.0, 0.0));
        assert_relative_eq!(m.depth(), 0.5, epsilon = 1e-12);
        assert_eq!(m.points.len(), 2);
    }

    #[test]
    fn test_rotated_box_corner_contact() {
        let b = boxed(2.0, 2.0);
        let floor = boxed(10.0, 2.0);
        let diamond = Placement {
            shape: &b,
            position: Vec2::new(0.0, 2.3),
            angle: std::f64::consts::FRAC_PI_4,
        };
        let m = collide_shapes(&at(&floor, 0.0, 0.0), &diamond).unwrap();
        assert_relative_eq!(m.normal.y, 1.0, epsilon = 1e-12);
        assert_eq!(m.points.len(), 1);
        assert_relative_eq!(m.depth(), 2.0_f64.sqrt() - 1.3, epsilon = 1e-9);
    }

    #[test]
    fn test_clip_segment() {
        let seg = [Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0)];
        let out = clip_segment(seg, Vec2::new(1.0, 0.0), 1.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Vec2::new(0.0, 0.0));
        assert_relative_eq!(out[1].x, 1.0);
    }
}
