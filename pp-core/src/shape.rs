//! Collision shapes and their mass properties.
//!
//! Polygons are stored in the body's local frame with the centroid at the
//! origin and vertices wound counter-clockwise (positive signed area). Edge
//! `i` runs from vertex `i` to vertex `i + 1`; `normals[i]` is its outward
//! unit normal. Axis indices used by the narrow-phase follow this order.

use serde::{Deserialize, Serialize};

use crate::collision::Aabb;
use crate::error::{PhysicsError, Result};
use crate::types::{constants, ShapeKind, Vec2};

/// Collision geometry of a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f64 },
    Polygon(Polygon),
}

/// Mass and rotational inertia about the centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub mass: f64,
    pub inertia: f64,
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Polygon(_) => ShapeKind::Polygon,
        }
    }

    /// Mass properties for a uniform density.
    ///
    /// Circle: `m = ρπr²`, `I = ½mr²`. Polygon: triangle fan about the centroid,
    /// which reduces to `m(w² + h²)/12` for a `w × h` rectangle.
    pub fn mass_properties(&self, density: f64) -> MassProperties {
        match self {
            Shape::Circle { radius } => {
                let mass = density * std::f64::consts::PI * radius * radius;
                MassProperties {
                    mass,
                    inertia: 0.5 * mass * radius * radius,
                }
            }
            Shape::Polygon(poly) => poly.mass_properties(density),
        }
    }

    /// World-space bounding box for a body at `position` rotated by `angle`.
    pub fn aabb(&self, position: Vec2, angle: f64) -> Aabb {
        match self {
            Shape::Circle { radius } => Aabb::from_center_half_extents(position, Vec2::new(*radius, *radius)),
            Shape::Polygon(poly) => {
                let mut iter = poly.vertices.iter().map(|v| position + v.rotate(angle));
                // Polygons always carry at least three vertices.
                let first = iter.next().unwrap_or(position);
                iter.fold(Aabb::new(first, first), |acc, v| Aabb::new(acc.min.min(&v), acc.max.max(&v)))
            }
        }
    }
}

/// Convex polygon in local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
}

impl Polygon {
    /// Axis-aligned `width × height` box centered on the origin.
    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        if !(width > 0.0 && width.is_finite()) || !(height > 0.0 && height.is_finite()) {
            return Err(PhysicsError::config(format!(
                "rectangle dimensions must be positive and finite, got {width} x {height}"
            )));
        }
        let (hw, hh) = (0.5 * width, 0.5 * height);
        let vertices = vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ];
        Ok(Self::from_ccw(vertices))
    }

    /// Builds a polygon from an arbitrary convex vertex loop.
    ///
    /// Returns the polygon (recentered on its centroid) and the centroid in
    /// the input frame. Clockwise input is re-wound. Fails on fewer than three
    /// vertices, non-finite coordinates, zero area or a non-convex loop.
    pub fn from_vertices(points: &[Vec2]) -> Result<(Self, Vec2)> {
        if points.len() < 3 {
            return Err(PhysicsError::config(format!(
                "polygon needs at least 3 vertices, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(PhysicsError::config("polygon vertices must be finite"));
        }

        let mut loop_pts = points.to_vec();
        let area = signed_area(&loop_pts);
        // Tolerances scale with the polygon so tiny valid shapes are accepted
        let extent = loop_pts
            .iter()
            .map(|p| (*p - loop_pts[0]).magnitude_squared())
            .fold(0.0, f64::max);
        if area.abs() <= constants::EPSILON * extent {
            return Err(PhysicsError::config("polygon has zero area"));
        }
        if area < 0.0 {
            loop_pts.reverse();
        }

        let n = loop_pts.len();
        for i in 0..n {
            let a = loop_pts[i];
            let b = loop_pts[(i + 1) % n];
            let c = loop_pts[(i + 2) % n];
            let (e1, e2) = (b - a, c - b);
            if e1.cross(&e2) <= constants::EPSILON * e1.magnitude() * e2.magnitude() {
                return Err(PhysicsError::config(format!(
                    "polygon is not strictly convex at vertex {}",
                    (i + 1) % n
                )));
            }
        }

        let centroid = centroid(&loop_pts);
        let local = loop_pts.into_iter().map(|p| p - centroid).collect();
        Ok((Self::from_ccw(local), centroid))
    }

    fn from_ccw(vertices: Vec<Vec2>) -> Self {
        let n = vertices.len();
        let normals = (0..n)
            .map(|i| {
                let edge = vertices[(i + 1) % n] - vertices[i];
                Vec2::new(edge.y, -edge.x).normalized()
            })
            .collect();
        Self { vertices, normals }
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.vertices)
    }

    fn mass_properties(&self, density: f64) -> MassProperties {
        let n = self.vertices.len();
        let mut area = 0.0;
        let mut inertia = 0.0;
        for i in 0..n {
            let e1 = self.vertices[i];
            let e2 = self.vertices[(i + 1) % n];
            let d = e1.cross(&e2);
            area += 0.5 * d;
            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 / 3.0) * d * (intx2 + inty2);
        }
        MassProperties {
            mass: density * area,
            inertia: density * inertia,
        }
    }
}

fn signed_area(points: &[Vec2]) -> f64 {
    let n = points.len();
    (0..n).map(|i| points[i].cross(&points[(i + 1) % n])).sum::<f64>() * 0.5
}

fn centroid(points: &[Vec2]) -> Vec2 {
    // Fan from the first vertex keeps the sum well conditioned for off-origin input.
    let origin = points[0];
    let mut area = 0.0;
    let mut center = Vec2::ZERO;
    for i in 1..points.len() - 1 {
        let e1 = points[i] - origin;
        let e2 = points[i + 1] - origin;
        let tri = 0.5 * e1.cross(&e2);
        area += tri;
        center += (e1 + e2) * (tri / 3.0);
    }
    origin + center / area
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_winding_and_normals() {
        let rect = Polygon::rectangle(4.0, 2.0).unwrap();
        assert!(rect.area() > 0.0);
        assert_relative_eq!(rect.area(), 8.0);
        // Edge 0 is the y = -h/2 side
        assert_eq!(rect.normals()[0], Vec2::new(0.0, -1.0));
        assert_eq!(rect.normals()[1], Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_rectangle_rejects_non_positive() {
        assert!(Polygon::rectangle(0.0, 1.0).is_err());
        assert!(Polygon::rectangle(1.0, -2.0).is_err());
        assert!(Polygon::rectangle(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_polygon_inertia_matches_rectangle_formula() {
        let (w, h, density) = (30.0, 10.0, 0.002);
        let props = Shape::Polygon(Polygon::rectangle(w, h).unwrap()).mass_properties(density);
        let mass = density * w * h;
        assert_relative_eq!(props.mass, mass, max_relative = 1e-12);
        assert_relative_eq!(props.inertia, mass * (w * w + h * h) / 12.0, max_relative = 1e-12);
    }

    #[test]
    fn test_circle_mass_properties() {
        let props = Shape::Circle { radius: 2.0 }.mass_properties(1.0);
        assert_relative_eq!(props.mass, std::f64::consts::PI * 4.0);
        assert_relative_eq!(props.inertia, 0.5 * props.mass * 4.0);
    }

    #[test]
    fn test_from_vertices_rewinds_and_recenters() {
        // Clockwise triangle, away from the origin
        let pts = [Vec2::new(10.0, 10.0), Vec2::new(10.0, 13.0), Vec2::new(13.0, 10.0)];
        let (poly, centroid) = Polygon::from_vertices(&pts).unwrap();
        assert!(poly.area() > 0.0);
        assert_relative_eq!(centroid.x, 11.0);
        assert_relative_eq!(centroid.y, 11.0);
        let sum = poly.vertices().iter().fold(Vec2::ZERO, |acc, v| acc + *v);
        assert_relative_eq!(sum.magnitude(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_from_vertices_rejects_concave() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 4.0),
        ];
        assert!(matches!(
            Polygon::from_vertices(&pts),
            Err(PhysicsError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_vertices_rejects_degenerate() {
        let collinear = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)];
        assert!(Polygon::from_vertices(&collinear).is_err());
        assert!(Polygon::from_vertices(&collinear[..2]).is_err());
    }

    #[test]
    fn test_sliver_rectangle_has_unit_normals() {
        let rect = Polygon::rectangle(1e-11, 20.0).unwrap();
        for n in rect.normals() {
            assert_relative_eq!(n.magnitude(), 1.0, max_relative = 1e-12);
        }
        assert_eq!(rect.normals()[0], Vec2::new(0.0, -1.0));
        assert_eq!(rect.normals()[1], Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_tiny_triangle_accepted() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(1e-6, 0.0), Vec2::new(0.0, 1e-6)];
        let (poly, _) = Polygon::from_vertices(&pts).unwrap();
        assert_relative_eq!(poly.area(), 0.5e-12, max_relative = 1e-9);
        for n in poly.normals() {
            assert_relative_eq!(n.magnitude(), 1.0, max_relative = 1e-12);
        }

        // Collinearity is still caught at that scale
        let flat = [Vec2::new(0.0, 0.0), Vec2::new(1e-6, 0.0), Vec2::new(2e-6, 0.0)];
        assert!(Polygon::from_vertices(&flat).is_err());
    }

    #[test]
    fn test_rotated_box_aabb() {
        let shape = Shape::Polygon(Polygon::rectangle(2.0, 2.0).unwrap());
        let aabb = shape.aabb(Vec2::new(5.0, 5.0), std::f64::consts::FRAC_PI_4);
        let half_diag = 2.0_f64.sqrt();
        assert_relative_eq!(aabb.min.x, 5.0 - half_diag, epsilon = 1e-12);
        assert_relative_eq!(aabb.max.y, 5.0 + half_diag, epsilon = 1e-12);
    }
}
