//! Core planar geometry types
//!
//! This module contains the fundamental geometric primitives used throughout
//! the crate: 2D/3D points, rings, and polygons with holes.

use serde::Serialize;

/// A 2D point in map units (metres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

/// A 3D point in map units (metres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A closed ring of vertices; the closing edge (last -> first) is implicit
pub type Ring = Vec<Point2>;

/// A polygon with one outer ring and any number of inner rings (holes)
///
/// After [`Polygon2::normalize`] the outer ring winds counter-clockwise and
/// inner rings wind clockwise, with consecutive duplicate vertices removed.
#[derive(Debug, Clone, Serialize)]
pub struct Polygon2 {
    pub outer: Ring,
    pub inners: Vec<Ring>,
}

impl Polygon2 {
    pub fn new(outer: Ring, inners: Vec<Ring>) -> Self {
        Self { outer, inners }
    }

    /// Total number of rings (outer + inners)
    pub fn num_rings(&self) -> usize {
        1 + self.inners.len()
    }

    /// Ring by index: 0 is the outer ring, 1.. are inner rings
    pub fn ring(&self, ringi: usize) -> &Ring {
        if ringi == 0 {
            &self.outer
        } else {
            &self.inners[ringi - 1]
        }
    }

    /// Iterate all rings, outer first
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.inners.iter())
    }

    /// Total vertex count across all rings
    pub fn num_vertices(&self) -> usize {
        self.rings().map(|r| r.len()).sum()
    }

    /// Remove consecutive duplicate vertices and fix ring orientation
    /// (outer CCW, inners CW)
    pub fn normalize(&mut self) {
        dedup_ring(&mut self.outer);
        if signed_area(&self.outer) < 0.0 {
            self.outer.reverse();
        }
        for inner in &mut self.inners {
            dedup_ring(inner);
            if signed_area(inner) > 0.0 {
                inner.reverse();
            }
        }
    }

    /// Axis-aligned bounding box as [min_x, min_y, max_x, max_y]
    pub fn bbox(&self) -> [f64; 4] {
        let mut bb = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
        for p in self.rings().flatten() {
            bb[0] = bb[0].min(p.x);
            bb[1] = bb[1].min(p.y);
            bb[2] = bb[2].max(p.x);
            bb[3] = bb[3].max(p.y);
        }
        bb
    }

    /// Even-odd point-in-polygon test; a point inside a hole is outside
    pub fn contains(&self, p: Point2) -> bool {
        if !ring_contains(&self.outer, p) {
            return false;
        }
        for inner in &self.inners {
            if ring_contains(inner, p) {
                return false;
            }
        }
        true
    }

    /// Shortest distance from `p` to any boundary edge of any ring
    pub fn distance_to_boundary(&self, p: Point2) -> f64 {
        let mut dmin = f64::INFINITY;
        for ring in self.rings() {
            for i in 0..ring.len() {
                let a = ring[i];
                let b = ring[(i + 1) % ring.len()];
                dmin = dmin.min(segment_distance(p, a, b));
            }
        }
        dmin
    }
}

/// Euclidean distance between two 2D points
pub fn distance(a: Point2, b: Point2) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Twice the signed area of a ring; positive for counter-clockwise winding
pub fn signed_area(ring: &Ring) -> f64 {
    let n = ring.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        sum += (b.x - a.x) * (b.y + a.y);
    }
    -sum
}

fn dedup_ring(ring: &mut Ring) {
    ring.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    // drop an explicit closing vertex if present
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
}

fn ring_contains(ring: &Ring, p: Point2) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        if ((ring[i].y > p.y) != (ring[j].y > p.y))
            && (p.x
                < (ring[j].x - ring[i].x) * (p.y - ring[i].y) / (ring[j].y - ring[i].y)
                    + ring[i].x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Perpendicular distance from point to line segment
pub fn segment_distance(p: Point2, a: Point2, b: Point2) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-12 {
        return distance(p, a);
    }

    let t = ((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq;
    let t = t.clamp(0.0, 1.0);

    let proj = Point2::new(a.x + t * dx, a.y + t * dy);
    distance(p, proj)
}

/// Canonical key for a 2D location, bucketed to millimetres
///
/// Vertices closer than the bucket size collapse to the same key; node
/// columns and vertex pools rely on this to stitch adjacent footprints.
pub fn point_key2(p: Point2) -> String {
    format!("{:.3} {:.3}", p.x, p.y)
}

/// Canonical key for a 3D vertex, bucketed to millimetres
pub fn point_key3(p: Point3) -> String {
    format!("{:.3} {:.3} {:.3}", p.x, p.y, p.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(s: f64) -> Ring {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ]
    }

    #[test]
    fn test_normalize_orientation() {
        let mut cw_outer: Ring = square(10.0);
        cw_outer.reverse();
        let mut poly = Polygon2::new(cw_outer, vec![square(2.0)]);
        poly.normalize();
        assert!(signed_area(&poly.outer) > 0.0);
        assert!(signed_area(&poly.inners[0]) < 0.0);
    }

    #[test]
    fn test_normalize_dedup() {
        let mut ring = square(10.0);
        ring.insert(1, Point2::new(10.0, 0.0)); // duplicate
        ring.push(Point2::new(0.0, 0.0)); // explicit closing vertex
        let mut poly = Polygon2::new(ring, vec![]);
        poly.normalize();
        assert_eq!(poly.outer.len(), 4);
    }

    #[test]
    fn test_contains_with_hole() {
        let mut poly = Polygon2::new(
            square(10.0),
            vec![vec![
                Point2::new(4.0, 4.0),
                Point2::new(6.0, 4.0),
                Point2::new(6.0, 6.0),
                Point2::new(4.0, 6.0),
            ]],
        );
        poly.normalize();
        assert!(poly.contains(Point2::new(1.0, 1.0)));
        assert!(!poly.contains(Point2::new(5.0, 5.0))); // in the hole
        assert!(!poly.contains(Point2::new(11.0, 5.0)));
    }

    #[test]
    fn test_segment_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        assert!((segment_distance(Point2::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((segment_distance(Point2::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_keys_bucket() {
        let p = Point3::new(1.23441, 2.0, 3.0);
        let q = Point3::new(1.23439, 2.0, 3.0);
        // rounds to the same millimetre bucket
        assert_eq!(point_key3(p), point_key3(q));
    }
}
