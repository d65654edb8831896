//! Spatial indexing for boundary vertices
//!
//! This module provides an R-tree over a polygon's ring vertices, enabling
//! fast radius queries when elevation samples are collected.

use super::types::{Point2, Polygon2};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A single ring vertex in the spatial index
#[derive(Clone, Debug)]
pub struct RingVertex {
    /// Ring index: 0 = outer, 1.. = inners
    pub ring: usize,
    /// Vertex index within the ring
    pub vertex: usize,
    pub pos: [f64; 2],
}

impl RTreeObject for RingVertex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos)
    }
}

impl PointDistance for RingVertex {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.pos[0] - point[0];
        let dy = self.pos[1] - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree over all ring vertices of one polygon
pub struct VertexIndex {
    tree: RTree<RingVertex>,
}

impl std::fmt::Debug for VertexIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexIndex")
            .field("vertices", &self.tree.size())
            .finish()
    }
}

impl VertexIndex {
    pub fn build(polygon: &Polygon2) -> Self {
        let mut entries = Vec::with_capacity(polygon.num_vertices());
        for (ringi, ring) in polygon.rings().enumerate() {
            for (vi, p) in ring.iter().enumerate() {
                entries.push(RingVertex {
                    ring: ringi,
                    vertex: vi,
                    pos: [p.x, p.y],
                });
            }
        }
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// All ring vertices within `radius` of `p`
    pub fn within_radius(&self, p: Point2, radius: f64) -> impl Iterator<Item = &RingVertex> {
        self.tree
            .locate_within_distance([p.x, p.y], radius * radius)
    }

    /// True if any ring vertex lies within `radius` of `p`
    pub fn any_within_radius(&self, p: Point2, radius: f64) -> bool {
        self.within_radius(p, radius).next().is_some()
    }
}
