//! Mesh buffers and footprint triangulation
//!
//! Output geometry is held in deduplicated vertex/triangle buffer pairs:
//! one pair for the roof/base surface of a footprint, one for its vertical
//! walls. Vertices are deduplicated through their canonical string key, and
//! triangles that collapse onto fewer than 3 distinct vertices are dropped.
//!
//! # Submodules
//! - `builder` - Constrained-triangulation mesh construction
//! - `simplify` - Greedy error-driven interior point insertion

mod builder;
mod simplify;

pub use builder::{build_surface_mesh, BreakLine, SurfaceMeshOptions};
pub use simplify::SimplifyOutcome;

use crate::geometry::{point_key3, Point3};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

/// A triangle as indices into a [`VertexPool`]
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Triangle {
    pub v0: u32,
    pub v1: u32,
    pub v2: u32,
}

/// Vertex buffer deduplicated by canonical key
///
/// Two pushed points whose keys collapse to the same millimetre bucket
/// resolve to one pooled vertex.
#[derive(Debug, Default, Serialize)]
pub struct VertexPool {
    pub points: Vec<Point3>,
    pub keys: Vec<String>,
    #[serde(skip)]
    lookup: IndexMap<String, u32>,
}

impl VertexPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `p`, inserting it if its key is new
    pub fn push(&mut self, p: Point3) -> u32 {
        let key = point_key3(p);
        if let Some(&i) = self.lookup.get(&key) {
            return i;
        }
        let i = self.points.len() as u32;
        self.points.push(p);
        self.keys.push(key.clone());
        self.lookup.insert(key, i);
        i
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One vertex/triangle buffer pair
#[derive(Debug, Default, Serialize)]
pub struct MeshBuffer {
    pub vertices: VertexPool,
    pub triangles: Vec<Triangle>,
}

impl MeshBuffer {
    /// Add a triangle, deduplicating vertices by key
    ///
    /// A triangle with two corners resolving to the same pooled vertex is
    /// degenerate and excluded from the buffer.
    pub fn add_triangle(&mut self, a: Point3, b: Point3, c: Point3) {
        let v0 = self.vertices.push(a);
        let v1 = self.vertices.push(b);
        let v2 = self.vertices.push(c);
        if v0 == v1 || v0 == v2 || v1 == v2 {
            debug!(
                "dropping degenerate triangle ({}, {}, {})",
                self.vertices.keys[v0 as usize],
                self.vertices.keys[v1 as usize],
                self.vertices.keys[v2 as usize]
            );
            return;
        }
        self.triangles.push(Triangle { v0, v1, v2 });
    }
}

/// Final geometry of one footprint
#[derive(Debug, Default, Serialize)]
pub struct Mesh {
    /// Roof/base surface triangles
    pub surface: MeshBuffer,
    /// Vertical connector walls
    pub walls: MeshBuffer,
    /// True if wall synthesis produced any geometry
    pub has_walls: bool,
}
