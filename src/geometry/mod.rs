//! Planar geometry for footprint processing
//!
//! This module provides the geometric types and utilities the lifting
//! pipeline is built on: points, rings, polygons with holes, ring-major
//! text-notation parsing, and spatial indexing of boundary vertices.
//!
//! # Submodules
//! - `types` - Core primitives (Point2, Point3, Ring, Polygon2)
//! - `parse` - Ring-major polygon text notation
//! - `spatial` - R-tree over ring vertices for radius queries

mod parse;
mod spatial;
mod types;

pub use types::{
    distance,
    point_key2,
    point_key3,
    segment_distance,
    signed_area,
    Point2,
    Point3,
    Polygon2,
    Ring,
};

pub use parse::parse_polygon;

pub use spatial::{RingVertex, VertexIndex};
