//! citylift: lift attributed 2D footprints into 3D city-model meshes
//!
//! The crate takes classified polygon footprints (buildings, roads, water,
//! terrain, bridges) plus an irregular elevation sample stream and produces
//! per-footprint 3D mesh buffers ready for export. The pipeline derives
//! one discretized height per boundary vertex, smooths single-vertex
//! spikes, reconciles heights across adjacent footprints so surfaces never
//! cross, extrudes vertical connector walls where neighbors diverge, and
//! triangulates each interior against an optional point cloud with
//! error-driven simplification.
//!
//! Parsing input files, writing output formats, and adjacency discovery
//! belong to the caller; everything exchanged with this crate is
//! in-memory.
//!
//! # Modules
//! - `geometry` - Planar primitives, polygon text notation, spatial index
//! - `footprint` - Footprint arena, attributes, elevation assignment
//! - `lift` - Spike smoothing, bow-tie reconciliation, wall extrusion
//! - `mesh` - Mesh buffers, CDT surface builder, greedy simplifier
//! - `pipeline` - Stage orchestration and the run report

pub mod footprint;
pub mod geometry;
pub mod lift;
pub mod mesh;
pub mod pipeline;

pub use footprint::{
    AttributeValue, CollectConfig, ElevationSample, Footprint, FootprintArena, FootprintClass,
    FootprintId, LiftMode,
};
pub use mesh::{BreakLine, Mesh, MeshBuffer, Triangle, VertexPool};
pub use pipeline::{collect_stream, run, LiftConfig, RunReport};
