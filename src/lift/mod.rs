//! Boundary height refinement across footprints
//!
//! After per-footprint elevation assignment, heights are refined in three
//! stages: spike smoothing on each ring, bow-tie reconciliation between
//! neighbors, and vertical wall extrusion along height discontinuities.
//!
//! # Submodules
//! - `smoother` - Single-vertex spike correction and relaxation
//! - `reconcile` - Bow-tie fixes across shared edges
//! - `walls` - Node columns and vertical wall synthesis

mod reconcile;
mod smoother;
mod walls;

pub(crate) use reconcile::find_reverse_edge;
pub use reconcile::{fix_bowties, reconcile};
pub use smoother::{relax_boundary, smooth_spikes};
pub use walls::{extrude_walls, NodeColumns};
