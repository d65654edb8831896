//! Footprints: classified 2D polygons lifted into 3D
//!
//! A footprint owns its polygon, attributes, and the per-vertex height and
//! sample grids mutated by the lifting pipeline. Footprints live in a
//! [`FootprintArena`] and refer to each other through [`FootprintId`]
//! handles, so the cyclic adjacency graph needs no owning pointers.
//!
//! # Submodules
//! - `arena` - Arena, id handles, adjacency links
//! - `feature` - The footprint itself and its height/sample grids
//! - `elevation` - Percentile reduction of collected samples

mod arena;
mod elevation;
mod feature;

use serde::Serialize;

pub use arena::{FootprintArena, FootprintId};
pub use elevation::{percentile_of, quickselect};
pub use feature::{CollectConfig, ElevationSample, Footprint, VERTEX_TOLERANCE};

/// Sentinel height: no elevation data
pub const NODATA: i32 = -9999;

/// Heights are stored as integer centimetres; convert to metres
pub fn cm_to_m(z: i32) -> f64 {
    z as f64 / 100.0
}

/// Convert a metre elevation to integer centimetres
pub fn m_to_cm(z: f64) -> i32 {
    (z * 100.0) as i32
}

/// Footprint classification, deciding lift behavior and trust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FootprintClass {
    Building,
    Road,
    Water,
    Terrain,
    Bridge,
    Other,
}

impl FootprintClass {
    /// Hard features win height disputes against soft ones
    pub fn default_hard(self) -> bool {
        matches!(
            self,
            FootprintClass::Building | FootprintClass::Water | FootprintClass::Bridge
        )
    }

    /// How boundary heights are derived for this class
    pub fn lift_mode(self) -> LiftMode {
        match self {
            FootprintClass::Building | FootprintClass::Water => LiftMode::Uniform,
            FootprintClass::Road | FootprintClass::Bridge | FootprintClass::Other => {
                LiftMode::PerVertex
            }
            FootprintClass::Terrain => LiftMode::Surface,
        }
    }
}

/// Height derivation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiftMode {
    /// One pooled height for the whole boundary (buildings, water)
    Uniform,
    /// Independent height per boundary vertex (roads, bridges)
    PerVertex,
    /// Per-vertex boundary plus an interior point set (terrain)
    Surface,
}

/// A typed attribute value attached to a footprint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Real(f64),
    Date(String),
}

impl AttributeValue {
    /// String form, as exporters write it
    pub fn as_text(&self) -> String {
        match self {
            AttributeValue::String(s) | AttributeValue::Date(s) => s.clone(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::Real(r) => r.to_string(),
        }
    }
}
