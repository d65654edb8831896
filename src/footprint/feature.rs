//! The footprint: polygon, attributes, and height state
//!
//! Grids holding per-vertex state are sized once at construction and always
//! mirror the polygon's ring/vertex layout. The sample grid is consumed by
//! percentile reduction and cleared; the height grid lives on through
//! smoothing, reconciliation, and meshing.

use super::arena::FootprintId;
use super::elevation::percentile_of;
use super::{cm_to_m, m_to_cm, AttributeValue, FootprintClass, LiftMode, NODATA};
use crate::geometry::{distance, parse_polygon, Point2, Point3, Polygon2, VertexIndex};
use crate::mesh::{BreakLine, Mesh};
use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;

/// Matching tolerance for shared vertices and edges between footprints
pub const VERTEX_TOLERANCE: f64 = 0.001;

/// One elevation sample from the input stream
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ElevationSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Source classification code; the stream is pre-filtered by the caller
    pub classification: u8,
}

/// Sample-collection settings
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// Gather radius around each boundary vertex
    pub radius: f64,
    /// Surface footprints ignore interior samples closer than this to any
    /// boundary edge; 0 disables the filter
    pub inner_buffer: f64,
    /// Keep roughly 1-in-N interior samples; values <= 1 keep all
    pub downsample: u32,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            inner_buffer: 0.0,
            downsample: 1,
        }
    }
}

/// A classified 2D polygon being lifted into 3D
#[derive(Debug)]
pub struct Footprint {
    id: String,
    counter: u32,
    layer: String,
    class: FootprintClass,
    hard: bool,
    lift_mode: LiftMode,
    attributes: IndexMap<String, AttributeValue>,
    polygon: Polygon2,
    vertex_index: VertexIndex,
    /// BoundaryHeightGrid: one height (cm) per ring vertex
    heights: Vec<Vec<i32>>,
    /// ElevationSampleGrid: raw samples per ring vertex
    samples: Vec<Vec<Vec<i32>>>,
    /// Uniform-mode sample pool
    pool: Vec<i32>,
    /// InteriorSampleSet for surface footprints
    interior: Vec<Point3>,
    pub(crate) adjacent: Vec<FootprintId>,
    top_level: bool,
    walls_enabled: bool,
    height_unknown: bool,
    /// Final mesh buffers, filled by the pipeline
    pub mesh: Mesh,
    /// Constrained edges separating differing height bands
    pub break_lines: Vec<BreakLine>,
}

impl Footprint {
    /// Build a footprint from ring-major polygon text and attributes
    ///
    /// Fails only on structurally invalid geometry (a ring with fewer than
    /// 3 distinct vertices); such a footprint is skipped by the caller.
    pub(crate) fn new(
        counter: u32,
        polygon_text: &str,
        layer: &str,
        class: FootprintClass,
        attributes: IndexMap<String, AttributeValue>,
        id: &str,
    ) -> anyhow::Result<Self> {
        let polygon = parse_polygon(polygon_text)?;
        let vertex_index = VertexIndex::build(&polygon);
        let heights: Vec<Vec<i32>> = polygon.rings().map(|r| vec![NODATA; r.len()]).collect();
        let samples: Vec<Vec<Vec<i32>>> =
            polygon.rings().map(|r| vec![Vec::new(); r.len()]).collect();
        Ok(Self {
            id: id.to_string(),
            counter,
            layer: layer.to_string(),
            class,
            hard: class.default_hard(),
            lift_mode: class.lift_mode(),
            attributes,
            polygon,
            vertex_index,
            heights,
            samples,
            pool: Vec::new(),
            interior: Vec::new(),
            adjacent: Vec::new(),
            top_level: true,
            walls_enabled: matches!(class, FootprintClass::Building | FootprintClass::Bridge),
            height_unknown: false,
            mesh: Mesh::default(),
            break_lines: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn class(&self) -> FootprintClass {
        self.class
    }

    pub fn is_hard(&self) -> bool {
        self.hard
    }

    /// Override the trust classification derived from the class
    pub fn set_hard(&mut self, hard: bool) {
        self.hard = hard;
    }

    pub fn lift_mode(&self) -> LiftMode {
        self.lift_mode
    }

    pub fn polygon(&self) -> &Polygon2 {
        &self.polygon
    }

    pub fn bbox(&self) -> [f64; 4] {
        self.polygon.bbox()
    }

    pub fn attributes(&self) -> &IndexMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Attribute text with a fallback when absent or empty
    pub fn attribute_or<'a>(&'a self, name: &str, default: &'a str) -> String {
        match self.attributes.get(name) {
            Some(v) => {
                let text = v.as_text();
                if text.is_empty() {
                    default.to_string()
                } else {
                    text
                }
            }
            None => default.to_string(),
        }
    }

    pub fn top_level(&self) -> bool {
        self.top_level
    }

    pub fn set_top_level(&mut self, top_level: bool) {
        self.top_level = top_level;
    }

    pub fn walls_enabled(&self) -> bool {
        self.walls_enabled
    }

    pub fn enable_walls(&mut self) {
        self.walls_enabled = true;
    }

    pub fn height_unknown(&self) -> bool {
        self.height_unknown
    }

    pub fn adjacent(&self) -> &[FootprintId] {
        &self.adjacent
    }

    /// The reconciled per-vertex height grid (cm)
    pub fn height_grid(&self) -> &[Vec<i32>] {
        &self.heights
    }

    pub fn vertex_height(&self, ringi: usize, pi: usize) -> i32 {
        self.heights[ringi][pi]
    }

    pub fn set_vertex_height(&mut self, ringi: usize, pi: usize, z: i32) {
        self.heights[ringi][pi] = z;
    }

    pub fn ring_point(&self, ringi: usize, pi: usize) -> Point2 {
        self.polygon.ring(ringi)[pi]
    }

    /// Boundary vertex as a 3D point using its current height
    pub fn vertex_point3(&self, ringi: usize, pi: usize) -> Point3 {
        let p = self.ring_point(ringi, pi);
        Point3::new(p.x, p.y, cm_to_m(self.vertex_height(ringi, pi)))
    }

    pub fn interior_points(&self) -> &[Point3] {
        &self.interior
    }

    /// Gather one elevation sample into the footprint's height state
    ///
    /// Uniform footprints pool samples near the boundary or inside the
    /// polygon; per-vertex and surface footprints append to every boundary
    /// vertex within the radius. Surface footprints additionally keep a
    /// downsampled interior point set respecting the inner buffer.
    pub fn collect<R: Rng>(&mut self, s: &ElevationSample, cfg: &CollectConfig, rng: &mut R) {
        let p = Point2::new(s.x, s.y);
        let zcm = m_to_cm(s.z);
        match self.lift_mode {
            LiftMode::Uniform => {
                if self.vertex_index.any_within_radius(p, cfg.radius) || self.polygon.contains(p)
                {
                    self.pool.push(zcm);
                }
            }
            LiftMode::PerVertex => {
                self.collect_at_vertices(p, zcm, cfg.radius);
            }
            LiftMode::Surface => {
                self.collect_at_vertices(p, zcm, cfg.radius);
                let keep = cfg.downsample <= 1 || rng.gen_range(1..=cfg.downsample) == 1;
                if keep
                    && self.polygon.contains(p)
                    && (cfg.inner_buffer == 0.0
                        || self.polygon.distance_to_boundary(p) > cfg.inner_buffer)
                {
                    self.interior.push(Point3::new(s.x, s.y, s.z));
                }
            }
        }
    }

    fn collect_at_vertices(&mut self, p: Point2, zcm: i32, radius: f64) {
        for v in self.vertex_index.within_radius(p, radius) {
            self.samples[v.ring][v.vertex].push(zcm);
        }
    }

    /// Reduce collected samples to one discrete height per vertex
    ///
    /// Returns false when the footprint had no samples anywhere; its grid
    /// then stays at the sentinel and it is reported as height-unknown.
    pub fn lift(&mut self, percentile: f64) -> bool {
        match self.lift_mode {
            LiftMode::Uniform => self.lift_uniform(percentile),
            LiftMode::PerVertex | LiftMode::Surface => self.lift_per_vertex(percentile),
        }
    }

    /// Force every boundary vertex to one height (cm)
    pub fn lift_to_height(&mut self, zcm: i32) {
        for ring in &mut self.heights {
            for h in ring.iter_mut() {
                *h = zcm;
            }
        }
    }

    fn lift_uniform(&mut self, percentile: f64) -> bool {
        let z = percentile_of(&mut self.pool, percentile);
        self.pool = Vec::new();
        self.clear_samples();
        match z {
            Some(z) => {
                self.lift_to_height(z);
                true
            }
            None => {
                self.height_unknown = true;
                false
            }
        }
    }

    fn lift_per_vertex(&mut self, percentile: f64) -> bool {
        let mut total: i64 = 0;
        let mut count: i64 = 0;
        let mut has_empty = false;

        for (ringi, ring) in self.samples.iter_mut().enumerate() {
            for (i, pool) in ring.iter_mut().enumerate() {
                match percentile_of(pool, percentile) {
                    Some(z) => {
                        self.heights[ringi][i] = z;
                        total += z as i64;
                        count += 1;
                    }
                    None => {
                        self.heights[ringi][i] = NODATA;
                        has_empty = true;
                    }
                }
            }
        }

        if count == 0 {
            self.height_unknown = true;
            self.clear_samples();
            return false;
        }

        if has_empty {
            // vertices without samples get the footprint average
            let avg = (total / count) as i32;
            for ring in &mut self.heights {
                for h in ring.iter_mut() {
                    if *h == NODATA {
                        *h = avg;
                    }
                }
            }
        }
        self.clear_samples();
        true
    }

    /// Drop raw sample storage, keeping the grid shape
    fn clear_samples(&mut self) {
        for ring in &mut self.samples {
            for pool in ring.iter_mut() {
                *pool = Vec::new();
            }
        }
    }

    /// All (ring, vertex) positions within tolerance of `p`
    pub fn find_vertices(&self, p: Point2, tolerance: f64) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        for (ringi, ring) in self.polygon.rings().enumerate() {
            for (i, v) in ring.iter().enumerate() {
                if distance(p, *v) <= tolerance {
                    found.push((ringi, i));
                    break;
                }
            }
        }
        found
    }

    /// Locate the directed boundary edge `from -> to` within tolerance
    ///
    /// Returns ((ring, from_index), (ring, to_index)) of the matching edge.
    pub fn find_directed_edge(
        &self,
        from: Point2,
        to: Point2,
        tolerance: f64,
    ) -> Option<((usize, usize), (usize, usize))> {
        for (ringi, fi) in self.find_vertices(from, tolerance) {
            let ring = self.polygon.ring(ringi);
            let ti = (fi + 1) % ring.len();
            if distance(to, ring[ti]) <= tolerance {
                return Some(((ringi, fi), (ringi, ti)));
            }
        }
        None
    }
}
