//! Per-footprint lifting pipeline
//!
//! Drives the stages in order: percentile reduction and spike smoothing
//! (footprint-local, parallel), bow-tie reconciliation (sequential, it
//! mutates neighbors), node-column population and sealing, vertical wall
//! extrusion (sequential), and finally meshing with optional
//! simplification (local, parallel again).
//!
//! A footprint without any elevation samples is reported and skipped by
//! the later stages; nothing halts the run.

use crate::footprint::{
    CollectConfig, ElevationSample, FootprintArena, FootprintId, LiftMode, NODATA,
};
use crate::lift::{
    extrude_walls, find_reverse_edge, reconcile, relax_boundary, smooth_spikes, NodeColumns,
};
use crate::mesh::{build_surface_mesh, SurfaceMeshOptions};
use log::{info, warn};
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;

/// Settings for a full pipeline run
#[derive(Debug, Clone)]
pub struct LiftConfig {
    pub collect: CollectConfig,
    /// Percentile for pooled reduction (buildings, water)
    pub uniform_percentile: f64,
    /// Percentile for per-vertex reduction (roads, terrain boundaries)
    pub vertex_percentile: f64,
    /// Turning-angle threshold for spike smoothing, degrees
    pub spike_angle_deg: f64,
    pub smoothing_passes: u32,
    /// Extra neighbor-averaging passes after spike smoothing
    pub relax_passes: u32,
    /// Ground level (cm) used when a wall edge has no matched neighbor
    pub baseline_cm: i32,
    pub mesh: SurfaceMeshOptions,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            collect: CollectConfig::default(),
            uniform_percentile: 0.9,
            vertex_percentile: 0.5,
            spike_angle_deg: 90.0,
            smoothing_passes: 1,
            relax_passes: 0,
            baseline_cm: 0,
            mesh: SurfaceMeshOptions::default(),
        }
    }
}

/// What a run did, and what it had to work around
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// Footprints with a reduced height grid
    pub lifted: usize,
    /// Footprints with no samples anywhere; left at the sentinel height
    pub missing_height: Vec<String>,
    /// Footprints with a surface mesh
    pub meshed: usize,
    /// Footprints that produced wall geometry
    pub wall_footprints: usize,
    /// (id, residual error) where the simplifier hit its point budget
    pub simplifier_residuals: Vec<(String, f64)>,
    /// Footprints whose triangulation failed outright
    pub mesh_failures: Vec<String>,
}

/// Feed a pre-filtered sample stream into the arena
///
/// The caller decides which footprints see which sample; this just routes
/// the tuples through [`crate::footprint::Footprint::collect`].
pub fn collect_stream<R: Rng>(
    arena: &mut FootprintArena,
    samples: impl IntoIterator<Item = (FootprintId, ElevationSample)>,
    cfg: &CollectConfig,
    rng: &mut R,
) {
    for (id, sample) in samples {
        arena.get_mut(id).collect(&sample, cfg, rng);
    }
}

/// Run every stage after sample collection
pub fn run(arena: &mut FootprintArena, config: &LiftConfig) -> RunReport {
    let mut report = RunReport::default();

    // reduction and smoothing touch only local state
    let uniform = config.uniform_percentile;
    let vertex = config.vertex_percentile;
    arena.as_mut_slice().par_iter_mut().for_each(|fp| {
        let percentile = match fp.lift_mode() {
            LiftMode::Uniform => uniform,
            LiftMode::PerVertex | LiftMode::Surface => vertex,
        };
        if fp.lift(percentile) {
            smooth_spikes(fp, config.spike_angle_deg, config.smoothing_passes);
            if config.relax_passes > 0 {
                relax_boundary(fp, config.relax_passes);
            }
        }
    });
    for fp in arena.iter() {
        if fp.height_unknown() {
            warn!("footprint {} has no elevation samples anywhere", fp.id());
            report.missing_height.push(fp.id().to_string());
        }
    }
    report.lifted = arena.len() - report.missing_height.len();

    // reconciliation and walls mutate neighbors; keep them sequential
    reconcile(arena);
    enable_walls_on_divergence(arena);

    let mut columns = NodeColumns::new();
    columns.populate(arena);
    columns.register_baseline(arena, config.baseline_cm);
    columns.seal();
    extrude_walls(arena, &columns, config.baseline_cm);

    // meshing is footprint-local again
    let mesh_opts = config.mesh.clone();
    let outcomes: Vec<(String, Option<anyhow::Result<crate::mesh::SimplifyOutcome>>)> = arena
        .as_mut_slice()
        .par_iter_mut()
        .map(|fp| {
            if fp.height_unknown() {
                return (fp.id().to_string(), None);
            }
            let built =
                build_surface_mesh(fp.polygon(), fp.height_grid(), fp.interior_points(), &mesh_opts);
            match built {
                Ok(surface) => {
                    fp.mesh.surface = surface.buffer;
                    fp.break_lines = surface.break_lines;
                    (fp.id().to_string(), Some(Ok(surface.outcome)))
                }
                Err(e) => (fp.id().to_string(), Some(Err(e))),
            }
        })
        .collect();

    for (id, outcome) in outcomes {
        match outcome {
            Some(Ok(outcome)) => {
                report.meshed += 1;
                if !outcome.converged {
                    report
                        .simplifier_residuals
                        .push((id, outcome.residual_error));
                }
            }
            Some(Err(e)) => {
                warn!("triangulation failed for footprint {}: {:#}", id, e);
                report.mesh_failures.push(id);
            }
            None => {}
        }
    }
    report.wall_footprints = arena.iter().filter(|fp| fp.mesh.has_walls).count();

    info!(
        "lifted {} footprints, meshed {}, {} with walls, {} without height",
        report.lifted,
        report.meshed,
        report.wall_footprints,
        report.missing_height.len()
    );
    report
}

/// Enable wall synthesis on both sides of every shared edge whose heights
/// still differ after reconciliation
fn enable_walls_on_divergence(arena: &mut FootprintArena) {
    let ids: Vec<FootprintId> = arena.ids().collect();
    for id in ids {
        for ringi in 0..arena.get(id).polygon().num_rings() {
            let n = arena.get(id).polygon().ring(ringi).len();
            for ai in 0..n {
                let bi = (ai + 1) % n;
                let fp = arena.get(id);
                let a = fp.ring_point(ringi, ai);
                let b = fp.ring_point(ringi, bi);
                let Some((nid, aref, bref)) = find_reverse_edge(arena, fp, a, b) else {
                    continue;
                };
                if nid == id {
                    continue;
                }
                let az = fp.vertex_height(ringi, ai);
                let bz = fp.vertex_height(ringi, bi);
                let adj = arena.get(nid);
                let fadj_az = adj.vertex_height(aref.0, aref.1);
                let fadj_bz = adj.vertex_height(bref.0, bref.1);
                if az == NODATA || bz == NODATA || fadj_az == NODATA || fadj_bz == NODATA {
                    continue;
                }
                if az != fadj_az || bz != fadj_bz {
                    arena.get_mut(id).enable_walls();
                    arena.get_mut(nid).enable_walls();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::FootprintClass;
    use indexmap::IndexMap;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample(x: f64, y: f64, z: f64) -> ElevationSample {
        ElevationSample {
            x,
            y,
            z,
            classification: 2,
        }
    }

    #[test]
    fn test_missing_data_is_reported_not_fatal() {
        let mut arena = FootprintArena::new();
        let t = arena
            .insert(
                "POLYGON ((0 0, 10 0, 10 10, 0 10))",
                "terrain",
                FootprintClass::Terrain,
                IndexMap::new(),
                "t1",
            )
            .unwrap();
        let orphan = arena
            .insert(
                "POLYGON ((50 50, 60 50, 60 60, 50 60))",
                "terrain",
                FootprintClass::Terrain,
                IndexMap::new(),
                "orphan",
            )
            .unwrap();

        let config = LiftConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut samples = Vec::new();
        for i in 0..=10 {
            for j in 0..=10 {
                samples.push((t, sample(i as f64, j as f64, 5.0)));
            }
        }
        collect_stream(&mut arena, samples, &config.collect, &mut rng);

        let report = run(&mut arena, &config);
        assert_eq!(report.missing_height, vec!["orphan".to_string()]);
        assert_eq!(report.lifted, 1);
        assert_eq!(report.meshed, 1);
        assert!(report.mesh_failures.is_empty());
        // the orphan keeps its sentinel grid and produces no mesh
        assert_eq!(arena.get(orphan).vertex_height(0, 0), NODATA);
        assert!(arena.get(orphan).mesh.surface.triangles.is_empty());
        // the sampled terrain meshes at 5 m
        let meshed = arena.get(t);
        assert!(!meshed.mesh.surface.triangles.is_empty());
        assert!(meshed
            .mesh
            .surface
            .vertices
            .points
            .iter()
            .all(|p| (p.z - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_building_rises_above_terrain_with_walls() {
        let mut arena = FootprintArena::new();
        let b = arena
            .insert(
                "POLYGON ((0 0, 10 0, 10 10, 0 10))",
                "buildings",
                FootprintClass::Building,
                IndexMap::new(),
                "b1",
            )
            .unwrap();
        let t = arena
            .insert(
                "POLYGON ((10 0, 20 0, 20 10, 10 10))",
                "terrain",
                FootprintClass::Terrain,
                IndexMap::new(),
                "t1",
            )
            .unwrap();
        arena.link_mutual(b, t);

        let config = LiftConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut samples = Vec::new();
        // roof returns at 9 m over the building
        for i in 0..=10 {
            for j in 0..=10 {
                samples.push((b, sample(i as f64, j as f64, 9.0)));
            }
        }
        // ground returns at 1 m over the terrain
        for i in 10..=20 {
            for j in 0..=10 {
                samples.push((t, sample(i as f64, j as f64, 1.0)));
            }
        }
        collect_stream(&mut arena, samples, &config.collect, &mut rng);

        let report = run(&mut arena, &config);
        assert_eq!(report.lifted, 2);
        assert_eq!(report.meshed, 2);
        assert_eq!(report.wall_footprints, 1);

        let building = arena.get(b);
        assert!(building.mesh.has_walls);
        assert!(!building.mesh.walls.triangles.is_empty());
        // walls span the 1 m..9 m gap on the shared edge
        let zs: Vec<f64> = building
            .mesh
            .walls
            .vertices
            .points
            .iter()
            .map(|p| p.z)
            .collect();
        assert!(zs.iter().any(|&z| (z - 9.0).abs() < 1e-9));
        assert!(zs.iter().any(|&z| (z - 1.0).abs() < 1e-9));
        assert!(!arena.get(t).mesh.has_walls);
    }
}
