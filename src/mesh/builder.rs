//! Footprint surface triangulation
//!
//! Builds a constrained Delaunay triangulation whose constraints are the
//! footprint's ring edges, classifies interior versus hole faces by
//! ring-crossing parity from the outside, and emits the interior faces
//! into a deduplicated mesh buffer. Surface footprints additionally feed
//! their interior point set through the greedy simplifier first.
//!
//! The planar triangulation itself (robust orientation tests, edge flips)
//! is supplied by the `spade` crate.

use super::simplify::{greedy_insert, SimplifyOutcome};
use super::MeshBuffer;
use crate::footprint::cm_to_m;
use crate::geometry::{Point3, Polygon2};
use anyhow::Context;
use serde::Serialize;
use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, Point2 as SpadePoint, Triangulation};
use std::collections::{HashMap, VecDeque};

pub(crate) type Cdt = ConstrainedDelaunayTriangulation<SpadePoint<f64>>;

/// A constrained edge separating faces of differing height bands,
/// kept for contour/break-line export
#[derive(Debug, Clone, Serialize)]
pub struct BreakLine {
    pub a: Point3,
    pub b: Point3,
}

/// Mesh construction settings
#[derive(Debug, Clone)]
pub struct SurfaceMeshOptions {
    /// Target vertical error (metres) for interior point simplification;
    /// 0 inserts every interior point unsimplified
    pub simplify_threshold: f64,
    /// Hard budget on simplifier insertions
    pub max_insertions: usize,
    /// Band size (cm) for break-line classification
    pub breakline_band_cm: i32,
}

impl Default for SurfaceMeshOptions {
    fn default() -> Self {
        Self {
            simplify_threshold: 0.1,
            max_insertions: 50_000,
            breakline_band_cm: 100,
        }
    }
}

/// Result of triangulating one footprint
#[derive(Debug)]
pub struct SurfaceMesh {
    pub buffer: MeshBuffer,
    pub break_lines: Vec<BreakLine>,
    pub outcome: SimplifyOutcome,
}

/// Triangulate a footprint's interior
///
/// `heights` is the reconciled boundary height grid (cm), shaped like the
/// polygon. `interior` carries the surface sample set; it is empty for
/// non-surface footprints.
pub fn build_surface_mesh(
    polygon: &Polygon2,
    heights: &[Vec<i32>],
    interior: &[Point3],
    opts: &SurfaceMeshOptions,
) -> anyhow::Result<SurfaceMesh> {
    let mut cdt = Cdt::new();
    let mut zs: Vec<f64> = Vec::new();

    // ring vertices with their reconciled heights, constrained ring edges
    for (ringi, ring) in polygon.rings().enumerate() {
        let mut handles: Vec<FixedVertexHandle> = Vec::with_capacity(ring.len());
        for (pi, p) in ring.iter().enumerate() {
            let handle = cdt
                .insert(SpadePoint::new(p.x, p.y))
                .context("boundary vertex rejected by triangulation")?;
            set_z(&mut zs, handle, cm_to_m(heights[ringi][pi]));
            handles.push(handle);
        }
        for i in 0..handles.len() {
            let from = handles[i];
            let to = handles[(i + 1) % handles.len()];
            if from != to {
                cdt.add_constraint(from, to);
            }
        }
    }

    let outcome = if interior.is_empty() {
        SimplifyOutcome::untouched()
    } else if opts.simplify_threshold > 0.0 {
        greedy_insert(
            &mut cdt,
            &mut zs,
            interior,
            opts.simplify_threshold,
            opts.max_insertions,
        )
    } else {
        // no error bound requested: keep the full density
        for p in interior {
            if let Ok(handle) = cdt.insert(SpadePoint::new(p.x, p.y)) {
                set_z(&mut zs, handle, p.z);
            }
        }
        SimplifyOutcome::untouched()
    };

    let inside = classify_interior(&cdt);

    let mut buffer = MeshBuffer::default();
    for face in cdt.inner_faces() {
        if !inside.get(&face.fix()).copied().unwrap_or(false) {
            continue;
        }
        let [v0, v1, v2] = face.vertices();
        buffer.add_triangle(
            vertex_point(&zs, v0.fix(), v0.position()),
            vertex_point(&zs, v1.fix(), v1.position()),
            vertex_point(&zs, v2.fix(), v2.position()),
        );
    }

    let break_lines = collect_break_lines(&cdt, &zs, &inside, opts.breakline_band_cm);

    Ok(SurfaceMesh {
        buffer,
        break_lines,
        outcome,
    })
}

pub(crate) fn set_z(zs: &mut Vec<f64>, handle: FixedVertexHandle, z: f64) {
    let i = handle.index();
    if zs.len() <= i {
        zs.resize(i + 1, 0.0);
    }
    zs[i] = z;
}

fn vertex_point(zs: &[f64], handle: FixedVertexHandle, pos: SpadePoint<f64>) -> Point3 {
    Point3::new(pos.x, pos.y, zs[handle.index()])
}

/// Interior/hole classification by ring-crossing parity
///
/// Faces are flood-filled from the outer face; crossing a constrained
/// (ring) edge flips the nesting level. Odd level = inside the footprint.
fn classify_interior(cdt: &Cdt) -> HashMap<FixedFaceHandle<InnerTag>, bool> {
    let mut level: HashMap<FixedFaceHandle<InnerTag>, i32> = HashMap::new();
    let mut queue: VecDeque<FixedFaceHandle<InnerTag>> = VecDeque::new();

    // seed from every edge bordering the outer face
    for edge in cdt.directed_edges() {
        if edge.face().is_outer() {
            if let Some(inner) = edge.rev().face().as_inner() {
                let crossing = cdt.is_constraint_edge(edge.as_undirected().fix());
                let fixed = inner.fix();
                if !level.contains_key(&fixed) {
                    level.insert(fixed, if crossing { 1 } else { 0 });
                    queue.push_back(fixed);
                }
            }
        }
    }

    while let Some(fixed) = queue.pop_front() {
        let current = level[&fixed];
        for edge in cdt.face(fixed).adjacent_edges() {
            if let Some(neighbor) = edge.rev().face().as_inner() {
                let nf = neighbor.fix();
                if !level.contains_key(&nf) {
                    let crossing = cdt.is_constraint_edge(edge.as_undirected().fix());
                    level.insert(nf, current + if crossing { 1 } else { 0 });
                    queue.push_back(nf);
                }
            }
        }
    }

    level.into_iter().map(|(f, l)| (f, l % 2 == 1)).collect()
}

/// Constrained edges whose two adjoining interior faces fall in
/// differing height bands
fn collect_break_lines(
    cdt: &Cdt,
    zs: &[f64],
    inside: &HashMap<FixedFaceHandle<InnerTag>, bool>,
    band_cm: i32,
) -> Vec<BreakLine> {
    let mut lines = Vec::new();
    for edge in cdt.directed_edges() {
        // visit each undirected edge once
        if edge.from().fix().index() > edge.to().fix().index() {
            continue;
        }
        if !cdt.is_constraint_edge(edge.as_undirected().fix()) {
            continue;
        }
        let (Some(left), Some(right)) = (edge.face().as_inner(), edge.rev().face().as_inner())
        else {
            continue; // hull edges have nothing on the far side
        };
        // at least one side must belong to the footprint surface
        if !inside.get(&left.fix()).copied().unwrap_or(false)
            && !inside.get(&right.fix()).copied().unwrap_or(false)
        {
            continue;
        }
        if face_band(cdt, zs, left.fix(), band_cm) != face_band(cdt, zs, right.fix(), band_cm) {
            lines.push(BreakLine {
                a: vertex_point(zs, edge.from().fix(), edge.from().position()),
                b: vertex_point(zs, edge.to().fix(), edge.to().position()),
            });
        }
    }
    lines
}

fn face_band(cdt: &Cdt, zs: &[f64], face: FixedFaceHandle<InnerTag>, band_cm: i32) -> i32 {
    let mean: f64 = cdt
        .face(face)
        .vertices()
        .iter()
        .map(|v| zs[v.fix().index()])
        .sum::<f64>()
        / 3.0;
    let cm = (mean * 100.0).round() as i32;
    cm.div_euclid(band_cm.max(1))
}

/// Fitted plane of a face, evaluated at (x, y)
pub(crate) fn face_plane_z(cdt: &Cdt, zs: &[f64], face: FixedFaceHandle<InnerTag>, x: f64, y: f64) -> f64 {
    let face = cdt.face(face);
    let [v0, v1, v2] = face.vertices();
    let (p0, p1, p2) = (v0.position(), v1.position(), v2.position());
    let (z0, z1, z2) = (
        zs[v0.fix().index()],
        zs[v1.fix().index()],
        zs[v2.fix().index()],
    );

    let det = (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y);
    if det.abs() < 1e-12 {
        return z0;
    }
    let a = ((z1 - z0) * (p2.y - p0.y) - (z2 - z0) * (p1.y - p0.y)) / det;
    let b = ((p1.x - p0.x) * (z2 - z0) - (p2.x - p0.x) * (z1 - z0)) / det;
    z0 + a * (x - p0.x) + b * (y - p0.y)
}
