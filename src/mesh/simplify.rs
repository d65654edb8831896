//! Greedy error-driven point insertion
//!
//! Surface footprints start from their boundary triangulation alone and
//! grow it point by point: the interior sample with the largest vertical
//! error against the current surface is inserted, errors are recomputed
//! only for samples whose containing face changed, and insertion stops
//! once the worst remaining error drops under the threshold. Density is
//! bounded by approximation quality, not by a fixed ratio.

use super::builder::{face_plane_z, set_z, Cdt};
use crate::geometry::Point3;
use log::{debug, warn};
use serde::Serialize;
use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{Point2 as SpadePoint, PositionInTriangulation, Triangulation};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// How a simplification run ended
#[derive(Debug, Clone, Serialize)]
pub struct SimplifyOutcome {
    /// Interior points inserted into the triangulation
    pub inserted: usize,
    /// Worst vertical error still uncorrected (metres)
    pub residual_error: f64,
    /// False when the point budget ran out above the threshold
    pub converged: bool,
}

impl SimplifyOutcome {
    pub(crate) fn untouched() -> Self {
        Self {
            inserted: 0,
            residual_error: 0.0,
            converged: true,
        }
    }
}

struct Candidate {
    point: SpadePoint<f64>,
    z: f64,
    owner: FixedFaceHandle<InnerTag>,
    error: f64,
    generation: u64,
    alive: bool,
}

/// Max-heap entry; stale generations are skipped on pop
struct HeapEntry {
    error: f64,
    candidate: usize,
    generation: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // deterministic: ties broken by candidate index
        self.error
            .total_cmp(&other.error)
            .then_with(|| other.candidate.cmp(&self.candidate))
    }
}

/// Insert interior points until the worst error is below `threshold`
///
/// `zs` maps triangulation vertex indices to heights and is extended for
/// every inserted point.
pub(crate) fn greedy_insert(
    cdt: &mut Cdt,
    zs: &mut Vec<f64>,
    points: &[Point3],
    threshold: f64,
    max_insertions: usize,
) -> SimplifyOutcome {
    let mut candidates: Vec<Candidate> = Vec::with_capacity(points.len());
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
    let mut face_points: HashMap<FixedFaceHandle<InnerTag>, Vec<usize>> = HashMap::new();

    for p in points {
        let point = SpadePoint::new(p.x, p.y);
        let Some(owner) = containing_face(cdt, point) else {
            continue; // on a vertex or outside the hull: nothing to correct
        };
        let error = (p.z - face_plane_z(cdt, zs, owner, p.x, p.y)).abs();
        let idx = candidates.len();
        candidates.push(Candidate {
            point,
            z: p.z,
            owner,
            error,
            generation: 0,
            alive: true,
        });
        face_points.entry(owner).or_default().push(idx);
        heap.push(HeapEntry {
            error,
            candidate: idx,
            generation: 0,
        });
    }

    let mut inserted = 0usize;
    while let Some(entry) = heap.pop() {
        let cand = &candidates[entry.candidate];
        if !cand.alive || cand.generation != entry.generation {
            continue;
        }

        // the owning face may have been retriangulated since this entry
        // was queued; relocate before trusting the error
        if !face_contains(cdt, cand.owner, cand.point) {
            let idx = entry.candidate;
            requeue(cdt, zs, &mut candidates, &mut face_points, &mut heap, idx);
            continue;
        }

        if cand.error < threshold {
            return SimplifyOutcome {
                inserted,
                residual_error: cand.error,
                converged: true,
            };
        }
        if inserted >= max_insertions {
            warn!(
                "simplifier stopped at {} insertions with residual error {:.3}",
                inserted, cand.error
            );
            return SimplifyOutcome {
                inserted,
                residual_error: cand.error,
                converged: false,
            };
        }

        // gather every candidate owned by a face the insertion will destroy
        let region = conflict_faces(cdt, cand.owner, cand.point);
        let mut affected: Vec<usize> = Vec::new();
        for face in &region {
            if let Some(list) = face_points.remove(face) {
                affected.extend(list);
            }
        }

        let idx = entry.candidate;
        let (point, z) = (candidates[idx].point, candidates[idx].z);
        candidates[idx].alive = false;
        match cdt.insert(point) {
            Ok(handle) => {
                set_z(zs, handle, z);
                inserted += 1;
            }
            Err(e) => {
                // the point is dropped; its neighbors still requeue so the
                // face index stays consistent
                debug!("interior point rejected by triangulation: {}", e);
            }
        }

        for aidx in affected {
            if aidx == idx || !candidates[aidx].alive {
                continue;
            }
            requeue(cdt, zs, &mut candidates, &mut face_points, &mut heap, aidx);
        }
    }

    SimplifyOutcome {
        inserted,
        residual_error: 0.0,
        converged: true,
    }
}

/// Relocate a candidate, recompute its error, and queue a fresh entry
fn requeue(
    cdt: &Cdt,
    zs: &[f64],
    candidates: &mut [Candidate],
    face_points: &mut HashMap<FixedFaceHandle<InnerTag>, Vec<usize>>,
    heap: &mut BinaryHeap<HeapEntry>,
    idx: usize,
) {
    let point = candidates[idx].point;
    let Some(owner) = containing_face(cdt, point) else {
        candidates[idx].alive = false;
        return;
    };
    let error = (candidates[idx].z - face_plane_z(cdt, zs, owner, point.x, point.y)).abs();
    let cand = &mut candidates[idx];
    cand.owner = owner;
    cand.error = error;
    cand.generation += 1;
    face_points.entry(owner).or_default().push(idx);
    heap.push(HeapEntry {
        error,
        candidate: idx,
        generation: cand.generation,
    });
}

/// The inner face containing `point`, if any
fn containing_face(cdt: &Cdt, point: SpadePoint<f64>) -> Option<FixedFaceHandle<InnerTag>> {
    match cdt.locate(point) {
        PositionInTriangulation::OnFace(face) => Some(face),
        PositionInTriangulation::OnEdge(edge) => {
            let edge = cdt.directed_edge(edge);
            edge.face()
                .as_inner()
                .or_else(|| edge.rev().face().as_inner())
                .map(|f| f.fix())
        }
        _ => None,
    }
}

/// Point-in-triangle test with a small tolerance on the edges
fn face_contains(cdt: &Cdt, face: FixedFaceHandle<InnerTag>, p: SpadePoint<f64>) -> bool {
    let positions = cdt.face(face).positions();
    for i in 0..3 {
        let a = positions[i];
        let b = positions[(i + 1) % 3];
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        if cross < -1e-9 {
            return false;
        }
    }
    true
}

/// Faces whose cavity the insertion of `p` will retriangulate
///
/// Flood-fills from the containing face across non-constraint edges into
/// faces whose circumcircle contains `p` -- the standard Delaunay conflict
/// region, bounded by constrained edges.
fn conflict_faces(
    cdt: &Cdt,
    start: FixedFaceHandle<InnerTag>,
    p: SpadePoint<f64>,
) -> Vec<FixedFaceHandle<InnerTag>> {
    let mut region = vec![start];
    let mut seen: HashSet<FixedFaceHandle<InnerTag>> = HashSet::from([start]);
    let mut queue: VecDeque<FixedFaceHandle<InnerTag>> = VecDeque::from([start]);

    while let Some(face) = queue.pop_front() {
        for edge in cdt.face(face).adjacent_edges() {
            if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                continue;
            }
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let fixed = neighbor.fix();
            if seen.contains(&fixed) {
                continue;
            }
            if in_circumcircle(neighbor.positions(), p) {
                seen.insert(fixed);
                region.push(fixed);
                queue.push_back(fixed);
            }
        }
    }
    region
}

fn in_circumcircle(tri: [SpadePoint<f64>; 3], p: SpadePoint<f64>) -> bool {
    let m: [[f64; 3]; 3] = std::array::from_fn(|i| {
        let dx = tri[i].x - p.x;
        let dy = tri[i].y - p.y;
        [dx, dy, dx * dx + dy * dy]
    });
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    det > 0.0
}
