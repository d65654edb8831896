//! Cross-footprint height reconciliation (bow-tie correction)
//!
//! Two footprints sharing an edge can disagree about its endpoint heights
//! after independent lifting. When one footprint is higher at one endpoint
//! and lower at the other, the two lifted surfaces cross between the
//! endpoints -- a "bow-tie". Reconciliation snaps one endpoint so the
//! height difference no longer changes sign along the shared edge.

use crate::footprint::{Footprint, FootprintArena, FootprintId, NODATA, VERTEX_TOLERANCE};
use crate::geometry::Point2;

/// Fix bow-ties across every footprint's shared edges
///
/// Idempotent: running it again on an unchanged adjacency graph is a
/// no-op, because every resolution equalizes heights at one endpoint.
pub fn reconcile(arena: &mut FootprintArena) {
    let ids: Vec<FootprintId> = arena.ids().collect();
    for id in ids {
        fix_bowties(arena, id);
    }
}

/// Locate the neighbor exposing the reverse edge `b -> a`
///
/// Returns the neighbor id and the (ring, vertex) positions of `a` and `b`
/// on the neighbor's boundary.
pub(crate) fn find_reverse_edge(
    arena: &FootprintArena,
    fp: &Footprint,
    a: Point2,
    b: Point2,
) -> Option<(FootprintId, (usize, usize), (usize, usize))> {
    for &nid in fp.adjacent() {
        if let Some((bref, aref)) = arena.get(nid).find_directed_edge(b, a, VERTEX_TOLERANCE) {
            return Some((nid, aref, bref));
        }
    }
    None
}

/// Fix bow-ties on all directed boundary edges of one footprint
pub fn fix_bowties(arena: &mut FootprintArena, id: FootprintId) {
    for ringi in 0..arena.get(id).polygon().num_rings() {
        let n = arena.get(id).polygon().ring(ringi).len();
        for ai in 0..n {
            let bi = (ai + 1) % n;
            let a = arena.get(id).ring_point(ringi, ai);
            let b = arena.get(id).ring_point(ringi, bi);

            let Some((nid, aref, bref)) = find_reverse_edge(arena, arena.get(id), a, b) else {
                continue; // AdjacencyNotFound: nothing to reconcile on this edge
            };
            if nid == id {
                continue;
            }

            let (f, fadj) = arena.pair_mut(id, nid);
            let az = f.vertex_height(ringi, ai);
            let bz = f.vertex_height(ringi, bi);
            let fadj_az = fadj.vertex_height(aref.0, aref.1);
            let fadj_bz = fadj.vertex_height(bref.0, bref.1);
            if az == NODATA || bz == NODATA || fadj_az == NODATA || fadj_bz == NODATA {
                continue; // sentinel heights impose no constraint
            }

            let crossing = (az > fadj_az && bz < fadj_bz) || (az < fadj_az && bz > fadj_bz);
            if !crossing {
                continue;
            }

            let da = (az - fadj_az).abs();
            let db = (bz - fadj_bz).abs();

            if f.is_hard() && !fadj.is_hard() {
                // soft neighbor yields: its smaller-discrepancy endpoint
                // snaps to the hard side's value
                if da < db {
                    fadj.set_vertex_height(aref.0, aref.1, az);
                } else {
                    fadj.set_vertex_height(bref.0, bref.1, bz);
                }
            } else if !f.is_hard() && fadj.is_hard() {
                if da < db {
                    f.set_vertex_height(ringi, ai, fadj_az);
                } else {
                    f.set_vertex_height(ringi, bi, fadj_bz);
                }
            } else {
                // equal trust: at the smaller-discrepancy endpoint the
                // lower height snaps up to the higher one
                if da < db {
                    if az < fadj_az {
                        f.set_vertex_height(ringi, ai, fadj_az);
                    } else {
                        fadj.set_vertex_height(aref.0, aref.1, az);
                    }
                } else if bz < fadj_bz {
                    f.set_vertex_height(ringi, bi, fadj_bz);
                } else {
                    fadj.set_vertex_height(bref.0, bref.1, bz);
                }
            }
        }
    }
}
