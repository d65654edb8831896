//! Vertical connector walls between footprints of differing height
//!
//! Where neighboring footprints settle on different heights, the gap along
//! their shared edge is closed with vertical triangle strips. Every planar
//! location where footprints meet has a node column: the ascending list of
//! heights legitimately occurring there. Walls step through every
//! intermediate column level so adjoining strips share vertices exactly.

use super::reconcile::find_reverse_edge;
use crate::footprint::{cm_to_m, FootprintArena, FootprintClass, FootprintId, NODATA};
use crate::geometry::{point_key2, Point2, Point3};
use std::collections::BTreeMap;

/// Height ladders per rounded 2D location
///
/// Columns are append-only until [`NodeColumns::seal`] sorts and
/// deduplicates them; wall extrusion reads them strictly ascending.
#[derive(Debug, Default)]
pub struct NodeColumns {
    columns: BTreeMap<String, Vec<i32>>,
    sealed: bool,
}

impl NodeColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a height to the column at `p`; sentinel heights are ignored
    pub fn add(&mut self, p: Point2, zcm: i32) {
        debug_assert!(!self.sealed, "node columns are sealed");
        if zcm == NODATA {
            return;
        }
        self.columns.entry(point_key2(p)).or_default().push(zcm);
    }

    /// Register every boundary vertex height of every footprint
    pub fn populate(&mut self, arena: &FootprintArena) {
        for fp in arena.iter() {
            for ringi in 0..fp.polygon().num_rings() {
                for pi in 0..fp.polygon().ring(ringi).len() {
                    self.add(fp.ring_point(ringi, pi), fp.vertex_height(ringi, pi));
                }
            }
        }
    }

    /// Register the baseline at every building vertex, so facades without
    /// a matched neighbor can reach the ground
    pub fn register_baseline(&mut self, arena: &FootprintArena, baseline_cm: i32) {
        for fp in arena.iter() {
            if fp.class() != FootprintClass::Building {
                continue;
            }
            for ringi in 0..fp.polygon().num_rings() {
                for pi in 0..fp.polygon().ring(ringi).len() {
                    self.add(fp.ring_point(ringi, pi), baseline_cm);
                }
            }
        }
    }

    /// Sort and deduplicate all columns; no further appends allowed
    pub fn seal(&mut self) {
        for levels in self.columns.values_mut() {
            levels.sort_unstable();
            levels.dedup();
        }
        self.sealed = true;
    }

    /// Ascending height levels at `p`; empty when nothing meets there
    pub fn levels(&self, p: Point2) -> &[i32] {
        debug_assert!(self.sealed, "seal node columns before reading them");
        self.columns
            .get(&point_key2(p))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Extrude vertical walls for every wall-enabled footprint
///
/// `baseline_cm` substitutes for the comparison height on edges with no
/// matched neighbor.
pub fn extrude_walls(arena: &mut FootprintArena, columns: &NodeColumns, baseline_cm: i32) {
    let ids: Vec<FootprintId> = arena.ids().collect();
    for id in ids {
        if arena.get(id).walls_enabled() {
            construct_walls(arena, columns, id, baseline_cm);
        }
    }
}

fn position(levels: &[i32], z: i32) -> Option<usize> {
    levels.iter().position(|&v| v == z)
}

fn construct_walls(
    arena: &mut FootprintArena,
    columns: &NodeColumns,
    id: FootprintId,
    baseline_cm: i32,
) {
    let class = arena.get(id).class();
    let mut triangles: Vec<(Point3, Point3, Point3)> = Vec::new();

    for ringi in 0..arena.get(id).polygon().num_rings() {
        let n = arena.get(id).polygon().ring(ringi).len();
        for ai in 0..n {
            let bi = (ai + 1) % n;
            let fp = arena.get(id);
            let a = fp.ring_point(ringi, ai);
            let b = fp.ring_point(ringi, bi);

            let anc = columns.levels(a);
            let bnc = columns.levels(b);
            if anc.is_empty() && bnc.is_empty() {
                continue;
            }

            let az = fp.vertex_height(ringi, ai);
            let bz = fp.vertex_height(ringi, bi);
            if az == NODATA || bz == NODATA {
                continue;
            }

            let (fadj_az, fadj_bz, adj_class) = match find_reverse_edge(arena, fp, a, b) {
                Some((nid, aref, bref)) => {
                    let adj = arena.get(nid);
                    (
                        adj.vertex_height(aref.0, aref.1),
                        adj.vertex_height(bref.0, bref.1),
                        Some(adj.class()),
                    )
                }
                // AdjacencyNotFound: buildings fall back to the configured
                // baseline so facades reach the ground; everything else has
                // no wall to build on an unmatched edge
                None if class == FootprintClass::Building => (baseline_cm, baseline_cm, None),
                None => continue,
            };
            if fadj_az == NODATA || fadj_bz == NODATA {
                continue;
            }

            if class == FootprintClass::Bridge {
                // bridges extrude deck-to-underside: walk from the deck
                // height toward the neighbor's, exempt from the gate below
                let sa = position(anc, az);
                let ea = position(anc, fadj_az);
                let eb = position(bnc, fadj_bz);

                let a_base = Point3::new(a.x, a.y, cm_to_m(sa.map_or(az, |i| anc[i])));
                let mut sb = position(bnc, bz);
                while let Some(i) = sb {
                    if Some(i) == eb || i + 1 >= bnc.len() {
                        break;
                    }
                    let b_lower = Point3::new(b.x, b.y, cm_to_m(bnc[i]));
                    let b_upper = Point3::new(b.x, b.y, cm_to_m(bnc[i + 1]));
                    triangles.push((b_upper, a_base, b_lower));
                    sb = Some(i + 1);
                }

                let b_base = Point3::new(b.x, b.y, cm_to_m(eb.map_or(bz, |i| bnc[i])));
                let mut sa_walk = sa;
                while let Some(i) = sa_walk {
                    if Some(i) == ea || i + 1 >= anc.len() {
                        break;
                    }
                    let a_lower = Point3::new(a.x, a.y, cm_to_m(anc[i]));
                    let a_upper = Point3::new(a.x, a.y, cm_to_m(anc[i + 1]));
                    triangles.push((a_upper, a_lower, b_base));
                    sa_walk = Some(i + 1);
                }
            }

            // the bridge owns walls on edges it shares
            if adj_class == Some(FootprintClass::Bridge) {
                continue;
            }
            // only extrude downward from this footprint, and never for a
            // pure tie at both endpoints
            if az < fadj_az || bz < fadj_bz {
                continue;
            }
            if az == fadj_az && bz == fadj_bz {
                continue;
            }

            let sa = position(anc, fadj_az);
            let ea = position(anc, az);
            let eb = position(bnc, bz);

            let a_base = Point3::new(a.x, a.y, cm_to_m(sa.map_or(az, |i| anc[i])));
            let mut sb = position(bnc, fadj_bz);
            while let Some(i) = sb {
                if Some(i) == eb || i + 1 >= bnc.len() {
                    break;
                }
                let b_lower = Point3::new(b.x, b.y, cm_to_m(bnc[i]));
                let b_upper = Point3::new(b.x, b.y, cm_to_m(bnc[i + 1]));
                triangles.push((b_lower, a_base, b_upper));
                sb = Some(i + 1);
            }

            let b_top = Point3::new(b.x, b.y, cm_to_m(eb.map_or(bz, |i| bnc[i])));
            let mut sa_walk = sa;
            while let Some(i) = sa_walk {
                if Some(i) == ea || i + 1 >= anc.len() {
                    break;
                }
                let a_lower = Point3::new(a.x, a.y, cm_to_m(anc[i]));
                let a_upper = Point3::new(a.x, a.y, cm_to_m(anc[i + 1]));
                triangles.push((b_top, a_lower, a_upper));
                sa_walk = Some(i + 1);
            }
        }
    }

    let fp = arena.get_mut(id);
    for (p0, p1, p2) in triangles {
        fp.mesh.walls.add_triangle(p0, p1, p2);
    }
    if !fp.mesh.walls.triangles.is_empty() {
        fp.mesh.has_walls = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::FootprintClass;
    use indexmap::IndexMap;

    fn insert_square(
        arena: &mut FootprintArena,
        id: &str,
        x0: f64,
        class: FootprintClass,
        height_cm: i32,
    ) -> FootprintId {
        let text = format!(
            "POLYGON (({x0} 0, {x1} 0, {x1} 10, {x0} 10))",
            x0 = x0,
            x1 = x0 + 10.0
        );
        let fid = arena
            .insert(&text, "test", class, IndexMap::new(), id)
            .unwrap();
        arena.get_mut(fid).lift_to_height(height_cm);
        fid
    }

    #[test]
    fn test_wall_ladder_completeness() {
        let mut arena = FootprintArena::new();
        let hi = insert_square(&mut arena, "hi", 0.0, FootprintClass::Building, 500);
        let lo = insert_square(&mut arena, "lo", 10.0, FootprintClass::Terrain, 200);
        arena.link_mutual(hi, lo);

        let mut columns = NodeColumns::new();
        columns.populate(&arena);
        // other features meeting at the shared corners contribute levels
        for p in [Point2::new(10.0, 0.0), Point2::new(10.0, 10.0)] {
            columns.add(p, 300);
            columns.add(p, 400);
        }
        columns.seal();
        assert_eq!(columns.levels(Point2::new(10.0, 0.0)), &[200, 300, 400, 500]);

        extrude_walls(&mut arena, &columns, 0);

        let walls = &arena.get(hi).mesh.walls;
        assert_eq!(walls.triangles.len(), 6);
        assert!(arena.get(hi).mesh.has_walls);
        // the strip spans 200..500 with no gaps: every level pair appears
        // once per endpoint ladder
        let mut spans: Vec<(i64, i64)> = walls
            .triangles
            .iter()
            .map(|t| {
                let zs: Vec<i64> = [t.v0, t.v1, t.v2]
                    .iter()
                    .map(|&v| (walls.vertices.points[v as usize].z * 100.0).round() as i64)
                    .collect();
                (*zs.iter().min().unwrap(), *zs.iter().max().unwrap())
            })
            .collect();
        spans.sort_unstable();
        assert_eq!(
            spans,
            vec![
                (200, 300),
                (200, 400),
                (200, 500),
                (200, 500),
                (300, 500),
                (400, 500)
            ]
        );
        // the low neighbor has no walls of its own
        assert!(arena.get(lo).mesh.walls.triangles.is_empty());
    }

    #[test]
    fn test_pure_tie_is_skipped() {
        let mut arena = FootprintArena::new();
        let a = insert_square(&mut arena, "a", 0.0, FootprintClass::Building, 300);
        let b = insert_square(&mut arena, "b", 10.0, FootprintClass::Building, 300);
        arena.link_mutual(a, b);

        let mut columns = NodeColumns::new();
        columns.populate(&arena);
        columns.seal();
        extrude_walls(&mut arena, &columns, 0);
        assert!(arena.get(a).mesh.walls.triangles.is_empty());
        assert!(arena.get(b).mesh.walls.triangles.is_empty());
    }

    #[test]
    fn test_bridge_inverts_and_owns_shared_edges() {
        let mut arena = FootprintArena::new();
        let deck = insert_square(&mut arena, "deck", 0.0, FootprintClass::Bridge, 300);
        let high = insert_square(&mut arena, "high", 10.0, FootprintClass::Building, 600);
        arena.link_mutual(deck, high);

        let mut columns = NodeColumns::new();
        columns.populate(&arena);
        for p in [Point2::new(10.0, 0.0), Point2::new(10.0, 10.0)] {
            columns.add(p, 450);
        }
        columns.seal();
        extrude_walls(&mut arena, &columns, 0);

        // the bridge climbs 300 -> 450 -> 600 on both endpoint ladders,
        // exempt from the downward gate
        assert_eq!(arena.get(deck).mesh.walls.triangles.len(), 4);
        // the building skips the edge it shares with the bridge
        assert!(arena.get(high).mesh.walls.triangles.is_empty());
    }
}
