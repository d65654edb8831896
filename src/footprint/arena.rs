//! Footprint arena and adjacency handles
//!
//! Adjacent footprints form a cyclic reference graph; the arena breaks it
//! by handing out plain index handles instead of owning pointers. The
//! arena also owns the sequential counter stamped onto each footprint.

use super::feature::Footprint;
use super::{AttributeValue, FootprintClass};
use indexmap::IndexMap;
use serde::Serialize;

/// Handle to a footprint in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FootprintId(pub u32);

/// Central owner of all footprints in a run
#[derive(Debug, Default)]
pub struct FootprintArena {
    footprints: Vec<Footprint>,
    next_counter: u32,
}

impl FootprintArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a footprint from polygon text and add it to the arena
    ///
    /// The arena issues the sequential counter. Fails only on structurally
    /// invalid geometry; the arena is unchanged in that case.
    pub fn insert(
        &mut self,
        polygon_text: &str,
        layer: &str,
        class: FootprintClass,
        attributes: IndexMap<String, AttributeValue>,
        id: &str,
    ) -> anyhow::Result<FootprintId> {
        let counter = self.next_counter;
        let footprint = Footprint::new(counter, polygon_text, layer, class, attributes, id)?;
        self.next_counter += 1;
        self.footprints.push(footprint);
        Ok(FootprintId(self.footprints.len() as u32 - 1))
    }

    /// Record that `from` shares a directed edge with `to`
    pub fn link(&mut self, from: FootprintId, to: FootprintId) {
        let adj = &mut self.footprints[from.0 as usize].adjacent;
        if !adj.contains(&to) {
            adj.push(to);
        }
    }

    /// Record adjacency in both directions
    pub fn link_mutual(&mut self, a: FootprintId, b: FootprintId) {
        self.link(a, b);
        self.link(b, a);
    }

    pub fn get(&self, id: FootprintId) -> &Footprint {
        &self.footprints[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: FootprintId) -> &mut Footprint {
        &mut self.footprints[id.0 as usize]
    }

    /// Mutable access to two distinct footprints at once
    pub fn pair_mut(
        &mut self,
        a: FootprintId,
        b: FootprintId,
    ) -> (&mut Footprint, &mut Footprint) {
        let (ai, bi) = (a.0 as usize, b.0 as usize);
        assert_ne!(ai, bi, "pair_mut requires two distinct footprints");
        if ai < bi {
            let (lo, hi) = self.footprints.split_at_mut(bi);
            (&mut lo[ai], &mut hi[0])
        } else {
            let (lo, hi) = self.footprints.split_at_mut(ai);
            (&mut hi[0], &mut lo[bi])
        }
    }

    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FootprintId> {
        (0..self.footprints.len() as u32).map(FootprintId)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Footprint> {
        self.footprints.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Footprint> {
        self.footprints.iter_mut()
    }

    /// All footprints as one slice, for parallel per-footprint stages
    pub fn as_mut_slice(&mut self) -> &mut [Footprint] {
        &mut self.footprints
    }
}
