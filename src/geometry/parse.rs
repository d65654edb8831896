//! Ring-major polygon text notation parsing
//!
//! Footprint geometry arrives as `POLYGON ((x y, x y, ...), (x y, ...))`:
//! the first ring is the outer boundary, any further rings are holes.
//! Parsed polygons are normalized (duplicates removed, outer ring CCW,
//! inner rings CW) before they are returned.

use super::types::{Point2, Polygon2, Ring};
use anyhow::{bail, ensure, Context};

/// Parse ring-major polygon notation into a normalized [`Polygon2`]
///
/// Fails if the text is malformed or any ring has fewer than 3 distinct
/// vertices; a footprint with such a ring is structurally invalid and must
/// be skipped by the caller.
pub fn parse_polygon(text: &str) -> anyhow::Result<Polygon2> {
    let trimmed = text.trim();
    let rest = trimmed
        .strip_prefix("POLYGON")
        .or_else(|| trimmed.strip_prefix("polygon"))
        .unwrap_or(trimmed)
        .trim();

    ensure!(
        rest.starts_with('(') && rest.ends_with(')'),
        "polygon notation must be parenthesized: '{}'",
        text
    );
    let body = &rest[1..rest.len() - 1];

    let mut rings: Vec<Ring> = Vec::new();
    for ring_text in split_rings(body)? {
        rings.push(parse_ring(ring_text)?);
    }
    ensure!(!rings.is_empty(), "polygon has no rings: '{}'", text);

    let outer = rings.remove(0);
    let mut polygon = Polygon2::new(outer, rings);
    polygon.normalize();

    for (ringi, ring) in polygon.rings().enumerate() {
        ensure!(
            ring.len() >= 3,
            "ring {} has fewer than 3 distinct vertices",
            ringi
        );
    }
    Ok(polygon)
}

/// Split the polygon body into per-ring slices, respecting parentheses
fn split_rings(body: &str) -> anyhow::Result<Vec<&str>> {
    let mut rings = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    for (i, c) in body.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = Some(i + 1);
                }
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    bail!("unbalanced ')' in polygon notation");
                }
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        rings.push(&body[s..i]);
                    }
                }
            }
            _ => {}
        }
    }
    ensure!(depth == 0, "unbalanced '(' in polygon notation");
    Ok(rings)
}

fn parse_ring(text: &str) -> anyhow::Result<Ring> {
    let mut ring = Ring::new();
    for pair in text.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let mut coords = pair.split_whitespace();
        let x: f64 = coords
            .next()
            .context("missing x coordinate")?
            .parse()
            .with_context(|| format!("bad x coordinate in '{}'", pair))?;
        let y: f64 = coords
            .next()
            .context("missing y coordinate")?
            .parse()
            .with_context(|| format!("bad y coordinate in '{}'", pair))?;
        ring.push(Point2::new(x, y));
    }
    Ok(ring)
}
