//! Boundary elevation smoothing
//!
//! Percentile reduction leaves occasional single-vertex spikes where a
//! stray sample (a tree crown, a vehicle) dominated one vertex pool. The
//! smoother walks each ring, measures the vertical turning angle at every
//! vertex, and snaps the outlier of each sharp turn back to its neighbors.

use crate::footprint::{cm_to_m, Footprint, NODATA};
use crate::geometry::distance;
use std::f64::consts::PI;

/// Correct single-vertex elevation spikes on all rings
///
/// The turning angle between the incoming and outgoing edge slopes is
/// computed with `atan2` and normalized to (-180, 180] degrees. When its
/// magnitude exceeds `max_angle_deg`, the extreme height farther from the
/// median of the three is the outlier: a neighbor outlier snaps to the
/// center vertex's height, a center outlier snaps to the neighbor average.
///
/// Corrections are applied immediately, so edits compound within a pass;
/// only a single pass is guaranteed locally stable.
pub fn smooth_spikes(fp: &mut Footprint, max_angle_deg: f64, passes: u32) {
    for _ in 0..passes {
        for ringi in 0..fp.polygon().num_rings() {
            let n = fp.polygon().ring(ringi).len();
            if n < 3 {
                continue;
            }
            for i in 0..n {
                let i0 = (i + n - 1) % n;
                let i2 = (i + 1) % n;

                let z0 = fp.vertex_height(ringi, i0);
                let z = fp.vertex_height(ringi, i);
                let z2 = fp.vertex_height(ringi, i2);
                if z0 == NODATA || z == NODATA || z2 == NODATA {
                    continue;
                }

                let p0 = fp.ring_point(ringi, i0);
                let p = fp.ring_point(ringi, i);
                let p2 = fp.ring_point(ringi, i2);
                let run1 = distance(p0, p);
                let run2 = distance(p, p2);
                let rise1 = cm_to_m(z - z0);
                let rise2 = cm_to_m(z2 - z);

                let mut incline = rise2.atan2(run2) - rise1.atan2(run1);
                if incline <= -PI {
                    incline += 2.0 * PI;
                }
                if incline > PI {
                    incline -= 2.0 * PI;
                }

                if incline.to_degrees().abs() > max_angle_deg {
                    // the extreme farther from the median is the outlier
                    let mut sorted = [z0, z, z2];
                    sorted.sort_unstable();
                    let outlier = if (sorted[2] - sorted[1]).abs() > (sorted[0] - sorted[1]).abs()
                    {
                        sorted[2]
                    } else {
                        sorted[0]
                    };
                    if z0 == outlier {
                        fp.set_vertex_height(ringi, i0, z);
                    } else if z == outlier {
                        fp.set_vertex_height(ringi, i, (z0 + z2) / 2);
                    } else if z2 == outlier {
                        fp.set_vertex_height(ringi, i2, z);
                    }
                }
            }
        }
    }
}

/// Neighbor-averaging relaxation of ring heights
///
/// Each vertex moves to the mean of its two ring neighbors, evaluated on
/// the heights from the start of the pass.
pub fn relax_boundary(fp: &mut Footprint, passes: u32) {
    for _ in 0..passes {
        for ringi in 0..fp.polygon().num_rings() {
            let n = fp.polygon().ring(ringi).len();
            if n < 3 {
                continue;
            }
            let snapshot: Vec<i32> = (0..n).map(|i| fp.vertex_height(ringi, i)).collect();
            if snapshot.iter().any(|&z| z == NODATA) {
                continue;
            }
            for i in 0..n {
                let prev = snapshot[(i + n - 1) % n];
                let next = snapshot[(i + 1) % n];
                fp.set_vertex_height(ringi, i, (prev + next) / 2);
            }
        }
    }
}
