//! Slicing plane generation and the edge-plane crossing index.

use std::collections::BTreeSet;

use strata_mesh::{EdgeId, Topology};

use crate::error::{Result, SlicerError};

/// Upper bound on the number of slicing planes in one run.
pub const MAX_PLANES: usize = 1_000_000;

/// Heights `z_min + h, z_min + 2h, ...` strictly below `z_max`.
///
/// Each height is computed from its index rather than accumulated, so the
/// sequence is reproducible. Empty if `z_min + h >= z_max`. Fails with
/// [`SlicerError::InvalidSettings`] when the plane count is not finite or
/// exceeds [`MAX_PLANES`].
pub fn slicing_heights(z_min: f64, z_max: f64, layer_height: f64) -> Result<Vec<f64>> {
    if !(layer_height > 0.0) || !(z_max > z_min) {
        return Ok(Vec::new());
    }

    let planes = (z_max - z_min) / layer_height;
    if !planes.is_finite() || planes > MAX_PLANES as f64 {
        return Err(SlicerError::InvalidSettings(format!(
            "layer_height {layer_height} over z [{z_min}, {z_max}] gives {planes} planes (max {MAX_PLANES})"
        )));
    }

    let mut heights = Vec::with_capacity(planes.ceil() as usize);
    let mut i = 1u64;
    loop {
        let z = z_min + i as f64 * layer_height;
        if z >= z_max {
            break;
        }
        heights.push(z);
        i += 1;
    }
    Ok(heights)
}

/// An edge with endpoint heights `z_a`, `z_b` crosses plane `h` iff
/// `min < h <= max`.
pub fn crosses(z_a: f64, z_b: f64, h: f64) -> bool {
    let (lo, hi) = if z_a <= z_b { (z_a, z_b) } else { (z_b, z_a) };
    lo < h && h <= hi
}

/// For each slicing plane, the ids of the edges crossing it.
///
/// Buckets are addressed by plane position in the height sequence, so the
/// float heights are never used as lookup keys.
#[derive(Debug, Clone, Default)]
pub struct EdgeCrossings {
    buckets: Vec<BTreeSet<EdgeId>>,
}

impl EdgeCrossings {
    /// Bucket every non-horizontal edge of `topology` by the planes it crosses.
    ///
    /// `heights` must come from [`slicing_heights`] with the same
    /// `layer_height`; the candidate range per edge is derived from it
    /// and padded one plane downwards before the exact test.
    pub fn build(topology: &Topology, heights: &[f64], layer_height: f64) -> Self {
        let mut buckets = vec![BTreeSet::new(); heights.len()];
        let Some(&first) = heights.first() else {
            return Self { buckets };
        };
        let bottom = first - layer_height;

        for edge in topology.edges() {
            let (a, b) = topology.edge_endpoints(edge.id);
            if a.z == b.z {
                continue;
            }
            let (lo, hi) = if a.z < b.z { (a.z, b.z) } else { (b.z, a.z) };

            let mut start = ((lo - bottom) / layer_height).floor() as i64;
            if start > 0 {
                start -= 1;
            }
            let end = ((hi - bottom) / layer_height).floor() as i64 + 1;
            let end = end.clamp(0, heights.len() as i64) as usize;
            let start = (start.max(0) as usize).min(end);

            for (offset, &h) in heights[start..end].iter().enumerate() {
                if lo < h && h <= hi {
                    buckets[start + offset].insert(edge.id);
                }
            }
        }

        Self { buckets }
    }

    /// Number of planes.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True if there are no planes.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Edges crossing plane `index`.
    pub fn plane(&self, index: usize) -> &BTreeSet<EdgeId> {
        &self.buckets[index]
    }

    /// Total number of (edge, plane) crossings.
    pub fn crossing_count(&self) -> usize {
        self.buckets.iter().map(BTreeSet::len).sum()
    }
}
