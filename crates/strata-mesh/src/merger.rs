//! Tolerance-based vertex merging.
//!
//! The merger consumes a triangle-vertex stream (three positions per
//! triangle, in winding order), snaps each position onto an existing vertex
//! within the merge radius, and wires every completed triangle into the
//! [`Topology`].

use std::collections::HashMap;

use strata_math::Point3;
use tracing::{debug, warn};

use crate::error::{MeshError, Result};
use crate::topology::{FaceId, Topology, VertexId};

/// Quantized grid cell, `floor(coord / tolerance)` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    x: i64,
    y: i64,
    z: i64,
}

impl CellKey {
    fn from_point(p: &Point3, cell_size: f64) -> Self {
        Self {
            x: (p.x / cell_size).floor() as i64,
            y: (p.y / cell_size).floor() as i64,
            z: (p.z / cell_size).floor() as i64,
        }
    }

    fn neighborhood(self) -> impl Iterator<Item = CellKey> {
        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).map(move |dz| CellKey {
                    x: self.x.saturating_add(dx),
                    y: self.y.saturating_add(dy),
                    z: self.z.saturating_add(dz),
                })
            })
        })
    }
}

/// Incremental builder of a deduplicated [`Topology`].
///
/// Call [`VertexMerger::add`] three times per triangle. The third call
/// resolves the triangle's corners and creates the face. Triangles that
/// collapse after merging (two corners snapping onto the same vertex) are
/// dropped together with any vertex they introduced.
#[derive(Debug)]
pub struct VertexMerger {
    topology: Topology,
    tolerance: f64,
    grid: HashMap<CellKey, Vec<VertexId>>,
    pending: Vec<Point3>,
    reused: usize,
    collapsed: usize,
}

impl VertexMerger {
    /// Create a merger with merge radius `tolerance`.
    pub fn new(tolerance: f64) -> Result<Self> {
        Self::with_capacity(tolerance, 0)
    }

    /// Create a merger sized for `triangles` incoming triangles.
    pub fn with_capacity(tolerance: f64, triangles: usize) -> Result<Self> {
        if !(tolerance > 0.0 && tolerance.is_finite()) {
            return Err(MeshError::InvalidTolerance(tolerance));
        }
        Ok(Self {
            topology: Topology::with_capacity(triangles),
            tolerance,
            grid: HashMap::with_capacity(triangles / 2 + 3),
            pending: Vec::with_capacity(3),
            reused: 0,
            collapsed: 0,
        })
    }

    /// Merge radius.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Feed the next triangle corner.
    ///
    /// Returns the new face id when this call completed a triangle.
    pub fn add(&mut self, position: Point3) -> Result<Option<FaceId>> {
        if self.topology.is_finalized() {
            return Err(MeshError::Finalized);
        }
        self.pending.push(position);
        if self.pending.len() < 3 {
            return Ok(None);
        }

        let corners = [self.pending[0], self.pending[1], self.pending[2]];
        self.pending.clear();
        self.add_triangle(corners)
    }

    fn add_triangle(&mut self, corners: [Point3; 3]) -> Result<Option<FaceId>> {
        let mark = self.topology.vertex_count();
        let mut ids = [VertexId(0); 3];
        for (slot, p) in corners.iter().enumerate() {
            ids[slot] = self.resolve(p)?;
        }

        if ids[0] == ids[1] || ids[1] == ids[2] || ids[2] == ids[0] {
            self.collapsed += 1;
            debug!(?ids, "dropping triangle collapsed by merging");
            self.rollback(mark);
            return Ok(None);
        }

        self.topology.add_face(ids).map(Some)
    }

    /// Reuse the earliest vertex within tolerance, or create a new one.
    fn resolve(&mut self, p: &Point3) -> Result<VertexId> {
        let cell = CellKey::from_point(p, self.tolerance);
        let tol2 = self.tolerance * self.tolerance;

        let mut found: Option<VertexId> = None;
        for key in cell.neighborhood() {
            let Some(candidates) = self.grid.get(&key) else {
                continue;
            };
            for &id in candidates {
                if found.is_some_and(|f| f <= id) {
                    continue;
                }
                if (self.topology.position(id) - p).norm_squared() <= tol2 {
                    found = Some(id);
                }
            }
        }

        if let Some(id) = found {
            self.reused += 1;
            return Ok(id);
        }

        let id = self.topology.add_vertex(*p)?;
        self.grid.entry(cell).or_default().push(id);
        Ok(id)
    }

    fn rollback(&mut self, mark: usize) {
        for index in (mark..self.topology.vertex_count()).rev() {
            let id = VertexId(index as u32);
            let cell = CellKey::from_point(&self.topology.position(id), self.tolerance);
            if let Some(bucket) = self.grid.get_mut(&cell) {
                bucket.retain(|&v| v != id);
            }
        }
        self.topology.truncate_vertices(mark);
    }

    /// Freeze the topology and compute its bounding box.
    ///
    /// Corners of an incomplete trailing triangle are discarded.
    pub fn finalize(&mut self) -> Result<()> {
        if self.topology.is_finalized() {
            return Err(MeshError::Finalized);
        }
        if !self.pending.is_empty() {
            warn!(
                corners = self.pending.len(),
                "discarding incomplete trailing triangle"
            );
            self.pending.clear();
        }
        self.topology.finalize()?;
        debug!(
            vertices = self.topology.vertex_count(),
            edges = self.topology.edge_count(),
            faces = self.topology.face_count(),
            reused = self.reused,
            collapsed = self.collapsed,
            "Merged mesh topology"
        );
        Ok(())
    }

    /// True once [`VertexMerger::finalize`] has run.
    pub fn is_finalized(&self) -> bool {
        self.topology.is_finalized()
    }

    /// Topology built so far.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Number of incoming positions that snapped onto an existing vertex.
    pub fn reused_count(&self) -> usize {
        self.reused
    }

    /// Number of triangles dropped because merging collapsed them.
    pub fn collapsed_count(&self) -> usize {
        self.collapsed
    }

    /// Take the finished topology.
    pub fn into_topology(self) -> Result<Topology> {
        if !self.topology.is_finalized() {
            return Err(MeshError::NotFinalized);
        }
        Ok(self.topology)
    }
}

impl Topology {
    /// Merge a list of triangles into a finalized topology.
    pub fn from_triangles(triangles: &[[Point3; 3]], tolerance: f64) -> Result<Topology> {
        let mut merger = VertexMerger::with_capacity(tolerance, triangles.len())?;
        for tri in triangles {
            for p in tri {
                merger.add(*p)?;
            }
        }
        merger.finalize()?;
        merger.into_topology()
    }
}
