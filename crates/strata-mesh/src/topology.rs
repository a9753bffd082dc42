//! Arena-backed mesh topology: vertices, edges with up to two adjacent
//! faces, and triangular faces.
//!
//! Entities refer to each other through integer ids into the owning
//! [`Topology`], never through references, so a finalized topology can be
//! shared read-only across threads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strata_math::{Aabb3, Point3, Transform};

use crate::error::{MeshError, Result};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of the entity in its arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

entity_id!(
    /// Stable id of a [`Vertex`].
    VertexId
);
entity_id!(
    /// Stable id of an [`Edge`].
    EdgeId
);
entity_id!(
    /// Stable id of a [`Face`].
    FaceId
);

/// A merged mesh vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Vertex id.
    pub id: VertexId,
    /// Position in model space.
    pub position: Point3,
}

/// An undirected mesh edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Edge id.
    pub id: EdgeId,
    /// Endpoints, lower id first.
    pub vertices: [VertexId; 2],
    /// The face that created this edge.
    pub face_a: FaceId,
    /// The second adjacent face; `None` on boundary edges.
    pub face_b: Option<FaceId>,
}

impl Edge {
    /// True if only one face is attached.
    pub fn is_boundary(&self) -> bool {
        self.face_b.is_none()
    }

    /// True if `face` is adjacent to this edge.
    pub fn has_face(&self, face: FaceId) -> bool {
        self.face_a == face || self.face_b == Some(face)
    }

    /// The adjacent face on the other side of `face`.
    ///
    /// Returns `face_b` when `face` is `face_a`, and `face_a` otherwise.
    pub fn other_face(&self, face: FaceId) -> Option<FaceId> {
        if face == self.face_a {
            self.face_b
        } else {
            Some(self.face_a)
        }
    }

    /// Number of adjacent faces (1 or 2).
    pub fn face_count(&self) -> usize {
        1 + usize::from(self.face_b.is_some())
    }
}

/// A triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Face id.
    pub id: FaceId,
    /// Edges `(v0,v1)`, `(v1,v2)`, `(v2,v0)`.
    pub edges: [EdgeId; 3],
    /// Corners in winding order.
    pub vertices: [VertexId; 3],
}

/// Canonical unordered vertex pair.
fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Owner of all vertices, edges and faces of a mesh.
///
/// Built incrementally (normally by [`crate::VertexMerger`]), then frozen by
/// [`Topology::finalize`], which also computes the bounding box.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    edge_lookup: HashMap<(VertexId, VertexId), EdgeId>,
    bounds: Aabb3,
    finalized: bool,
}

impl Topology {
    /// Create an empty, mutable topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty topology sized for `triangles` faces.
    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(triangles / 2 + 3),
            edges: Vec::with_capacity(triangles * 3 / 2 + 3),
            faces: Vec::with_capacity(triangles),
            edge_lookup: HashMap::with_capacity(triangles * 3 / 2 + 3),
            ..Self::default()
        }
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.finalized {
            Err(MeshError::Finalized)
        } else {
            Ok(())
        }
    }

    /// Append a vertex.
    pub fn add_vertex(&mut self, position: Point3) -> Result<VertexId> {
        self.ensure_mutable()?;
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex { id, position });
        Ok(id)
    }

    /// Drop vertices with index `>= len`. Only valid while no face refers to them.
    pub(crate) fn truncate_vertices(&mut self, len: usize) {
        debug_assert!(self
            .faces
            .iter()
            .all(|f| f.vertices.iter().all(|v| v.index() < len)));
        self.vertices.truncate(len);
    }

    /// Append a triangle and wire it into the edge adjacency.
    ///
    /// Each corner pair reuses the edge already keyed by that vertex pair,
    /// attaching the new face as its `face_b`. A pair whose edge already has
    /// two faces gets a fresh edge, so no edge ever carries more than two.
    pub fn add_face(&mut self, corners: [VertexId; 3]) -> Result<FaceId> {
        self.ensure_mutable()?;
        let [v0, v1, v2] = corners;
        if v0 == v1 || v1 == v2 || v2 == v0 {
            return Err(MeshError::InvalidFace(format!(
                "repeated vertex in {:?}",
                corners
            )));
        }
        if let Some(v) = corners.iter().find(|v| v.index() >= self.vertices.len()) {
            return Err(MeshError::InvalidFace(format!("unknown vertex {}", v.0)));
        }

        let face_id = FaceId(self.faces.len() as u32);
        let mut edges = [EdgeId(0); 3];
        for (slot, (a, b)) in [(v0, v1), (v1, v2), (v2, v0)].into_iter().enumerate() {
            edges[slot] = self.attach_edge(a, b, face_id);
        }
        self.faces.push(Face {
            id: face_id,
            edges,
            vertices: corners,
        });
        Ok(face_id)
    }

    fn attach_edge(&mut self, a: VertexId, b: VertexId, face: FaceId) -> EdgeId {
        let key = edge_key(a, b);
        if let Some(&id) = self.edge_lookup.get(&key) {
            let edge = &mut self.edges[id.index()];
            if edge.face_b.is_none() {
                edge.face_b = Some(face);
                return id;
            }
            tracing::debug!(a = a.0, b = b.0, "edge shared by more than two faces");
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            vertices: [key.0, key.1],
            face_a: face,
            face_b: None,
        });
        self.edge_lookup.insert(key, id);
        id
    }

    /// Freeze the topology and compute its bounding box.
    pub fn finalize(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        self.bounds = Aabb3::from_points(self.vertices.iter().map(|v| &v.position));
        self.finalized = true;
        Ok(())
    }

    /// True once [`Topology::finalize`] has run.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Bounding box over all vertices. Empty until finalized.
    pub fn bounds(&self) -> Aabb3 {
        self.bounds
    }

    /// Vertex by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this topology.
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Edge by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this topology.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    /// Face by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this topology.
    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    /// Position of a vertex.
    pub fn position(&self, id: VertexId) -> Point3 {
        self.vertices[id.index()].position
    }

    /// Endpoint positions of an edge, in stored order.
    pub fn edge_endpoints(&self, id: EdgeId) -> (Point3, Point3) {
        let [a, b] = self.edges[id.index()].vertices;
        (self.position(a), self.position(b))
    }

    /// Edge joining two vertices, if any.
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.edge_lookup.get(&edge_key(a, b)).copied()
    }

    /// All vertices in id order.
    pub fn vertices(&self) -> impl ExactSizeIterator<Item = &Vertex> {
        self.vertices.iter()
    }

    /// All edges in id order.
    pub fn edges(&self) -> impl ExactSizeIterator<Item = &Edge> {
        self.edges.iter()
    }

    /// All faces in id order.
    pub fn faces(&self) -> impl ExactSizeIterator<Item = &Face> {
        self.faces.iter()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of edges with a single adjacent face.
    pub fn boundary_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_boundary()).count()
    }

    /// True if the mesh is non-empty and every edge has two faces.
    pub fn is_watertight(&self) -> bool {
        !self.edges.is_empty() && self.boundary_edge_count() == 0
    }

    /// Copy of this topology with every vertex mapped through `transform`.
    ///
    /// Ids and adjacency are preserved; the copy is finalized with a fresh
    /// bounding box.
    pub fn transformed(&self, transform: &Transform) -> Result<Topology> {
        if !self.finalized {
            return Err(MeshError::NotFinalized);
        }
        let vertices: Vec<Vertex> = self
            .vertices
            .iter()
            .map(|v| Vertex {
                id: v.id,
                position: transform.apply_point(&v.position),
            })
            .collect();
        let bounds = Aabb3::from_points(vertices.iter().map(|v| &v.position));
        Ok(Topology {
            vertices,
            edges: self.edges.clone(),
            faces: self.faces.clone(),
            edge_lookup: self.edge_lookup.clone(),
            bounds,
            finalized: true,
        })
    }
}
