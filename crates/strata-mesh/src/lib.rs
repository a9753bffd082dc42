#![warn(missing_docs)]

//! Mesh ingestion for the strata slicer.
//!
//! Decodes STL content into a triangle-vertex stream and merges it into a
//! connected [`Topology`]: near-coincident vertices are welded within a
//! tolerance radius, and every edge records the one or two faces that share
//! it.
//!
//! # Example
//!
//! ```ignore
//! use strata_mesh::{import_file, CancelFlag, NoProgress};
//!
//! let topology = import_file("part.stl", 0.02, &mut NoProgress, &CancelFlag::new())?;
//! println!("{} faces, watertight: {}", topology.face_count(), topology.is_watertight());
//! ```

pub mod error;
pub mod import;
pub mod merger;
pub mod progress;
pub mod stl;
pub mod topology;

pub use error::{MeshError, Result};
pub use import::{import_bytes, import_file};
pub use merger::VertexMerger;
pub use progress::{CancelFlag, NoProgress, Progress};
pub use stl::StlFormat;
pub use topology::{Edge, EdgeId, Face, FaceId, Topology, Vertex, VertexId};
