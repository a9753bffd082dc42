//! Import driver: format detection, decoding and merging in one pass.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{MeshError, Result};
use crate::merger::VertexMerger;
use crate::progress::{CancelFlag, Progress};
use crate::stl::StlFormat;
use crate::topology::Topology;

/// Decode `content` and merge it into a finalized [`Topology`].
///
/// Formats are tried in [`StlFormat::ALL`] order. `progress` is notified
/// once per decoded vertex and `cancel` is checked at the same point.
pub fn import_bytes(
    content: &[u8],
    tolerance: f64,
    progress: &mut dyn Progress,
    cancel: &CancelFlag,
) -> Result<Topology> {
    cancel.check()?;
    let format = StlFormat::detect(content).ok_or(MeshError::FormatNotRecognized)?;
    let triangles = format.triangle_count(content);

    info!(
        format = format.name(),
        bytes = content.len(),
        triangles,
        tolerance,
        "Importing mesh"
    );

    let mut merger = VertexMerger::with_capacity(tolerance, triangles)?;
    progress.set_size(triangles * 3);
    format.decode(content, |position| {
        cancel.check()?;
        merger.add(position)?;
        progress.increment();
        Ok(())
    })?;
    merger.finalize()?;
    progress.done();

    let topology = merger.into_topology()?;
    let boundary = topology.boundary_edge_count();
    if boundary > 0 {
        warn!(
            boundary_edges = boundary,
            "mesh is not watertight, contours may close early"
        );
    }
    info!(
        vertices = topology.vertex_count(),
        edges = topology.edge_count(),
        faces = topology.face_count(),
        "Import complete"
    );
    Ok(topology)
}

/// Read a mesh file and merge it into a finalized [`Topology`].
pub fn import_file<P: AsRef<Path>>(
    path: P,
    tolerance: f64,
    progress: &mut dyn Progress,
    cancel: &CancelFlag,
) -> Result<Topology> {
    let content = std::fs::read(path.as_ref())?;
    import_bytes(&content, tolerance, progress, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    #[test]
    fn test_empty_content_gives_empty_topology() {
        for content in [&b""[..], &[1u8; 60][..]] {
            let topo = import_bytes(content, 1e-3, &mut NoProgress, &CancelFlag::new()).unwrap();
            assert!(topo.is_finalized());
            assert_eq!(topo.face_count(), 0);
            assert_eq!(topo.vertex_count(), 0);
            assert!(topo.bounds().is_empty());
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = import_bytes(&[0u8; 134], 1e-3, &mut NoProgress, &cancel);
        assert!(matches!(err, Err(MeshError::Cancelled)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = import_file(
            "/nonexistent/strata/model.stl",
            1e-3,
            &mut NoProgress,
            &CancelFlag::new(),
        );
        assert!(matches!(err, Err(MeshError::Io(_))));
    }
}
