#![warn(missing_docs)]

//! Planar slicing for the strata slicer.
//!
//! Intersects a finalized mesh [`Topology`] with evenly spaced horizontal
//! planes and traces closed 2D contours by walking face adjacency.
//!
//! # Example
//!
//! ```ignore
//! use strata_mesh::{import_file, CancelFlag, NoProgress};
//! use strata_slicer::{slice, SlicerSettings};
//!
//! let settings = SlicerSettings::default();
//! let topology = import_file("part.stl", settings.tolerance, &mut NoProgress, &CancelFlag::new())?;
//! let model = slice(&topology, &settings)?;
//!
//! println!("Layers: {}", model.layer_count());
//! ```

pub mod error;
pub mod infill;
pub mod layer;
pub mod placement;
pub mod planes;
pub mod settings;
pub mod trace;

pub use error::{Result, SlicerError};
pub use infill::{LayerFill, NoFill};
pub use layer::{Contour, Layer, LayeredModel};
pub use placement::{place_on_plate, plate_transform};
pub use planes::{crosses, slicing_heights, EdgeCrossings, MAX_PLANES};
pub use settings::{SlicerSettings, SETTING_KEYS};
pub use trace::{edge_intersection, trace_plane, PlaneContours};

use rayon::prelude::*;
use strata_mesh::{CancelFlag, MeshError, NoProgress, Progress, Topology};
use tracing::{debug, info, warn};

/// Configured slicing run over one topology.
pub struct Slicer<'a> {
    topology: &'a Topology,
    settings: &'a SlicerSettings,
    fill: &'a dyn LayerFill,
    cancel: CancelFlag,
    parallel: bool,
}

impl<'a> Slicer<'a> {
    /// Slicer with no infill, no cancellation and parallel tracing.
    pub fn new(topology: &'a Topology, settings: &'a SlicerSettings) -> Self {
        Self {
            topology,
            settings,
            fill: &NoFill,
            cancel: CancelFlag::new(),
            parallel: true,
        }
    }

    /// Use `fill` as the infill stage.
    pub fn with_fill(mut self, fill: &'a dyn LayerFill) -> Self {
        self.fill = fill;
        self
    }

    /// Check `cancel` once per plane.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Trace planes on the rayon pool (`true`) or on the calling thread.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Slice the topology.
    ///
    /// `progress` is sized to the number of planes and advanced once per
    /// plane. Planes without contours produce no layer; layers are numbered
    /// consecutively in ascending height order.
    pub fn run(&self, progress: &mut dyn Progress) -> Result<LayeredModel> {
        self.settings.validate()?;
        let topology = self.topology;
        if !topology.is_finalized() {
            return Err(MeshError::NotFinalized.into());
        }

        let bounds = topology.bounds();
        let layer_height = self.settings.layer_height;
        let mut model = LayeredModel::new(bounds);
        let heights = if bounds.is_empty() {
            Vec::new()
        } else {
            slicing_heights(bounds.min.z, bounds.max.z, layer_height)?
        };

        info!(
            planes = heights.len(),
            layer_height,
            faces = topology.face_count(),
            "Starting planar slicing"
        );
        progress.set_size(heights.len());

        let crossings = EdgeCrossings::build(topology, &heights, layer_height);
        debug!(
            crossings = crossings.crossing_count(),
            "Built edge crossing index"
        );

        let cancel = &self.cancel;
        let trace = |index: usize| -> Result<PlaneContours> {
            if cancel.is_cancelled() {
                return Err(SlicerError::Cancelled);
            }
            Ok(trace_plane(
                topology,
                heights[index],
                crossings.plane(index).clone(),
            ))
        };
        let traced: Vec<PlaneContours> = if self.parallel {
            (0..heights.len())
                .into_par_iter()
                .map(trace)
                .collect::<Result<_>>()?
        } else {
            (0..heights.len()).map(trace).collect::<Result<_>>()?
        };

        let mut seq = 0;
        for (plane, traced) in traced.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(SlicerError::Cancelled);
            }
            if !traced.contours.is_empty() {
                let height = heights[plane];
                if !traced.premature.is_empty() {
                    warn!(
                        layer = seq,
                        height,
                        contours = traced.contours.len(),
                        premature = traced.premature.len(),
                        "contours closed before returning to their start, mesh may be open or non-manifold"
                    );
                }
                let mut layer = Layer::new(seq, height, traced.contours);
                layer.premature_closures = traced.premature;
                self.fill.fill(&mut layer, self.settings, &model);
                model.insert(layer);
                seq += 1;
            }
            progress.increment();
        }
        progress.done();

        info!(
            layers = model.layer_count(),
            contours = model.contour_count(),
            premature = model.premature_closure_count(),
            "Slicing complete"
        );
        Ok(model)
    }
}

/// Slice a topology with the given settings.
pub fn slice(topology: &Topology, settings: &SlicerSettings) -> Result<LayeredModel> {
    Slicer::new(topology, settings).run(&mut NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_math::Point3;

    fn flat_square() -> Topology {
        Topology::from_triangles(
            &[
                [
                    Point3::new(0.0, 0.0, 1.0),
                    Point3::new(1.0, 0.0, 1.0),
                    Point3::new(1.0, 1.0, 1.0),
                ],
                [
                    Point3::new(0.0, 0.0, 1.0),
                    Point3::new(1.0, 1.0, 1.0),
                    Point3::new(0.0, 1.0, 1.0),
                ],
            ],
            1e-6,
        )
        .unwrap()
    }

    #[test]
    fn test_flat_mesh_has_no_layers() {
        let model = slice(&flat_square(), &SlicerSettings::default()).unwrap();
        assert_eq!(model.layer_count(), 0);
    }

    #[test]
    fn test_invalid_layer_height() {
        let settings = SlicerSettings {
            layer_height: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            slice(&flat_square(), &settings),
            Err(SlicerError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_tiny_layer_height_is_rejected() {
        let topo = Topology::from_triangles(
            &[[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 10.0),
            ]],
            1e-6,
        )
        .unwrap();
        let settings = SlicerSettings {
            layer_height: 1e-20,
            ..Default::default()
        };
        assert!(matches!(
            slice(&topo, &settings),
            Err(SlicerError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_requires_finalized_topology() {
        let topo = Topology::new();
        assert!(matches!(
            slice(&topo, &SlicerSettings::default()),
            Err(SlicerError::Mesh(MeshError::NotFinalized))
        ));
    }

    #[test]
    fn test_empty_topology() {
        let topo = Topology::from_triangles(&[], 1e-3).unwrap();
        let model = slice(&topo, &SlicerSettings::default()).unwrap();
        assert_eq!(model.layer_count(), 0);
    }
}
