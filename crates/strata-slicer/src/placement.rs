//! Placing an imported model on the build plate.

use strata_math::{Aabb3, Transform};
use strata_mesh::Topology;

use crate::error::Result;
use crate::settings::SlicerSettings;

/// Transform that scales the model and, if enabled, centers it on the plate
/// with its lowest point at z = 0.
pub fn plate_transform(bounds: &Aabb3, settings: &SlicerSettings) -> Transform {
    let scale = Transform::uniform_scale(settings.scale);
    if !settings.center_on_plate || bounds.is_empty() {
        return scale;
    }
    let center = bounds.center() * settings.scale;
    let min_z = bounds.min.z * settings.scale;
    let shift = Transform::translation(
        settings.plate_width / 2.0 - center.x,
        settings.plate_length / 2.0 - center.y,
        -min_z,
    );
    shift.then(&scale)
}

/// Finalized copy of `topology` placed according to `settings`.
pub fn place_on_plate(topology: &Topology, settings: &SlicerSettings) -> Result<Topology> {
    settings.validate()?;
    let transform = plate_transform(&topology.bounds(), settings);
    Ok(topology.transformed(&transform)?)
}
