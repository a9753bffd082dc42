//! Hook for the infill stage that consumes each layer's contours.

use crate::layer::{Layer, LayeredModel};
use crate::settings::SlicerSettings;

/// Infill generator invoked once per layer, before the layer is stored.
///
/// Implementations write their paths into [`Layer::fill_paths`]. `model`
/// holds every layer stored so far (all lower layers).
pub trait LayerFill {
    /// Populate `layer`'s fill geometry in place.
    fn fill(&self, layer: &mut Layer, settings: &SlicerSettings, model: &LayeredModel);
}

/// Leaves layers without fill.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFill;

impl LayerFill for NoFill {
    fn fill(&self, _layer: &mut Layer, _settings: &SlicerSettings, _model: &LayeredModel) {}
}

impl<F> LayerFill for F
where
    F: Fn(&mut Layer, &SlicerSettings, &LayeredModel),
{
    fn fill(&self, layer: &mut Layer, settings: &SlicerSettings, model: &LayeredModel) {
        self(layer, settings, model)
    }
}
