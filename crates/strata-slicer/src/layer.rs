//! Layer aggregate: contours per slicing plane, in ascending height order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_math::{Aabb3, Point2};

/// A closed 2D loop. The last point connects back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    /// Vertices in tracing order.
    pub points: Vec<Point2>,
}

impl Contour {
    /// Create a contour from points.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Check if the contour is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Signed area.
    /// Positive for counter-clockwise, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area / 2.0
    }

    /// Length of the closed loop.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| (self.points[(i + 1) % n] - self.points[i]).norm())
            .sum()
    }

    /// Min and max corners, or `None` if empty.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }

    /// Copy without points that lie within `tolerance` of the line through
    /// their neighbours. Never reduces below three points.
    pub fn simplified(&self, tolerance: f64) -> Contour {
        let mut pts = self.points.clone();
        let mut changed = true;
        while changed && pts.len() > 3 {
            changed = false;
            let n = pts.len();
            for i in 0..n {
                let prev = pts[(i + n - 1) % n];
                let next = pts[(i + 1) % n];
                if distance_to_line(&pts[i], &prev, &next) <= tolerance {
                    pts.remove(i);
                    changed = true;
                    break;
                }
            }
        }
        Contour::new(pts)
    }
}

fn distance_to_line(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let ap = p - a;
    let len = ab.norm();
    if len < 1e-12 {
        return ap.norm();
    }
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}

/// All contours of one slicing plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Sequence number, zero-based, ascending with height.
    pub index: usize,
    /// Plane height.
    pub height: f64,
    /// Traced loops (possibly several disjoint ones).
    pub contours: Vec<Contour>,
    /// Indices into `contours` of loops that closed before returning to
    /// their starting face (open or non-manifold mesh).
    pub premature_closures: Vec<usize>,
    /// Fill paths written by the infill stage.
    pub fill_paths: Vec<Vec<Point2>>,
}

impl Layer {
    /// Create a layer without fill.
    pub fn new(index: usize, height: f64, contours: Vec<Contour>) -> Self {
        Self {
            index,
            height,
            contours,
            premature_closures: Vec::new(),
            fill_paths: Vec::new(),
        }
    }

    /// True if every contour returned to its starting face.
    pub fn is_clean(&self) -> bool {
        self.premature_closures.is_empty()
    }
}

/// The sliced model handed to downstream stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayeredModel {
    /// Layers keyed by sequence index.
    pub layers: BTreeMap<usize, Layer>,
    /// Bounding box of the sliced topology.
    pub bounds: Aabb3,
}

impl LayeredModel {
    /// Empty model for a topology with the given bounds.
    pub fn new(bounds: Aabb3) -> Self {
        Self {
            layers: BTreeMap::new(),
            bounds,
        }
    }

    /// Store a layer under its sequence index.
    pub fn insert(&mut self, layer: Layer) {
        self.layers.insert(layer.index, layer);
    }

    /// Layer by sequence index.
    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(&index)
    }

    /// Layers in ascending order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total number of contours across all layers.
    pub fn contour_count(&self) -> usize {
        self.layers.values().map(|l| l.contours.len()).sum()
    }

    /// Total number of prematurely closed contours.
    pub fn premature_closure_count(&self) -> usize {
        self.layers.values().map(|l| l.premature_closures.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_with_midpoints() -> Contour {
        Contour::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 5.0),
            Point2::new(10.0, 10.0),
            Point2::new(5.0, 10.0),
            Point2::new(0.0, 10.0),
            Point2::new(0.0, 5.0),
        ])
    }

    #[test]
    fn test_area_and_perimeter() {
        let c = square_with_midpoints();
        assert_relative_eq!(c.signed_area(), 100.0);
        assert_relative_eq!(c.perimeter(), 40.0);
        let (lo, hi) = c.bounds().unwrap();
        assert_eq!(lo, Point2::new(0.0, 0.0));
        assert_eq!(hi, Point2::new(10.0, 10.0));
    }

    #[test]
    fn test_simplified_drops_collinear_points() {
        let s = square_with_midpoints().simplified(1e-9);
        assert_eq!(s.len(), 4);
        assert_relative_eq!(s.signed_area(), 100.0);
        for p in &s.points {
            assert!(p.x == 0.0 || p.x == 10.0);
            assert!(p.y == 0.0 || p.y == 10.0);
        }
    }

    #[test]
    fn test_simplified_keeps_triangle() {
        let tri = Contour::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ]);
        assert_eq!(tri.simplified(0.1).len(), 3);
    }

    #[test]
    fn test_degenerate_contours() {
        let empty = Contour::new(Vec::new());
        assert!(empty.is_empty());
        assert!(empty.bounds().is_none());
        assert_eq!(empty.perimeter(), 0.0);
        let point = Contour::new(vec![Point2::new(1.0, 1.0)]);
        assert_eq!(point.signed_area(), 0.0);
    }

    #[test]
    fn test_model_orders_layers() {
        let mut model = LayeredModel::new(Aabb3::empty());
        model.insert(Layer::new(1, 0.6, vec![square_with_midpoints()]));
        model.insert(Layer::new(0, 0.3, vec![square_with_midpoints()]));
        let heights: Vec<f64> = model.layers().map(|l| l.height).collect();
        assert_eq!(heights, vec![0.3, 0.6]);
        assert_eq!(model.layer_count(), 2);
        assert_eq!(model.contour_count(), 2);
        assert!(model.get(1).unwrap().is_clean());
        assert!(model.get(2).is_none());
    }
}
