//! Contour tracing across face adjacency.
//!
//! Starting from a crossing edge, the walk steps into one adjacent face,
//! picks another edge of that face still crossing the plane, then leaves
//! through the face on the other side of that edge, and so on until no
//! pending edge is reachable.

use std::collections::BTreeSet;

use strata_math::Point2;
use strata_mesh::{Edge, EdgeId, FaceId, Topology};

use crate::layer::Contour;

/// Contours traced on one plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaneContours {
    /// Traced loops in tracing order.
    pub contours: Vec<Contour>,
    /// Indices of loops that did not return to their starting face.
    pub premature: Vec<usize>,
}

/// Point where `edge` meets plane `h`, projected to XY.
///
/// The edge must not be horizontal.
pub fn edge_intersection(topology: &Topology, edge: &Edge, h: f64) -> Point2 {
    let (a, b) = topology.edge_endpoints(edge.id);
    let t = (h - a.z) / (b.z - a.z);
    Point2::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y))
}

/// Trace every contour on plane `h`, consuming the `pending` crossing edges.
///
/// Each loop starts at the lowest pending edge id, so repeated runs over
/// the same topology produce identical point sequences.
pub fn trace_plane(topology: &Topology, h: f64, mut pending: BTreeSet<EdgeId>) -> PlaneContours {
    let mut out = PlaneContours::default();

    while let Some(start) = pending.pop_first() {
        let (points, returned) = trace_loop(topology, h, start, &mut pending);
        if !returned {
            out.premature.push(out.contours.len());
        }
        out.contours.push(Contour::new(points));
    }

    out
}

/// Walk one loop from `start`. Returns the points and whether the walk came
/// back to a face of the starting edge.
fn trace_loop(
    topology: &Topology,
    h: f64,
    start: EdgeId,
    pending: &mut BTreeSet<EdgeId>,
) -> (Vec<Point2>, bool) {
    let mut points = Vec::new();
    let mut current = start;
    let mut face: Option<FaceId> = None;

    loop {
        let edge = topology.edge(current);
        points.push(edge_intersection(topology, edge, h));
        pending.remove(&current);

        let next_face = match face {
            None => Some(edge.face_a),
            Some(prev) => edge.other_face(prev),
        };
        // Boundary edge: nothing on the other side.
        let Some(next_face) = next_face else {
            return (points, false);
        };
        face = Some(next_face);

        let next = topology
            .face(next_face)
            .edges
            .iter()
            .copied()
            .find(|e| pending.contains(e));
        match next {
            Some(e) => current = e,
            None => {
                let returned = points.len() >= 3 && topology.edge(start).has_face(next_face);
                return (points, returned);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strata_math::Point3;

    /// Square pyramid with apex above the center of a 2x2 base.
    fn pyramid() -> Topology {
        let b = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let apex = Point3::new(1.0, 1.0, 2.0);
        Topology::from_triangles(
            &[
                [b[0], b[2], b[1]],
                [b[0], b[3], b[2]],
                [b[0], b[1], apex],
                [b[1], b[2], apex],
                [b[2], b[3], apex],
                [b[3], b[0], apex],
            ],
            1e-6,
        )
        .unwrap()
    }

    fn crossing(topology: &Topology, h: f64) -> BTreeSet<EdgeId> {
        topology
            .edges()
            .filter(|e| {
                let (a, b) = topology.edge_endpoints(e.id);
                crate::planes::crosses(a.z, b.z, h)
            })
            .map(|e| e.id)
            .collect()
    }

    #[test]
    fn test_intersection_interpolates() {
        let topo = pyramid();
        let apex_edge = topo
            .edges()
            .find(|e| {
                let (a, b) = topo.edge_endpoints(e.id);
                a.z != b.z
            })
            .unwrap();
        let p = edge_intersection(&topo, apex_edge, 1.0);
        let (a, b) = topo.edge_endpoints(apex_edge.id);
        assert_relative_eq!(p.x, (a.x + b.x) / 2.0);
        assert_relative_eq!(p.y, (a.y + b.y) / 2.0);
    }

    #[test]
    fn test_pyramid_single_loop() {
        let topo = pyramid();
        let pending = crossing(&topo, 1.0);
        assert_eq!(pending.len(), 4);
        let traced = trace_plane(&topo, 1.0, pending);
        assert_eq!(traced.contours.len(), 1);
        assert!(traced.premature.is_empty());
        let contour = &traced.contours[0];
        assert_eq!(contour.len(), 4);
        assert_relative_eq!(contour.signed_area().abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_open_mesh_reports_premature_closure() {
        // Two side faces only: the walk hits a boundary edge.
        let apex = Point3::new(1.0, 1.0, 2.0);
        let topo = Topology::from_triangles(
            &[
                [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0), apex],
                [Point3::new(2.0, 0.0, 0.0), Point3::new(2.0, 2.0, 0.0), apex],
            ],
            1e-6,
        )
        .unwrap();
        let pending = crossing(&topo, 1.0);
        assert_eq!(pending.len(), 3);
        let traced = trace_plane(&topo, 1.0, pending);
        let total: usize = traced.contours.iter().map(Contour::len).sum();
        assert_eq!(total, 3);
        assert!(!traced.premature.is_empty());
    }

    #[test]
    fn test_tracing_is_repeatable() {
        let topo = pyramid();
        let first = trace_plane(&topo, 0.5, crossing(&topo, 0.5));
        let second = trace_plane(&topo, 0.5, crossing(&topo, 0.5));
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_pending() {
        let topo = pyramid();
        let traced = trace_plane(&topo, 5.0, BTreeSet::new());
        assert!(traced.contours.is_empty());
    }
}
