// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plane–triangle intersection

use nalgebra::Point3;
use scan_lite_core::{PlaneModel, Triangle};
use smallvec::SmallVec;

/// Triangle–plane intersection result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriangleCut {
    /// Triangle entirely on one side, or lying in the plane
    None,
    /// Triangle touches the plane at a single vertex
    Point(Point3<f64>),
    /// Triangle straddles the plane (or has an edge in it)
    Segment(Point3<f64>, Point3<f64>),
}

/// Intersect one triangle with a plane.
///
/// Vertices within `tolerance` of the plane count as lying on it. Coplanar
/// triangles produce [`TriangleCut::None`]; their outline is reported by
/// the neighboring triangles that cross the plane.
pub fn intersect_triangle(plane: &PlaneModel, triangle: &Triangle, tolerance: f64) -> TriangleCut {
    let vertices = triangle.vertices();
    let distances = vertices.map(|v| plane.signed_distance(&v));

    let on = distances.map(|d| d.abs() <= tolerance);
    if on.iter().all(|&o| o) {
        return TriangleCut::None;
    }

    let above = distances.iter().filter(|&&d| d > tolerance).count();
    let below = distances.iter().filter(|&&d| d < -tolerance).count();
    let on_count = on.iter().filter(|&&o| o).count();
    if on_count == 0 && (above == 0 || below == 0) {
        return TriangleCut::None;
    }

    let mut points: SmallVec<[Point3<f64>; 3]> = SmallVec::new();
    let mut push_unique = |p: Point3<f64>| {
        if !points.iter().any(|q| (q - p).norm() <= tolerance) {
            points.push(p);
        }
    };

    for i in 0..3 {
        if on[i] {
            push_unique(vertices[i]);
        }
    }

    for (i, j) in [(0, 1), (1, 2), (2, 0)] {
        let (di, dj) = (distances[i], distances[j]);
        let crosses = (di > tolerance && dj < -tolerance) || (di < -tolerance && dj > tolerance);
        if crosses {
            push_unique(edge_crossing(vertices[i], vertices[j], di, dj));
        }
    }

    match points.as_slice() {
        [] => TriangleCut::None,
        [p] => TriangleCut::Point(*p),
        [a, b, ..] => TriangleCut::Segment(*a, *b),
    }
}

/// Point where the edge `a`–`b` crosses the plane.
///
/// Endpoints are put in a canonical order first, so the two triangles
/// sharing an edge compute bit-identical crossing points.
fn edge_crossing(a: Point3<f64>, b: Point3<f64>, da: f64, db: f64) -> Point3<f64> {
    let (a, b, da, db) = if lexicographic_less(&b, &a) {
        (b, a, db, da)
    } else {
        (a, b, da, db)
    };
    let t = da / (da - db);
    a + (b - a) * t
}

#[inline]
fn lexicographic_less(p: &Point3<f64>, q: &Point3<f64>) -> bool {
    (p.x, p.y, p.z) < (q.x, q.y, q.z)
}
