// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry provider seam
//!
//! The segmenter, floor clusterer and section cutter only talk to geometry
//! through [`GeometryProvider`], so an alternative backend can be swapped in
//! without touching the pipelines.

use crate::intersect::{intersect_triangle, TriangleCut};
use crate::normals::{estimate_normals, NormalParams};
use crate::ransac::{fit_plane_ransac, PlaneFit, RansacParams};
use nalgebra::{Point3, Vector3};
use scan_lite_core::{Outcome, PlaneModel, PointCloud, Triangle};

/// Geometric primitives used by the extraction pipelines
pub trait GeometryProvider: Sync {
    /// Per-point normals; `None` where a normal cannot be estimated
    fn estimate_normals(&self, points: &[Point3<f64>], params: &NormalParams) -> Vec<Option<Vector3<f64>>>;

    /// Best-supported plane among `points[i]` for `i` in `subset`
    fn fit_plane_ransac(
        &self,
        points: &[Point3<f64>],
        subset: &[usize],
        params: &RansacParams,
    ) -> Outcome<PlaneFit>;

    fn plane_triangle_intersection(
        &self,
        plane: &PlaneModel,
        triangle: &Triangle,
        tolerance: f64,
    ) -> TriangleCut;

    /// Sub-cloud of the given indices, or of every other point when `invert`
    fn select_by_index(&self, cloud: &PointCloud, indices: &[usize], invert: bool) -> PointCloud {
        cloud.select_by_index(indices, invert)
    }
}

/// Pure-Rust provider backed by this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeProvider;

impl GeometryProvider for NativeProvider {
    fn estimate_normals(&self, points: &[Point3<f64>], params: &NormalParams) -> Vec<Option<Vector3<f64>>> {
        estimate_normals(points, params)
    }

    fn fit_plane_ransac(
        &self,
        points: &[Point3<f64>],
        subset: &[usize],
        params: &RansacParams,
    ) -> Outcome<PlaneFit> {
        fit_plane_ransac(points, subset, params)
    }

    fn plane_triangle_intersection(
        &self,
        plane: &PlaneModel,
        triangle: &Triangle,
        tolerance: f64,
    ) -> TriangleCut {
        intersect_triangle(plane, triangle, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_provider_selects() {
        let cloud = PointCloud::from_positions(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ]);
        let provider = NativeProvider;
        let kept = provider.select_by_index(&cloud, &[1], true);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.positions[1].x, 2.0);
    }

    #[test]
    fn test_native_provider_is_object_safe() {
        let provider: &dyn GeometryProvider = &NativeProvider;
        let plane = PlaneModel::new(0.0, 0.0, 1.0, -0.5).unwrap();
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        );
        assert!(matches!(
            provider.plane_triangle_intersection(&plane, &tri, 1e-9),
            TriangleCut::Segment(..)
        ));
    }
}
