// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-point normal estimation from local neighborhoods

use crate::fit::principal_normal;
use crate::spatial::SpatialGrid;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Neighborhood parameters for normal estimation (hybrid radius / k search)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalParams {
    /// Search radius around each point
    pub search_radius: f64,
    /// Upper bound on neighbors used per point (closest first)
    pub max_neighbors: usize,
    /// Neighborhoods smaller than this yield no normal
    pub min_neighbors: usize,
}

impl Default for NormalParams {
    fn default() -> Self {
        Self {
            search_radius: 0.1,
            max_neighbors: 30,
            min_neighbors: 3,
        }
    }
}

/// Estimate a unit normal for every point.
///
/// Each entry is `None` when the point's neighborhood is too small or too
/// degenerate to define a plane; callers must treat those points as having
/// no normal rather than a zero vector. Normals are oriented so that their
/// vertical component is non-negative.
pub fn estimate_normals(points: &[Point3<f64>], params: &NormalParams) -> Vec<Option<Vector3<f64>>> {
    if points.is_empty() {
        return Vec::new();
    }

    let grid = SpatialGrid::build(points, params.search_radius);
    let min_neighbors = params.min_neighbors.max(3);

    points
        .par_iter()
        .map(|p| {
            let neighbors = grid.hybrid_neighbors(p, params.search_radius, params.max_neighbors);
            if neighbors.len() < min_neighbors {
                return None;
            }
            let local: Vec<Point3<f64>> = neighbors.iter().map(|&i| points[i]).collect();
            principal_normal(&local).map(orient_up)
        })
        .collect()
}

#[inline]
fn orient_up(normal: Vector3<f64>) -> Vector3<f64> {
    if normal.z < 0.0 {
        -normal
    } else {
        normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid_on_plane(z: f64) -> Vec<Point3<f64>> {
        (0..20)
            .flat_map(|i| (0..20).map(move |j| Point3::new(i as f64 * 0.02, j as f64 * 0.02, z)))
            .collect()
    }

    #[test]
    fn test_horizontal_patch_normals_point_up() {
        let points = grid_on_plane(1.5);
        let normals = estimate_normals(&points, &NormalParams::default());
        assert_eq!(normals.len(), points.len());
        for n in normals {
            let n = n.expect("dense planar patch should have normals");
            assert_relative_eq!(n.z, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_vertical_patch_normals() {
        let points: Vec<Point3<f64>> = (0..15)
            .flat_map(|i| (0..15).map(move |j| Point3::new(2.0, i as f64 * 0.02, j as f64 * 0.02)))
            .collect();
        let normals = estimate_normals(&points, &NormalParams::default());
        for n in normals.into_iter().flatten() {
            assert_relative_eq!(n.x.abs(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_isolated_points_have_no_normal() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        let normals = estimate_normals(&points, &NormalParams::default());
        assert!(normals.iter().all(Option::is_none));
    }

    #[test]
    fn test_empty_input() {
        assert!(estimate_normals(&[], &NormalParams::default()).is_empty());
    }
}
