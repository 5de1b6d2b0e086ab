// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial hash grid for radius-bounded neighbor queries.
//!
//! Points are bucketed into cubic cells of side `cell_size`. A radius query
//! visits the block of cells the query sphere can touch, so with
//! `cell_size >= radius` only the 3x3x3 neighborhood is searched.

use nalgebra::Point3;
use rustc_hash::FxHashMap;

/// Cell grid over a borrowed point slice
#[derive(Debug)]
pub struct SpatialGrid<'a> {
    cell_size: f64,
    points: &'a [Point3<f64>],
    grid: FxHashMap<(i64, i64, i64), Vec<usize>>,
}

impl<'a> SpatialGrid<'a> {
    /// Builds a grid over all points.
    ///
    /// A non-positive or non-finite `cell_size` falls back to `1.0`.
    pub fn build(points: &'a [Point3<f64>], cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        let mut grid: FxHashMap<(i64, i64, i64), Vec<usize>> = FxHashMap::default();
        for (i, p) in points.iter().enumerate() {
            grid.entry(cell_coords(cell_size, p)).or_default().push(i);
        }
        Self {
            cell_size,
            points,
            grid,
        }
    }

    /// All points within `radius` of `query` as `(index, squared distance)`,
    /// in no particular order. The query point itself is included when it
    /// belongs to the indexed set.
    pub fn within_radius(&self, query: &Point3<f64>, radius: f64) -> Vec<(usize, f64)> {
        let (cx, cy, cz) = cell_coords(self.cell_size, query);
        let reach = (radius / self.cell_size).ceil().max(1.0) as i64;
        let radius_sq = radius * radius;
        let mut result = Vec::new();

        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    if let Some(indices) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) {
                        for &i in indices {
                            let dist_sq = (self.points[i] - query).norm_squared();
                            if dist_sq <= radius_sq {
                                result.push((i, dist_sq));
                            }
                        }
                    }
                }
            }
        }

        result
    }

    /// Hybrid search: points within `radius`, closest first, at most
    /// `max_neighbors` of them
    pub fn hybrid_neighbors(
        &self,
        query: &Point3<f64>,
        radius: f64,
        max_neighbors: usize,
    ) -> Vec<usize> {
        let mut found = self.within_radius(query, radius);
        found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        found.truncate(max_neighbors);
        found.into_iter().map(|(i, _)| i).collect()
    }
}

#[inline]
fn cell_coords(cell_size: f64, p: &Point3<f64>) -> (i64, i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_points() -> Vec<Point3<f64>> {
        (0..10).map(|i| Point3::new(i as f64 * 0.1, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_within_radius() {
        let points = line_points();
        let grid = SpatialGrid::build(&points, 0.25);
        let mut found: Vec<usize> = grid
            .within_radius(&Point3::new(0.5, 0.0, 0.0), 0.15)
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        found.sort_unstable();
        assert_eq!(found, vec![4, 5, 6]);
    }

    #[test]
    fn test_radius_larger_than_cell() {
        let points = line_points();
        let grid = SpatialGrid::build(&points, 0.05);
        let found = grid.within_radius(&Point3::new(0.0, 0.0, 0.0), 0.35);
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn test_hybrid_neighbors_sorted_and_capped() {
        let points = line_points();
        let grid = SpatialGrid::build(&points, 0.5);
        let found = grid.hybrid_neighbors(&Point3::new(0.52, 0.0, 0.0), 1.0, 3);
        assert_eq!(found, vec![5, 6, 4]);
    }

    #[test]
    fn test_invalid_cell_size_falls_back() {
        let points = line_points();
        let grid = SpatialGrid::build(&points, 0.0);
        assert_eq!(grid.cell_size, 1.0);
        assert_eq!(grid.within_radius(&Point3::new(0.9, 0.0, 0.0), 2.0).len(), 10);
    }
}
