// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point cloud data structures

use crate::error::{Error, Result};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounds of a point set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds3 {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl Bounds3 {
    /// Compute bounds of an iterator of points, `None` when it is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min_x: first.x,
            min_y: first.y,
            min_z: first.z,
            max_x: first.x,
            max_y: first.y,
            max_z: first.z,
        };
        for p in iter {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.min_z = bounds.min_z.min(p.z);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
            bounds.max_z = bounds.max_z.max(p.z);
        }
        Some(bounds)
    }

    /// Extent along X
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Extent along Y
    #[inline]
    pub fn depth(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Extent along Z
    #[inline]
    pub fn height(&self) -> f64 {
        self.max_z - self.min_z
    }

    pub fn min(&self) -> Point3<f64> {
        Point3::new(self.min_x, self.min_y, self.min_z)
    }
}

/// Unordered point collection with optional per-point normals and colors.
///
/// Stored as parallel arrays; when present, `normals` and `colors` have the
/// same length as `positions`. Colors are RGB in `0.0..=1.0`.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub positions: Vec<Point3<f64>>,
    pub normals: Option<Vec<Vector3<f64>>>,
    pub colors: Option<Vec<[f32; 3]>>,
}

impl PointCloud {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point cloud from bare positions
    pub fn from_positions(positions: Vec<Point3<f64>>) -> Self {
        Self {
            positions,
            normals: None,
            colors: None,
        }
    }

    /// Attach per-point normals
    pub fn with_normals(mut self, normals: Vec<Vector3<f64>>) -> Result<Self> {
        if normals.len() != self.positions.len() {
            return Err(Error::InvalidCloud(format!(
                "{} normals for {} points",
                normals.len(),
                self.positions.len()
            )));
        }
        self.normals = Some(normals);
        Ok(self)
    }

    /// Attach per-point colors
    pub fn with_colors(mut self, colors: Vec<[f32; 3]>) -> Result<Self> {
        if colors.len() != self.positions.len() {
            return Err(Error::InvalidCloud(format!(
                "{} colors for {} points",
                colors.len(),
                self.positions.len()
            )));
        }
        self.colors = Some(colors);
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Normal of point `index`, if the cloud carries normals
    #[inline]
    pub fn normal(&self, index: usize) -> Option<Vector3<f64>> {
        self.normals.as_ref().and_then(|n| n.get(index).copied())
    }

    /// Select points by index.
    ///
    /// With `invert == false` the result holds the listed points in the order
    /// given. With `invert == true` it holds every point *not* listed, in
    /// ascending index order. Out-of-range indices are ignored.
    pub fn select_by_index(&self, indices: &[usize], invert: bool) -> PointCloud {
        let selected: Vec<usize> = if invert {
            let mut keep = vec![true; self.len()];
            for &i in indices {
                if let Some(slot) = keep.get_mut(i) {
                    *slot = false;
                }
            }
            keep.iter()
                .enumerate()
                .filter_map(|(i, &k)| k.then_some(i))
                .collect()
        } else {
            indices.iter().copied().filter(|&i| i < self.len()).collect()
        };

        PointCloud {
            positions: selected.iter().map(|&i| self.positions[i]).collect(),
            normals: self
                .normals
                .as_ref()
                .map(|n| selected.iter().map(|&i| n[i]).collect()),
            colors: self
                .colors
                .as_ref()
                .map(|c| selected.iter().map(|&i| c[i]).collect()),
        }
    }

    /// Axis-aligned bounds, `None` for an empty cloud
    pub fn bounds(&self) -> Option<Bounds3> {
        Bounds3::from_points(&self.positions)
    }

    /// Mean position of all points
    pub fn centroid(&self) -> Option<Point3<f64>> {
        mean_of(self.positions.iter())
    }

    /// Mean position of the listed points
    pub fn centroid_of(&self, indices: &[usize]) -> Option<Point3<f64>> {
        mean_of(indices.iter().filter_map(|&i| self.positions.get(i)))
    }
}

fn mean_of<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Option<Point3<f64>> {
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for p in points {
        sum += p.coords;
        count += 1;
    }
    (count > 0).then(|| Point3::from(sum / count as f64))
}
