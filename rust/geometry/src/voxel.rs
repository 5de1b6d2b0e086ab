// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Voxel grid down-sampling

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;
use scan_lite_core::{Error, PointCloud, Result};

#[derive(Default)]
struct VoxelAccumulator {
    position: Vector3<f64>,
    normal: Vector3<f64>,
    color: [f64; 3],
    count: usize,
}

/// Replace the points of every occupied voxel by their mean.
///
/// Voxels are cubes of side `voxel_size` anchored at the cloud's minimum
/// corner. Normals are averaged and renormalized (a voxel whose normals
/// cancel out keeps the first member's normal); colors are averaged. Output
/// points are ordered by voxel coordinate.
pub fn voxel_down_sample(cloud: &PointCloud, voxel_size: f64) -> Result<PointCloud> {
    if !voxel_size.is_finite() || voxel_size <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "voxel size must be positive, got {}",
            voxel_size
        )));
    }
    let Some(bounds) = cloud.bounds() else {
        return Ok(PointCloud::new());
    };
    let origin = bounds.min();

    let mut voxels: FxHashMap<(i64, i64, i64), VoxelAccumulator> = FxHashMap::default();
    let mut first_normal: FxHashMap<(i64, i64, i64), Vector3<f64>> = FxHashMap::default();

    for (i, p) in cloud.positions.iter().enumerate() {
        let key = voxel_key(p, &origin, voxel_size);
        let acc = voxels.entry(key).or_default();
        acc.position += p.coords;
        acc.count += 1;
        if let Some(n) = cloud.normal(i) {
            acc.normal += n;
            first_normal.entry(key).or_insert(n);
        }
        if let Some(c) = cloud.colors.as_ref().and_then(|c| c.get(i)) {
            acc.color[0] += c[0] as f64;
            acc.color[1] += c[1] as f64;
            acc.color[2] += c[2] as f64;
        }
    }

    let mut keys: Vec<(i64, i64, i64)> = voxels.keys().copied().collect();
    keys.sort_unstable();

    let mut positions = Vec::with_capacity(keys.len());
    let mut normals = Vec::with_capacity(keys.len());
    let mut colors = Vec::with_capacity(keys.len());

    for key in &keys {
        let acc = &voxels[key];
        let n = acc.count as f64;
        positions.push(Point3::from(acc.position / n));
        if cloud.has_normals() {
            let normal = acc
                .normal
                .try_normalize(f64::EPSILON)
                .or_else(|| first_normal.get(key).copied())
                .unwrap_or_else(Vector3::z);
            normals.push(normal);
        }
        if cloud.has_colors() {
            colors.push([
                (acc.color[0] / n) as f32,
                (acc.color[1] / n) as f32,
                (acc.color[2] / n) as f32,
            ]);
        }
    }

    let mut result = PointCloud::from_positions(positions);
    if cloud.has_normals() {
        result = result.with_normals(normals)?;
    }
    if cloud.has_colors() {
        result = result.with_colors(colors)?;
    }
    Ok(result)
}

#[inline]
fn voxel_key(p: &Point3<f64>, origin: &Point3<f64>, voxel_size: f64) -> (i64, i64, i64) {
    (
        ((p.x - origin.x) / voxel_size).floor() as i64,
        ((p.y - origin.y) / voxel_size).floor() as i64,
        ((p.z - origin.z) / voxel_size).floor() as i64,
    )
}
