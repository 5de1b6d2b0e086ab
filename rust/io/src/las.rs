// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASPRS LAS point clouds via the `las` crate

use crate::error::Result;
use nalgebra::Point3;
use scan_lite_core::PointCloud;
use std::path::Path;

/// Read a `.las` file. Coordinates come back with scale and offset applied.
///
/// Colors are attached when every point carries one. LAS stores 16-bit
/// channels, but many writers put 8-bit values in them, so the scale is
/// picked from the largest channel seen.
pub fn read_las(path: &Path) -> Result<PointCloud> {
    let mut reader = las::Reader::from_path(path)?;
    let expected = reader.header().number_of_points() as usize;

    let mut positions = Vec::with_capacity(expected);
    let mut raw_colors: Vec<[u16; 3]> = Vec::new();
    for point in reader.points() {
        let point = point?;
        positions.push(Point3::new(point.x, point.y, point.z));
        if let Some(color) = point.color {
            raw_colors.push([color.red, color.green, color.blue]);
        }
    }

    let mut cloud = PointCloud::from_positions(positions);
    if !raw_colors.is_empty() && raw_colors.len() == cloud.len() {
        let brightest = raw_colors.iter().flatten().copied().max().unwrap_or(0);
        let scale = if brightest > 255 { 65535.0 } else { 255.0 };
        cloud.colors = Some(
            raw_colors
                .iter()
                .map(|c| [c[0] as f32 / scale, c[1] as f32 / scale, c[2] as f32 / scale])
                .collect(),
        );
    }
    Ok(cloud)
}
