// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cloud statistics and voxel down-sampling

use scan_lite_core::{Bounds3, PointCloud, Result};
use scan_lite_geometry::voxel_down_sample;
use serde::{Deserialize, Serialize};

/// Extents of a cloud along each axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_m: f64,
    pub depth_m: f64,
    pub height_m: f64,
}

impl From<&Bounds3> for Dimensions {
    fn from(bounds: &Bounds3) -> Self {
        Self {
            width_m: bounds.width(),
            depth_m: bounds.depth(),
            height_m: bounds.height(),
        }
    }
}

/// What a point cloud contains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudSummary {
    pub point_count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bounds: Option<Bounds3>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dimensions: Option<Dimensions>,
    pub has_color: bool,
    pub has_normals: bool,
}

pub fn summarize(cloud: &PointCloud) -> CloudSummary {
    let bounds = cloud.bounds();
    CloudSummary {
        point_count: cloud.len(),
        dimensions: bounds.as_ref().map(Dimensions::from),
        bounds,
        has_color: cloud.has_colors(),
        has_normals: cloud.has_normals(),
    }
}

/// Point counts before and after down-sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownsampleSummary {
    pub original_points: usize,
    pub downsampled_points: usize,
    pub reduction_percent: f64,
    pub voxel_size_m: f64,
}

/// Voxel down-sample a cloud and report the reduction
pub fn downsample(cloud: &PointCloud, voxel_size: f64) -> Result<(PointCloud, DownsampleSummary)> {
    let reduced = voxel_down_sample(cloud, voxel_size)?;
    let original = cloud.len();
    let kept = reduced.len();
    let reduction = if original > 0 {
        (original - kept) as f64 / original as f64 * 100.0
    } else {
        0.0
    };

    tracing::info!(
        original_points = original,
        downsampled_points = kept,
        voxel_size_m = voxel_size,
        "Down-sampled point cloud"
    );

    Ok((
        reduced,
        DownsampleSummary {
            original_points: original,
            downsampled_points: kept,
            reduction_percent: (reduction * 100.0).round() / 100.0,
            voxel_size_m: voxel_size,
        },
    ))
}
