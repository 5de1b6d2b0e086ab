// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor elevation detection.
//!
//! Points whose normal is close to the vertical axis are binned by
//! elevation; well-supported local maxima of the histogram become floor
//! levels, and levels closer than the merge distance collapse into the
//! better-supported one.

use crate::round4;
use nalgebra::Vector3;
use scan_lite_core::{Error, FloorLevel, FloorStatus, PointCloud, Result};
use scan_lite_geometry::{GeometryProvider, NormalParams};
use serde::{Deserialize, Serialize};

/// Upper bound on histogram size, reached only by pathological elevation ranges
const MAX_BINS: usize = 100_000;

/// Floor detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    /// Target histogram bin width
    pub bin_width: f64,
    pub min_bins: usize,
    /// Elevation spread below which all points form a single level
    pub flat_range: f64,
    /// `|nz|` above which a point belongs to a horizontal surface
    pub horizontal_threshold: f64,
    pub min_peak_points: usize,
    pub min_peak_fraction: f64,
    /// Levels closer than this are merged
    pub merge_distance: f64,
    pub normal_search_radius: f64,
    pub normal_max_neighbors: usize,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            bin_width: 0.1,
            min_bins: 10,
            flat_range: 0.1,
            horizontal_threshold: 0.8,
            min_peak_points: 50,
            min_peak_fraction: 0.02,
            merge_distance: 0.3,
            normal_search_radius: 0.1,
            normal_max_neighbors: 30,
        }
    }
}

impl FloorConfig {
    /// Config whose normal search radius follows a plane distance threshold
    pub fn for_plane_threshold(plane_threshold: f64) -> Self {
        Self {
            normal_search_radius: plane_threshold * 5.0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{} must be positive, got {}", name, v)))
            }
        };
        positive("bin width", self.bin_width)?;
        positive("normal search radius", self.normal_search_radius)?;
        if !(self.flat_range.is_finite() && self.flat_range >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "flat range must be non-negative, got {}",
                self.flat_range
            )));
        }
        if !(self.merge_distance.is_finite() && self.merge_distance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "merge distance must be non-negative, got {}",
                self.merge_distance
            )));
        }
        if !(self.horizontal_threshold > 0.0 && self.horizontal_threshold < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "horizontal threshold must lie in (0, 1), got {}",
                self.horizontal_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_peak_fraction) {
            return Err(Error::InvalidConfig(format!(
                "peak fraction must lie in [0, 1], got {}",
                self.min_peak_fraction
            )));
        }
        if self.min_bins == 0 {
            return Err(Error::InvalidConfig("at least one histogram bin is required".into()));
        }
        Ok(())
    }

    fn normal_params(&self) -> NormalParams {
        NormalParams {
            search_radius: self.normal_search_radius,
            max_neighbors: self.normal_max_neighbors,
            ..Default::default()
        }
    }
}

/// Detected floor levels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorResult {
    pub total_points: usize,
    pub horizontal_points: usize,
    /// Points excluded because no normal could be estimated for them
    pub normals_failed: usize,
    pub floors: Vec<FloorLevel>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub z_range_m: Option<f64>,
    pub status: FloorStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl FloorResult {
    fn empty(total_points: usize, normals_failed: usize, status: FloorStatus, message: &str) -> Self {
        Self {
            total_points,
            horizontal_points: 0,
            normals_failed,
            floors: Vec::new(),
            z_range_m: None,
            status,
            message: Some(message.to_string()),
        }
    }
}

/// Elevation histogram over `[z_min, z_max]` with per-bin sums
#[derive(Debug, Clone)]
struct Histogram {
    counts: Vec<usize>,
    sums: Vec<f64>,
}

impl Histogram {
    /// Bins are half-open `[lo, hi)` except the last, which also holds `z_max`.
    fn build(values: &[f64], z_min: f64, z_max: f64, bins: usize) -> Self {
        let bin_size = (z_max - z_min) / bins as f64;
        let mut counts = vec![0usize; bins];
        let mut sums = vec![0.0f64; bins];
        for &z in values {
            let bin = (((z - z_min) / bin_size).floor() as usize).min(bins - 1);
            counts[bin] += 1;
            sums[bin] += z;
        }
        Self { counts, sums }
    }

    fn len(&self) -> usize {
        self.counts.len()
    }

    /// Bins meeting `threshold` that no neighbor strictly exceeds. The end
    /// bins qualify on the threshold alone.
    fn peaks(&self, threshold: usize) -> Vec<usize> {
        let n = self.len();
        (0..n)
            .filter(|&i| {
                let count = self.counts[i];
                if count < threshold {
                    return false;
                }
                let left_higher = i > 0 && self.counts[i - 1] > count;
                let right_higher = i + 1 < n && self.counts[i + 1] > count;
                !(left_higher || right_higher) || i == 0 || i == n - 1
            })
            .collect()
    }

    /// Mean elevation of the points in a bin
    fn mean(&self, bin: usize) -> Option<f64> {
        let count = self.counts[bin];
        (count > 0).then(|| self.sums[bin] / count as f64)
    }
}

/// Number of histogram bins for an elevation range
fn bin_count(range: f64, config: &FloorConfig) -> usize {
    // Tolerance keeps exact multiples of the bin width from rounding up
    let target = (range / config.bin_width - 1e-9).ceil();
    let target = if target.is_finite() && target > 0.0 {
        target.min(MAX_BINS as f64) as usize
    } else {
        0
    };
    target.max(config.min_bins)
}

/// Merge candidate levels in ascending order, keeping the better-supported
/// level of any pair closer than `merge_distance`.
fn merge_levels(candidates: impl IntoIterator<Item = (f64, usize)>, merge_distance: f64) -> Vec<(f64, usize)> {
    let mut merged: Vec<(f64, usize)> = Vec::new();
    for (height, count) in candidates {
        if let Some(last) = merged.last_mut() {
            if (height - last.0).abs() < merge_distance {
                if count > last.1 {
                    *last = (height, count);
                }
                continue;
            }
        }
        merged.push((height, count));
    }
    merged
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Turn (height, count) pairs into sorted, reindexed levels with spacing
fn into_levels(mut levels: Vec<(f64, usize)>) -> Vec<FloorLevel> {
    levels.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut floors: Vec<FloorLevel> = Vec::with_capacity(levels.len());
    for (index, (height, count)) in levels.into_iter().enumerate() {
        let floor_to_floor_m = floors.last().map(|prev| round4(height - prev.height_m));
        floors.push(FloorLevel {
            floor_index: index,
            height_m: height,
            point_count: count,
            floor_to_floor_m,
        });
    }
    floors
}

/// Unit normal per point: given normals are normalized, and points with no
/// normal or a zero-length one get the provider's estimate instead
fn resolve_normals<P: GeometryProvider + ?Sized>(
    cloud: &PointCloud,
    config: &FloorConfig,
    provider: &P,
) -> Vec<Option<Vector3<f64>>> {
    let Some(given) = &cloud.normals else {
        return provider.estimate_normals(&cloud.positions, &config.normal_params());
    };
    let mut normals: Vec<Option<Vector3<f64>>> = given.iter().map(|n| n.try_normalize(f64::EPSILON)).collect();
    let unusable = normals.iter().filter(|n| n.is_none()).count();
    if unusable > 0 {
        tracing::debug!(unusable, "Re-estimating degenerate input normals");
        let estimated = provider.estimate_normals(&cloud.positions, &config.normal_params());
        for (normal, fallback) in normals.iter_mut().zip(estimated) {
            if normal.is_none() {
                *normal = fallback;
            }
        }
    }
    normals
}

/// Detect floor elevations in a cloud.
///
/// Uses the cloud's normals when present and asks the provider to estimate
/// them otherwise. Points without a usable normal are counted in
/// `normals_failed` and take no part in the histogram.
pub fn extract_floors<P: GeometryProvider + ?Sized>(
    cloud: &PointCloud,
    config: &FloorConfig,
    provider: &P,
) -> Result<FloorResult> {
    config.validate()?;

    let total = cloud.len();
    if total == 0 {
        return Ok(FloorResult::empty(0, 0, FloorStatus::EmptyInput, "Point cloud is empty"));
    }

    tracing::info!(total_points = total, has_normals = cloud.has_normals(), "Starting floor detection");

    let normals = resolve_normals(cloud, config, provider);
    let normals_failed = normals.iter().filter(|n| n.is_none()).count();
    if normals_failed > 0 {
        tracing::debug!(normals_failed, "Some points have no normal estimate");
    }

    let mut horizontal_z: Vec<f64> = cloud
        .positions
        .iter()
        .zip(&normals)
        .filter_map(|(p, n)| n.filter(|n| n.z.abs() > config.horizontal_threshold).map(|_| p.z))
        .collect();

    if horizontal_z.is_empty() {
        tracing::info!("No horizontal surfaces detected");
        return Ok(FloorResult::empty(
            total,
            normals_failed,
            FloorStatus::NoHorizontalPoints,
            "No horizontal surfaces detected.",
        ));
    }

    let horizontal_points = horizontal_z.len();
    let z_min = horizontal_z.iter().copied().fold(f64::INFINITY, f64::min);
    let z_max = horizontal_z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let z_range = z_max - z_min;

    if z_range < config.flat_range {
        let height = round4(median(&mut horizontal_z));
        tracing::info!(height_m = height, horizontal_points, "All horizontal points form a single level");
        return Ok(FloorResult {
            total_points: total,
            horizontal_points,
            normals_failed,
            floors: into_levels(vec![(height, horizontal_points)]),
            z_range_m: Some(round4(z_range)),
            status: FloorStatus::SingleLevel,
            message: None,
        });
    }

    let bins = bin_count(z_range, config);
    let histogram = Histogram::build(&horizontal_z, z_min, z_max, bins);
    let fraction = (horizontal_points as f64 * config.min_peak_fraction).floor() as usize;
    let threshold = config.min_peak_points.max(fraction);
    let peaks = histogram.peaks(threshold);

    tracing::debug!(bins, threshold, peaks = peaks.len(), "Histogram built");

    let candidates = peaks
        .iter()
        .filter_map(|&bin| histogram.mean(bin).map(|mean| (round4(mean), histogram.counts[bin])));
    let floors = into_levels(merge_levels(candidates, config.merge_distance));

    let (status, message) = if floors.is_empty() {
        (
            FloorStatus::NoPeaks,
            Some("No elevation reached the minimum point support.".to_string()),
        )
    } else {
        (FloorStatus::Detected, None)
    };

    tracing::info!(floors = floors.len(), horizontal_points, z_range_m = z_range, "Floor detection complete");

    Ok(FloorResult {
        total_points: total,
        horizontal_points,
        normals_failed,
        floors,
        z_range_m: Some(round4(z_range)),
        status,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use scan_lite_geometry::NativeProvider;

    fn level(z: f64, count: usize) -> Vec<Point3<f64>> {
        (0..count)
            .map(|i| Point3::new((i % 20) as f64 * 0.1, (i / 20) as f64 * 0.1, z))
            .collect()
    }

    fn with_up_normals(points: Vec<Point3<f64>>) -> PointCloud {
        let n = points.len();
        PointCloud::from_positions(points)
            .with_normals(vec![Vector3::z(); n])
            .unwrap()
    }

    #[test]
    fn test_bin_count() {
        let config = FloorConfig::default();
        assert_eq!(bin_count(3.0, &config), 30);
        assert_eq!(bin_count(0.5, &config), 10);
        assert_eq!(bin_count(3.05, &config), 31);
    }

    #[test]
    fn test_last_bin_is_closed() {
        let histogram = Histogram::build(&[0.0, 0.5, 1.0], 0.0, 1.0, 2);
        assert_eq!(histogram.counts, vec![1, 2]);
        assert_relative_eq!(histogram.mean(1).unwrap(), 0.75);
    }

    #[test]
    fn test_peaks_include_edge_bins() {
        let histogram = Histogram {
            counts: vec![60, 100, 0, 70, 70, 0, 55],
            sums: vec![0.0; 7],
        };
        assert_eq!(histogram.peaks(50), vec![0, 1, 3, 4, 6]);
    }

    #[test]
    fn test_merge_keeps_larger() {
        let merged = merge_levels([(3.0, 120), (3.1, 240), (6.0, 200)], 0.3);
        assert_eq!(merged, vec![(3.1, 240), (6.0, 200)]);
        let merged = merge_levels([(3.0, 300), (3.1, 240)], 0.3);
        assert_eq!(merged, vec![(3.0, 300)]);
    }

    #[test]
    fn test_two_floors() {
        let mut points = level(3.0, 200);
        points.extend(level(6.0, 200));
        let result = extract_floors(&with_up_normals(points), &FloorConfig::default(), &NativeProvider).unwrap();
        assert_eq!(result.status, FloorStatus::Detected);
        assert_eq!(result.floors.len(), 2);
        assert_relative_eq!(result.floors[0].height_m, 3.0, epsilon = 1e-6);
        assert_relative_eq!(result.floors[1].height_m, 6.0, epsilon = 1e-6);
        assert!(result.floors[0].floor_to_floor_m.is_none());
        assert_relative_eq!(result.floors[1].floor_to_floor_m.unwrap(), 3.0, epsilon = 1e-6);
        assert_eq!(result.horizontal_points, 400);
    }

    #[test]
    fn test_close_levels_merge() {
        let mut points = level(3.0, 120);
        points.extend(level(3.1, 240));
        points.extend(level(6.0, 200));
        let result = extract_floors(&with_up_normals(points), &FloorConfig::default(), &NativeProvider).unwrap();
        assert_eq!(result.floors.len(), 2);
        assert_relative_eq!(result.floors[0].height_m, 3.1, epsilon = 1e-6);
        assert_eq!(result.floors[0].point_count, 240);
        assert_relative_eq!(result.floors[1].floor_to_floor_m.unwrap(), 2.9, epsilon = 1e-6);
    }

    #[test]
    fn test_single_level_uses_median() {
        let mut points = level(1.0, 100);
        points.extend(level(1.04, 60));
        let result = extract_floors(&with_up_normals(points), &FloorConfig::default(), &NativeProvider).unwrap();
        assert_eq!(result.status, FloorStatus::SingleLevel);
        assert_eq!(result.floors.len(), 1);
        assert_relative_eq!(result.floors[0].height_m, 1.0);
        assert_eq!(result.floors[0].point_count, 160);
    }

    #[test]
    fn test_no_horizontal_points() {
        let points = level(0.0, 80);
        let n = points.len();
        let cloud = PointCloud::from_positions(points)
            .with_normals(vec![Vector3::x(); n])
            .unwrap();
        let result = extract_floors(&cloud, &FloorConfig::default(), &NativeProvider).unwrap();
        assert_eq!(result.status, FloorStatus::NoHorizontalPoints);
        assert!(result.floors.is_empty());
        assert_eq!(result.message.as_deref(), Some("No horizontal surfaces detected."));
    }

    #[test]
    fn test_given_normals_are_normalized() {
        let mut points = level(3.0, 200);
        points.extend(level(6.0, 200));
        let n = points.len();
        let cloud = PointCloud::from_positions(points)
            .with_normals(vec![Vector3::new(0.0, 0.0, 0.5); n])
            .unwrap();
        let result = extract_floors(&cloud, &FloorConfig::default(), &NativeProvider).unwrap();
        assert_eq!(result.status, FloorStatus::Detected);
        assert_eq!(result.floors.len(), 2);
        assert_eq!(result.horizontal_points, 400);
    }

    #[test]
    fn test_zero_normals_are_estimated() {
        let mut points = level(3.0, 200);
        points.extend(level(6.0, 200));
        let n = points.len();
        let cloud = PointCloud::from_positions(points)
            .with_normals(vec![Vector3::zeros(); n])
            .unwrap();
        let config = FloorConfig {
            normal_search_radius: 0.25,
            ..Default::default()
        };
        let result = extract_floors(&cloud, &config, &NativeProvider).unwrap();
        assert_eq!(result.status, FloorStatus::Detected);
        assert_eq!(result.normals_failed, 0);
        assert_eq!(result.floors.len(), 2);
        assert_relative_eq!(result.floors[1].height_m, 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_isolated_zero_normal_is_counted() {
        let mut points = level(3.0, 200);
        points.push(Point3::new(50.0, 50.0, 9.0));
        let mut normals = vec![Vector3::z(); 200];
        normals.push(Vector3::zeros());
        let cloud = PointCloud::from_positions(points).with_normals(normals).unwrap();
        let result = extract_floors(&cloud, &FloorConfig::default(), &NativeProvider).unwrap();
        assert_eq!(result.normals_failed, 1);
        assert_eq!(result.horizontal_points, 200);
        assert_eq!(result.status, FloorStatus::SingleLevel);
    }

    #[test]
    fn test_sparse_levels_give_no_peaks() {
        let mut points = level(0.0, 20);
        points.extend(level(3.0, 20));
        let result = extract_floors(&with_up_normals(points), &FloorConfig::default(), &NativeProvider).unwrap();
        assert_eq!(result.status, FloorStatus::NoPeaks);
        assert!(result.floors.is_empty());
    }

    #[test]
    fn test_empty_cloud() {
        let result = extract_floors(&PointCloud::new(), &FloorConfig::default(), &NativeProvider).unwrap();
        assert_eq!(result.status, FloorStatus::EmptyInput);
    }

    #[test]
    fn test_invalid_bin_width() {
        let config = FloorConfig {
            bin_width: -0.1,
            ..Default::default()
        };
        let cloud = with_up_normals(level(0.0, 10));
        assert!(matches!(
            extract_floors(&cloud, &config, &NativeProvider),
            Err(Error::InvalidConfig(_))
        ));
    }
}
