// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Iterative multi-plane segmentation.
//!
//! Each round fits the best-supported plane among the points not yet
//! claimed, classifies it, and masks its inliers out. The backing cloud is
//! never rebuilt; the remaining set is a boolean mask over its indices.

use crate::round4;
use nalgebra::Vector3;
use scan_lite_core::{
    Error, Orientation, Outcome, PlaneModel, PlaneRecord, PointCloud, Result, SegmentationStatus,
    SurfaceType,
};
use scan_lite_geometry::{GeometryProvider, PlaneFit, RansacParams};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How the sign of a fitted plane normal is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneNormalPolicy {
    /// Keep whatever sign the fit produced
    AsFitted,
    /// Face the centroid of the whole cloud (floors up, ceilings down,
    /// walls inward)
    #[default]
    TowardCentroid,
    /// Agree with the summed input normals of the inliers. Falls back to
    /// `AsFitted` when the cloud carries no normals.
    PointNormals,
}

/// Plane segmentation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Inlier distance (τ)
    pub distance_threshold: f64,
    /// Explicit minimum inlier count; derived from the cloud size when absent
    pub min_inliers: Option<usize>,
    pub min_inliers_floor: usize,
    pub min_inlier_fraction: f64,
    pub max_planes: usize,
    pub ransac_iterations: usize,
    pub sample_size: usize,
    /// `|nz|` above which a plane is horizontal
    pub horizontal_threshold: f64,
    /// `|nz|` above which a non-horizontal plane is no longer a wall.
    /// Unset means every non-horizontal plane is a wall.
    pub wall_max_nz: Option<f64>,
    pub seed: u64,
    pub refine: bool,
    pub normal_policy: PlaneNormalPolicy,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.02,
            min_inliers: None,
            min_inliers_floor: 100,
            min_inlier_fraction: 0.01,
            max_planes: 10,
            ransac_iterations: 1000,
            sample_size: 3,
            horizontal_threshold: 0.8,
            wall_max_nz: None,
            seed: 42,
            refine: true,
            normal_policy: PlaneNormalPolicy::default(),
        }
    }
}

impl SegmentationConfig {
    /// Config with the given inlier distance and defaults elsewhere
    pub fn with_threshold(distance_threshold: f64) -> Self {
        Self {
            distance_threshold,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.distance_threshold.is_finite() || self.distance_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "distance threshold must be positive, got {}",
                self.distance_threshold
            )));
        }
        if self.sample_size < 3 {
            return Err(Error::InvalidConfig(format!(
                "RANSAC sample size must be at least 3, got {}",
                self.sample_size
            )));
        }
        if self.ransac_iterations == 0 {
            return Err(Error::InvalidConfig("RANSAC iterations must be at least 1".into()));
        }
        if !(self.horizontal_threshold > 0.0 && self.horizontal_threshold < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "horizontal threshold must lie in (0, 1), got {}",
                self.horizontal_threshold
            )));
        }
        if let Some(wall_max) = self.wall_max_nz {
            if !(wall_max > 0.0 && wall_max <= self.horizontal_threshold) {
                return Err(Error::InvalidConfig(format!(
                    "wall normal bound must lie in (0, {}], got {}",
                    self.horizontal_threshold, wall_max
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.min_inlier_fraction) {
            return Err(Error::InvalidConfig(format!(
                "minimum inlier fraction must lie in [0, 1], got {}",
                self.min_inlier_fraction
            )));
        }
        Ok(())
    }

    /// Minimum inlier count for a cloud of `total` points (never below 1)
    pub fn resolve_min_inliers(&self, total: usize) -> usize {
        let m = self.min_inliers.unwrap_or_else(|| {
            let fraction = (total as f64 * self.min_inlier_fraction).floor() as usize;
            self.min_inliers_floor.max(fraction)
        });
        m.max(1)
    }

    /// RANSAC parameters for a given round; each round draws from its own seed
    pub fn ransac_params(&self, round: usize) -> RansacParams {
        RansacParams {
            distance_threshold: self.distance_threshold,
            iterations: self.ransac_iterations,
            sample_size: self.sample_size,
            seed: self.seed.wrapping_add(round as u64),
            refine: self.refine,
        }
    }
}

/// Classify a unit plane normal.
///
/// `|nz| > horizontal_threshold` is horizontal: a floor when `nz` is positive,
/// otherwise a ceiling. Everything else is vertical, and a wall unless
/// `wall_max_nz` is set and exceeded.
pub fn classify_orientation(
    normal: &Vector3<f64>,
    horizontal_threshold: f64,
    wall_max_nz: Option<f64>,
) -> (Orientation, SurfaceType) {
    let nz = normal.z.abs();
    if nz > horizontal_threshold {
        let sub_type = if normal.z > 0.0 {
            SurfaceType::Floor
        } else {
            SurfaceType::Ceiling
        };
        (Orientation::Horizontal, sub_type)
    } else {
        match wall_max_nz {
            Some(limit) if nz > limit => (Orientation::Vertical, SurfaceType::Other),
            _ => (Orientation::Vertical, SurfaceType::Wall),
        }
    }
}

/// Result of one segmentation round
#[derive(Debug, Clone)]
pub enum PlaneStep {
    Found(PlaneRecord),
    Stop(SegmentationStatus),
}

/// Planes found in a cloud plus what was left over
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub total_points: usize,
    pub planes: Vec<PlaneRecord>,
    pub remaining_points: usize,
    pub plane_distance_threshold_m: f64,
    pub min_inliers: usize,
    pub status: SegmentationStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// Indices of points not claimed by any plane, ascending
    #[serde(skip)]
    pub residual_indices: Vec<usize>,
}

impl SegmentationResult {
    /// Materialize the unclaimed points of `cloud`
    pub fn residual_cloud(&self, cloud: &PointCloud) -> PointCloud {
        cloud.select_by_index(&self.residual_indices, false)
    }
}

/// Run one segmentation round over the points not yet in `removed`.
///
/// Pure with respect to its inputs: the caller applies the returned
/// inliers to the mask.
pub fn next_plane<P: GeometryProvider + ?Sized>(
    cloud: &PointCloud,
    removed: &[bool],
    round: usize,
    config: &SegmentationConfig,
    provider: &P,
) -> PlaneStep {
    let total = cloud.len();
    let min_inliers = config.resolve_min_inliers(total);

    let remaining: Vec<usize> = removed
        .iter()
        .enumerate()
        .take(total)
        .filter_map(|(i, &r)| (!r).then_some(i))
        .collect();
    if remaining.len() < min_inliers {
        tracing::debug!(round, remaining = remaining.len(), min_inliers, "Too few points left for a plane");
        return PlaneStep::Stop(SegmentationStatus::InsufficientPoints);
    }

    let fit = match provider.fit_plane_ransac(&cloud.positions, &remaining, &config.ransac_params(round)) {
        Outcome::Ok(fit) => fit,
        Outcome::Skipped(reason) => {
            tracing::debug!(round, reason = %reason, "Plane fit skipped");
            return PlaneStep::Stop(SegmentationStatus::InsufficientPoints);
        }
        Outcome::Failed(cause) => {
            tracing::warn!(round, cause = %cause, "Plane fit failed, stopping segmentation");
            return PlaneStep::Stop(SegmentationStatus::FitFailed);
        }
    };

    if fit.inliers.len() < min_inliers {
        tracing::debug!(round, inliers = fit.inliers.len(), min_inliers, "Best plane below inlier minimum");
        return PlaneStep::Stop(SegmentationStatus::BelowMinInliers);
    }

    PlaneStep::Found(build_record(cloud, fit, round, config))
}

fn build_record(cloud: &PointCloud, fit: PlaneFit, round: usize, config: &SegmentationConfig) -> PlaneRecord {
    let model = orient_plane(cloud, &fit, config.normal_policy);
    let normal = model.normal();
    let (orientation, sub_type) = classify_orientation(&normal, config.horizontal_threshold, config.wall_max_nz);
    let centroid = cloud
        .centroid_of(&fit.inliers)
        .map(|c| [round4(c.x), round4(c.y), round4(c.z)])
        .unwrap_or([0.0; 3]);

    PlaneRecord {
        plane_index: round,
        normal: [normal.x, normal.y, normal.z],
        d: model.d,
        orientation,
        sub_type,
        inlier_count: fit.inliers.len(),
        inlier_ratio: round4(fit.inliers.len() as f64 / cloud.len() as f64),
        centroid,
        inlier_indices: fit.inliers,
    }
}

fn orient_plane(cloud: &PointCloud, fit: &PlaneFit, policy: PlaneNormalPolicy) -> PlaneModel {
    let model = fit.model;
    let reference: Option<f64> = match policy {
        PlaneNormalPolicy::AsFitted => None,
        PlaneNormalPolicy::TowardCentroid => cloud
            .centroid()
            .zip(cloud.centroid_of(&fit.inliers))
            .map(|(whole, plane)| model.normal().dot(&(whole - plane))),
        PlaneNormalPolicy::PointNormals => cloud.normals.as_ref().map(|normals| {
            let sum: Vector3<f64> = fit.inliers.iter().filter_map(|&i| normals.get(i)).sum();
            model.normal().dot(&sum)
        }),
    };
    match reference {
        Some(dot) if dot < -f64::EPSILON => model.flipped(),
        _ => model,
    }
}

/// Greedily extract up to `max_planes` planes from `cloud`.
pub fn segment_planes<P: GeometryProvider + ?Sized>(
    cloud: &PointCloud,
    config: &SegmentationConfig,
    provider: &P,
) -> Result<SegmentationResult> {
    config.validate()?;

    let total = cloud.len();
    let min_inliers = config.resolve_min_inliers(total);
    if total == 0 {
        return Ok(SegmentationResult {
            total_points: 0,
            planes: Vec::new(),
            remaining_points: 0,
            plane_distance_threshold_m: config.distance_threshold,
            min_inliers,
            status: SegmentationStatus::EmptyInput,
            message: Some("Point cloud is empty".into()),
            residual_indices: Vec::new(),
        });
    }

    tracing::info!(
        total_points = total,
        min_inliers,
        max_planes = config.max_planes,
        distance_threshold = config.distance_threshold,
        "Starting plane segmentation"
    );
    let start = Instant::now();

    let mut removed = vec![false; total];
    let mut planes = Vec::new();
    let mut status = SegmentationStatus::Completed;

    for round in 0..config.max_planes {
        match next_plane(cloud, &removed, round, config, provider) {
            PlaneStep::Found(record) => {
                for &i in &record.inlier_indices {
                    removed[i] = true;
                }
                tracing::debug!(
                    plane_index = record.plane_index,
                    inliers = record.inlier_count,
                    sub_type = ?record.sub_type,
                    "Accepted plane"
                );
                planes.push(record);
            }
            PlaneStep::Stop(reason) => {
                status = reason;
                break;
            }
        }
    }

    let residual_indices: Vec<usize> = removed
        .iter()
        .enumerate()
        .filter_map(|(i, &r)| (!r).then_some(i))
        .collect();

    tracing::info!(
        planes = planes.len(),
        remaining_points = residual_indices.len(),
        status = ?status,
        elapsed_ms = start.elapsed().as_millis(),
        "Plane segmentation complete"
    );

    let message = match status {
        SegmentationStatus::FitFailed => Some("Plane fitting failed on the remaining points.".to_string()),
        _ => None,
    };

    Ok(SegmentationResult {
        total_points: total,
        planes,
        remaining_points: residual_indices.len(),
        plane_distance_threshold_m: config.distance_threshold,
        min_inliers,
        status,
        message,
        residual_indices,
    })
}
