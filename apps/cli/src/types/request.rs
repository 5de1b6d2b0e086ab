// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request types, one per operation.

use crate::error::CliError;
use scan_lite_processing::{CutPlaneSpec, FloorConfig, SectionConfig, SegmentationConfig};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const OPERATIONS: [&str; 5] = ["info", "downsample", "segment_planes", "extract_floors", "section"];

/// A single request, tagged by its `operation` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Request {
    Info(InfoRequest),
    Downsample(DownsampleRequest),
    SegmentPlanes(SegmentRequest),
    ExtractFloors(FloorRequest),
    Section(SectionRequest),
}

/// Summarize a point cloud file.
#[derive(Debug, Clone, Deserialize)]
pub struct InfoRequest {
    pub file_path: PathBuf,
}

/// Voxel down-sample a point cloud into a new file.
#[derive(Debug, Clone, Deserialize)]
pub struct DownsampleRequest {
    pub file_path: PathBuf,
    pub output_path: PathBuf,
    pub downsample_voxel_size_m: f64,
}

/// Detect dominant planes.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentRequest {
    pub file_path: PathBuf,
    /// Where to also write the JSON result.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Overrides `config.distance_threshold` when given.
    #[serde(default)]
    pub plane_distance_threshold_m: Option<f64>,
    #[serde(default)]
    pub config: Option<SegmentationConfig>,
}

/// Detect floor elevations.
#[derive(Debug, Clone, Deserialize)]
pub struct FloorRequest {
    pub file_path: PathBuf,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Sets the normal search radius (five times this distance) when no
    /// `config` is given.
    #[serde(default)]
    pub plane_distance_threshold_m: Option<f64>,
    #[serde(default)]
    pub config: Option<FloorConfig>,
}

/// Cut a mesh and write the section drawing.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionRequest {
    pub file_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub cut_plane: CutPlaneSpec,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub config: Option<SectionConfig>,
}

fn default_output_format() -> String {
    "svg".to_string()
}

/// Plane distance threshold used when a request gives none.
pub const DEFAULT_PLANE_THRESHOLD: f64 = 0.02;

impl Request {
    /// Decode a request, rejecting unknown operations by name.
    pub fn from_value(value: Value) -> Result<Self, CliError> {
        let operation = value
            .get("operation")
            .and_then(Value::as_str)
            .ok_or_else(|| CliError::InvalidRequest("Missing \"operation\" field".into()))?;
        if !OPERATIONS.contains(&operation) {
            return Err(CliError::InvalidRequest(format!("Unknown operation: {}", operation)));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Request::Info(_) => "info",
            Request::Downsample(_) => "downsample",
            Request::SegmentPlanes(_) => "segment_planes",
            Request::ExtractFloors(_) => "extract_floors",
            Request::Section(_) => "section",
        }
    }

    pub fn file_path(&self) -> &Path {
        match self {
            Request::Info(r) => &r.file_path,
            Request::Downsample(r) => &r.file_path,
            Request::SegmentPlanes(r) => &r.file_path,
            Request::ExtractFloors(r) => &r.file_path,
            Request::Section(r) => &r.file_path,
        }
    }
}

impl SegmentRequest {
    /// Effective segmentation parameters
    pub fn segmentation_config(&self) -> SegmentationConfig {
        let mut config = self.config.unwrap_or_default();
        if let Some(threshold) = self.plane_distance_threshold_m {
            config.distance_threshold = threshold;
        }
        config
    }
}

impl FloorRequest {
    /// Effective floor detection parameters
    pub fn floor_config(&self) -> FloorConfig {
        match self.config {
            Some(config) => config,
            None => FloorConfig::for_plane_threshold(
                self.plane_distance_threshold_m.unwrap_or(DEFAULT_PLANE_THRESHOLD),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_defaults() {
        let request = Request::from_value(json!({
            "operation": "section",
            "file_path": "model.obj",
            "output_path": "out/plan.svg"
        }))
        .unwrap();
        let Request::Section(section) = request else {
            panic!("expected a section request");
        };
        assert_eq!(section.output_format, "svg");
        assert_eq!(section.cut_plane.kind, "horizontal");
        assert!(section.config.is_none());
    }

    #[test]
    fn test_threshold_overrides_config() {
        let request = Request::from_value(json!({
            "operation": "segment_planes",
            "file_path": "scan.xyz",
            "plane_distance_threshold_m": 0.05,
            "config": { "max_planes": 3 }
        }))
        .unwrap();
        let Request::SegmentPlanes(segment) = request else {
            panic!("expected a segmentation request");
        };
        let config = segment.segmentation_config();
        assert_eq!(config.distance_threshold, 0.05);
        assert_eq!(config.max_planes, 3);
        assert_eq!(config.ransac_iterations, 1000);
    }

    #[test]
    fn test_floor_radius_follows_threshold() {
        let request: FloorRequest = serde_json::from_value(json!({
            "file_path": "scan.xyz",
            "plane_distance_threshold_m": 0.04
        }))
        .unwrap();
        assert!((request.floor_config().normal_search_radius - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_and_missing_operation() {
        let err = Request::from_value(json!({ "operation": "mesh", "file_path": "a.ply" })).unwrap_err();
        assert_eq!(err.to_string(), "Unknown operation: mesh");
        assert_eq!(err.code(), "INVALID_REQUEST");

        let err = Request::from_value(json!({ "file_path": "a.ply" })).unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");

        // Known operation, missing required field
        let err = Request::from_value(json!({ "operation": "downsample", "file_path": "a.ply" })).unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }
}
