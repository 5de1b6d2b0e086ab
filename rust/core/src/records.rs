// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Result records produced by plane segmentation, floor detection and
//! section cutting

use crate::plane::PlaneModel;
use serde::{Deserialize, Serialize};

/// Plane orientation relative to the vertical axis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Architectural surface classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceType {
    Floor,
    Ceiling,
    Wall,
    /// Inclined surface (ramp, pitched roof); only produced when an upper
    /// bound for wall normals is configured
    Other,
}

/// Detected planar surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaneRecord {
    /// Order of acceptance (0 = largest plane found first)
    pub plane_index: usize,
    /// Unit normal (a, b, c)
    pub normal: [f64; 3],
    pub d: f64,
    pub orientation: Orientation,
    pub sub_type: SurfaceType,
    pub inlier_count: usize,
    /// Inliers over the total point count of the input cloud
    pub inlier_ratio: f64,
    pub centroid: [f64; 3],
    /// Inlier indices into the input cloud
    #[serde(skip)]
    pub inlier_indices: Vec<usize>,
}

impl PlaneRecord {
    pub fn model(&self) -> PlaneModel {
        PlaneModel {
            a: self.normal[0],
            b: self.normal[1],
            c: self.normal[2],
            d: self.d,
        }
    }
}

/// Detected story elevation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FloorLevel {
    pub floor_index: usize,
    pub height_m: f64,
    pub point_count: usize,
    /// Elevation delta to the floor below; absent for the lowest floor
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub floor_to_floor_m: Option<f64>,
}

/// A 2D point (simplified for serialization)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Contour segment in the cut plane's local 2D frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SectionSegment {
    pub start: Point2D,
    pub end: Point2D,
}

impl SectionSegment {
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }
}

/// Axis-aligned bounds in the section frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox2D {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox2D {
    /// Bounds over all segment endpoints. A zero-extent axis is widened to
    /// `min_extent`, keeping its minimum in place.
    pub fn from_segments(segments: &[SectionSegment], min_extent: f64) -> Option<Self> {
        let first = segments.first()?;
        let mut bbox = Self {
            min_x: first.start.x,
            min_y: first.start.y,
            max_x: first.start.x,
            max_y: first.start.y,
        };
        for p in segments.iter().flat_map(|s| [s.start, s.end]) {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        if bbox.width() < 1e-6 {
            bbox.max_x = bbox.min_x + min_extent;
        }
        if bbox.height() < 1e-6 {
            bbox.max_y = bbox.min_y + min_extent;
        }
        Some(bbox)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Why plane segmentation stopped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationStatus {
    /// The plane budget was used up
    Completed,
    /// Fewer points remain than the minimum inlier count
    InsufficientPoints,
    /// The best remaining plane has too few inliers
    BelowMinInliers,
    /// Every RANSAC trial hit a degenerate sample
    FitFailed,
    EmptyInput,
}

/// Outcome of floor detection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FloorStatus {
    Detected,
    /// All horizontal points lie within the flat range
    SingleLevel,
    NoHorizontalPoints,
    /// No histogram bin reached the support threshold
    NoPeaks,
    EmptyInput,
}

/// Outcome of a section cut
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Ok,
    NoIntersection,
}

/// Ordered contour segments of a section cut
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResult {
    pub segments: Vec<SectionSegment>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bounding_box: Option<BoundingBox2D>,
    /// Number of chained contours the segments belong to
    pub contour_count: usize,
    pub status: SectionStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl SectionResult {
    pub fn no_intersection() -> Self {
        Self {
            segments: Vec::new(),
            bounding_box: None,
            contour_count: 0,
            status: SectionStatus::NoIntersection,
            message: Some("No intersections found at the specified cut plane.".into()),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_expands_degenerate_axis() {
        let segments = vec![SectionSegment::new(Point2D::new(2.0, 5.0), Point2D::new(4.0, 5.0))];
        let bbox = BoundingBox2D::from_segments(&segments, 1.0).unwrap();
        assert_eq!(bbox.min_x, 2.0);
        assert_eq!(bbox.max_x, 4.0);
        assert_eq!(bbox.min_y, 5.0);
        assert_eq!(bbox.max_y, 6.0);
        assert!(BoundingBox2D::from_segments(&[], 1.0).is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&SegmentationStatus::BelowMinInliers).unwrap();
        assert_eq!(json, "\"below_min_inliers\"");
        let json = serde_json::to_string(&SurfaceType::Ceiling).unwrap();
        assert_eq!(json, "\"ceiling\"");
    }

    #[test]
    fn test_floor_level_omits_missing_spacing() {
        let level = FloorLevel {
            floor_index: 0,
            height_m: 0.0,
            point_count: 120,
            floor_to_floor_m: None,
        };
        let json = serde_json::to_value(&level).unwrap();
        assert!(json.get("floor_to_floor_m").is_none());
    }

    #[test]
    fn test_plane_record_skips_inlier_indices() {
        let record = PlaneRecord {
            plane_index: 0,
            normal: [0.0, 0.0, 1.0],
            d: -1.0,
            orientation: Orientation::Horizontal,
            sub_type: SurfaceType::Floor,
            inlier_count: 3,
            inlier_ratio: 1.0,
            centroid: [0.0, 0.0, 1.0],
            inlier_indices: vec![0, 1, 2],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("inlier_indices").is_none());
        assert_eq!(json["orientation"], "horizontal");
        assert_eq!(record.model().d, -1.0);
    }
}
