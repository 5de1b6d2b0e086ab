// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Scan-Lite Processing
//!
//! Architectural feature extraction over decoded point clouds and meshes:
//!
//! - [`segment_planes`]: greedy RANSAC plane segmentation with
//!   floor / ceiling / wall classification
//! - [`extract_floors`]: story elevations from a histogram of
//!   near-horizontal points
//! - [`cut_section`]: horizontal or vertical section contours
//! - [`summarize`] and [`downsample`]: cloud statistics and voxel reduction
//!
//! Every entry point takes an explicit configuration record and a
//! [`GeometryProvider`](scan_lite_geometry::GeometryProvider).
//!
//! ```rust,ignore
//! use scan_lite_geometry::NativeProvider;
//! use scan_lite_processing::{segment_planes, SegmentationConfig};
//!
//! let result = segment_planes(&cloud, &SegmentationConfig::default(), &NativeProvider)?;
//! for plane in &result.planes {
//!     println!("{:?} with {} points", plane.sub_type, plane.inlier_count);
//! }
//! ```

pub mod floors;
pub mod section;
pub mod segmenter;
pub mod summary;

pub use floors::{extract_floors, FloorConfig, FloorResult};
pub use section::{cut_section, CutPlane, CutPlaneSpec, SectionConfig};
pub use segmenter::{
    classify_orientation, next_plane, segment_planes, PlaneNormalPolicy, PlaneStep, SegmentationConfig,
    SegmentationResult,
};
pub use summary::{downsample, summarize, CloudSummary, Dimensions, DownsampleSummary};

/// Round to four decimals for reported values
#[inline]
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
