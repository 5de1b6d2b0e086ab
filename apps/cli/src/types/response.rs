// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response types for the CLI.

use crate::error::{CliError, ErrorResponse};
use scan_lite_core::BoundingBox2D;
use scan_lite_processing::{CloudSummary, CutPlane, DownsampleSummary, FloorResult, SegmentationResult};
use serde::Serialize;

/// Point cloud file summary.
#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    /// Absolute path of the input file.
    pub file_path: String,
    pub file_size_bytes: u64,
    /// Lower-case extension including the dot (e.g. ".ply").
    pub file_extension: String,
    #[serde(flatten)]
    pub summary: CloudSummary,
}

/// Down-sampling result.
#[derive(Debug, Clone, Serialize)]
pub struct DownsampleResponse {
    pub output_path: String,
    #[serde(flatten)]
    pub summary: DownsampleSummary,
    pub file_size_bytes: u64,
}

/// Plane segmentation result.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentResponse {
    #[serde(flatten)]
    pub result: SegmentationResult,
    /// Present when the result was also written to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// Floor detection result.
#[derive(Debug, Clone, Serialize)]
pub struct FloorResponse {
    #[serde(flatten)]
    pub result: FloorResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// Section cut result. Cuts that miss the model report only the path, a
/// zero segment count and a warning; no drawing is written.
#[derive(Debug, Clone, Serialize)]
pub struct SectionResponse {
    pub output_path: String,
    pub contour_segments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contour_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox2D>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut_plane: Option<CutPlane>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Successful result of any operation.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Info(InfoResponse),
    Downsample(DownsampleResponse),
    Segment(SegmentResponse),
    Floors(FloorResponse),
    Section(SectionResponse),
}

/// What is printed for one request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Ok(Response),
    Err(ErrorResponse),
}

impl Reply {
    pub fn is_err(&self) -> bool {
        matches!(self, Reply::Err(_))
    }
}

impl From<Result<Response, CliError>> for Reply {
    fn from(outcome: Result<Response, CliError>) -> Self {
        match outcome {
            Ok(response) => Reply::Ok(response),
            Err(err) => Reply::Err(err.to_response()),
        }
    }
}

/// Everything printed for one invocation: a single reply, or one per
/// element of a batch, in input order.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Output {
    Single(Reply),
    Batch(Vec<Reply>),
}

impl Output {
    pub fn has_errors(&self) -> bool {
        match self {
            Output::Single(reply) => reply.is_err(),
            Output::Batch(replies) => replies.iter().any(Reply::is_err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missed_cut_shape() {
        let response = Response::Section(SectionResponse {
            output_path: "/tmp/plan.svg".into(),
            contour_segments: 0,
            contour_count: None,
            bounding_box: None,
            cut_plane: None,
            file_size_bytes: None,
            warning: Some("No intersections found at the specified cut plane.".into()),
        });
        assert_eq!(
            serde_json::to_value(Reply::Ok(response)).unwrap(),
            json!({
                "output_path": "/tmp/plan.svg",
                "contour_segments": 0,
                "warning": "No intersections found at the specified cut plane."
            })
        );
    }

    #[test]
    fn test_batch_error_detection() {
        let output = Output::Batch(vec![
            Reply::from(Err::<Response, _>(CliError::InvalidRequest("bad".into()))),
            Reply::Err(ErrorResponse {
                error: "x".into(),
                code: "OUTPUT_ERROR".into(),
            }),
        ]);
        assert!(output.has_errors());
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value[0]["code"], "INVALID_REQUEST");
    }
}
