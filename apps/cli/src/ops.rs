// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operation handlers: load the input, run the algorithm, write outputs.

use crate::error::CliError;
use crate::types::{
    DownsampleRequest, DownsampleResponse, FloorRequest, FloorResponse, InfoRequest, InfoResponse, Request,
    Response, SectionRequest, SectionResponse, SegmentRequest, SegmentResponse,
};
use scan_lite_core::{Mesh, PointCloud, SectionStatus};
use scan_lite_geometry::NativeProvider;
use scan_lite_io::{IoError, SectionFormat};
use scan_lite_processing::{cut_section, downsample, extract_floors, segment_planes, summarize, CutPlane};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Run one request to completion.
pub fn run(request: &Request) -> Result<Response, CliError> {
    let start = Instant::now();
    let path = request.file_path();
    if !path.is_file() {
        return Err(CliError::InputUnavailable(format!("File not found: {}", path.display())));
    }

    let response = match request {
        Request::Info(r) => info(r).map(Response::Info),
        Request::Downsample(r) => down_sample(r).map(Response::Downsample),
        Request::SegmentPlanes(r) => segment(r).map(Response::Segment),
        Request::ExtractFloors(r) => floors(r).map(Response::Floors),
        Request::Section(r) => section(r).map(Response::Section),
    }?;

    tracing::info!(
        operation = request.operation(),
        file = %path.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request complete"
    );
    Ok(response)
}

/// Absolute form of a path, without resolving symlinks
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn display(path: &Path) -> String {
    absolute(path).display().to_string()
}

fn load_cloud(path: &Path) -> Result<PointCloud, CliError> {
    scan_lite_io::read_point_cloud(path)
        .map_err(|e| CliError::InputUnavailable(format!("Could not load point cloud: {}", e)))
}

fn load_mesh(path: &Path) -> Result<Mesh, CliError> {
    scan_lite_io::read_mesh(path)
        .map_err(|e| CliError::InputUnavailable(format!("Failed to load 3D model as mesh. {}", e)))
}

fn output_error(path: &Path) -> impl FnOnce(IoError) -> CliError + '_ {
    move |e| CliError::Output(format!("Could not write {}: {}", path.display(), e))
}

fn file_size(path: &Path) -> Result<u64, CliError> {
    scan_lite_io::file_size(path).map_err(output_error(path))
}

fn info(request: &InfoRequest) -> Result<InfoResponse, CliError> {
    let path = &request.file_path;
    let cloud = load_cloud(path)?;
    Ok(InfoResponse {
        file_path: display(path),
        file_size_bytes: file_size(path)?,
        file_extension: format!(".{}", scan_lite_io::extension(path)),
        summary: summarize(&cloud),
    })
}

fn down_sample(request: &DownsampleRequest) -> Result<DownsampleResponse, CliError> {
    let cloud = load_cloud(&request.file_path)?;
    let (reduced, summary) = downsample(&cloud, request.downsample_voxel_size_m)?;

    let output = absolute(&request.output_path);
    scan_lite_io::write_point_cloud(&output, &reduced).map_err(output_error(&output))?;
    Ok(DownsampleResponse {
        output_path: output.display().to_string(),
        summary,
        file_size_bytes: file_size(&output)?,
    })
}

fn segment(request: &SegmentRequest) -> Result<SegmentResponse, CliError> {
    let config = request.segmentation_config();
    // Reject bad parameters before touching the file
    config.validate()?;
    let cloud = load_cloud(&request.file_path)?;
    let result = segment_planes(&cloud, &config, &NativeProvider)?;

    let output_path = match &request.output_path {
        Some(path) => {
            let output = absolute(path);
            scan_lite_io::write_json(&output, &result).map_err(output_error(&output))?;
            Some(output.display().to_string())
        }
        None => None,
    };
    Ok(SegmentResponse { result, output_path })
}

fn floors(request: &FloorRequest) -> Result<FloorResponse, CliError> {
    let config = request.floor_config();
    config.validate()?;
    let cloud = load_cloud(&request.file_path)?;
    let result = extract_floors(&cloud, &config, &NativeProvider)?;

    let output_path = match &request.output_path {
        Some(path) => {
            let output = absolute(path);
            scan_lite_io::write_json(&output, &result).map_err(output_error(&output))?;
            Some(output.display().to_string())
        }
        None => None,
    };
    Ok(FloorResponse { result, output_path })
}

fn section(request: &SectionRequest) -> Result<SectionResponse, CliError> {
    let format = SectionFormat::parse(&request.output_format)
        .map_err(|_| CliError::InvalidRequest(format!("Unsupported output format: {}", request.output_format)))?;
    let cut = CutPlane::from_spec(&request.cut_plane)?;
    let config = request.config.unwrap_or_default();
    config.validate()?;

    let mesh = load_mesh(&request.file_path)?;
    let result = cut_section(&mesh, &cut, &config, &NativeProvider)?;
    let output = absolute(&request.output_path);

    if result.status == SectionStatus::NoIntersection {
        return Ok(SectionResponse {
            output_path: output.display().to_string(),
            contour_segments: 0,
            contour_count: None,
            bounding_box: None,
            cut_plane: None,
            file_size_bytes: None,
            warning: result.message,
        });
    }

    scan_lite_io::write_section(&output, &result, format).map_err(output_error(&output))?;
    Ok(SectionResponse {
        output_path: output.display().to_string(),
        contour_segments: result.segments.len(),
        contour_count: Some(result.contour_count),
        bounding_box: result.bounding_box,
        cut_plane: Some(cut),
        file_size_bytes: Some(file_size(&output)?),
        warning: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use serde_json::json;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scan-lite-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn request(value: serde_json::Value) -> Request {
        Request::from_value(value).unwrap()
    }

    /// 20 x 20 floor at z = 0 and a 15 x 20 wall at x = 3
    fn write_room(name: &str) -> PathBuf {
        let mut points = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                points.push(Point3::new(i as f64 * 0.1, j as f64 * 0.1, 0.0));
            }
        }
        for i in 0..15 {
            for j in 0..20 {
                points.push(Point3::new(3.0, i as f64 * 0.1, j as f64 * 0.1 + 0.5));
            }
        }
        let path = scratch(name);
        scan_lite_io::write_point_cloud(&path, &PointCloud::from_positions(points)).unwrap();
        path
    }

    fn write_cube(name: &str) -> PathBuf {
        let path = scratch(name);
        fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 0 0 1\nv 1 0 1\nv 1 1 1\nv 0 1 1\n\
             f 1 3 2\nf 1 4 3\nf 5 6 7\nf 5 7 8\nf 1 2 6\nf 1 6 5\n\
             f 2 3 7\nf 2 7 6\nf 3 4 8\nf 3 8 7\nf 4 1 5\nf 4 5 8\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_missing_file() {
        let err = run(&request(json!({ "operation": "info", "file_path": "/no/such/scan.xyz" }))).unwrap_err();
        assert_eq!(err.code(), "INPUT_UNAVAILABLE");
        assert!(err.to_string().starts_with("File not found"));
    }

    #[test]
    fn test_info() {
        let path = write_room("info.xyz");
        let Response::Info(info) = run(&request(json!({ "operation": "info", "file_path": path }))).unwrap() else {
            panic!("expected info");
        };
        assert_eq!(info.summary.point_count, 700);
        assert_eq!(info.file_extension, ".xyz");
        assert!(!info.summary.has_color);
        let dims = info.summary.dimensions.unwrap();
        assert!((dims.width_m - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_downsample_writes_output() {
        let path = write_room("dense.xyz");
        let output = scratch("reduced/sparse.ply");
        let Response::Downsample(down) = run(&request(json!({
            "operation": "downsample",
            "file_path": path,
            "output_path": output,
            "downsample_voxel_size_m": 0.5
        })))
        .unwrap() else {
            panic!("expected downsample");
        };
        assert_eq!(down.summary.original_points, 700);
        assert!(down.summary.downsampled_points < 700);
        assert!(down.file_size_bytes > 0);
        assert!(output.is_file());
    }

    #[test]
    fn test_segment_planes_writes_json() {
        let path = write_room("room.xyz");
        let output = scratch("planes/result.json");
        let Response::Segment(segment) = run(&request(json!({
            "operation": "segment_planes",
            "file_path": path,
            "output_path": output
        })))
        .unwrap() else {
            panic!("expected segmentation");
        };
        assert_eq!(segment.result.planes.len(), 2);
        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["total_points"], 700);
        assert!(written.get("output_path").is_none());
    }

    #[test]
    fn test_invalid_threshold_is_config_error() {
        let path = write_room("bad.xyz");
        let err = run(&request(json!({
            "operation": "segment_planes",
            "file_path": path,
            "plane_distance_threshold_m": -1.0
        })))
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_section_svg_and_miss() {
        let path = write_cube("cube.obj");
        let output = scratch("plans/cube.svg");
        let Response::Section(hit) = run(&request(json!({
            "operation": "section",
            "file_path": path,
            "output_path": output,
            "cut_plane": { "type": "horizontal", "height_m": 0.5 }
        })))
        .unwrap() else {
            panic!("expected section");
        };
        assert_eq!(hit.contour_segments, 4);
        assert!(hit.file_size_bytes.unwrap() > 0);
        let bbox = hit.bounding_box.unwrap();
        assert_eq!((bbox.min_x, bbox.max_x), (0.0, 1.0));

        let Response::Section(miss) = run(&request(json!({
            "operation": "section",
            "file_path": path,
            "output_path": scratch("plans/none.svg"),
            "cut_plane": { "type": "horizontal", "height_m": 2.0 }
        })))
        .unwrap() else {
            panic!("expected section");
        };
        assert_eq!(miss.contour_segments, 0);
        assert!(miss.warning.is_some());
    }

    #[test]
    fn test_section_rejections() {
        let path = write_cube("cube2.obj");
        let err = run(&request(json!({
            "operation": "section",
            "file_path": path,
            "output_path": scratch("x.pdf"),
            "output_format": "pdf"
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported output format: pdf");

        let err = run(&request(json!({
            "operation": "section",
            "file_path": path,
            "output_path": scratch("x.svg"),
            "cut_plane": { "type": "oblique" }
        })))
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }
}
