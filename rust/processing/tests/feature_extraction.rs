// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end checks of plane segmentation, floor detection and section
//! cutting on synthetic scans and meshes.

use approx::assert_relative_eq;
use scan_lite_core::{
    FloorStatus, Mesh, Orientation, Point3, PointCloud, SectionStatus, SegmentationStatus, SurfaceType,
    Vector3,
};
use scan_lite_geometry::NativeProvider;
use scan_lite_processing::{
    classify_orientation, cut_section, extract_floors, segment_planes, CutPlane, FloorConfig, SectionConfig,
    SegmentationConfig,
};

fn grid(nu: usize, nv: usize, spacing: f64, f: impl Fn(f64, f64) -> Point3<f64>) -> Vec<Point3<f64>> {
    (0..nu)
        .flat_map(|i| (0..nv).map(move |j| (i as f64 * spacing, j as f64 * spacing)))
        .map(|(u, v)| f(u, v))
        .collect()
}

/// Floor (400 points), wall (300 points) and 60 scattered clutter points
fn room_scan() -> PointCloud {
    let mut points = grid(20, 20, 0.1, |x, y| Point3::new(x, y, 0.0));
    points.extend(grid(15, 20, 0.1, |y, z| Point3::new(3.0, y, z + 0.5)));
    for k in 0..60 {
        let t = k as f64;
        points.push(Point3::new(
            0.2 + (t * 0.37) % 1.5,
            0.1 + (t * 0.53) % 1.7,
            0.3 + (t * 0.11) % 1.4,
        ));
    }
    PointCloud::from_positions(points)
}

fn room_config() -> SegmentationConfig {
    SegmentationConfig {
        min_inliers: Some(100),
        ..Default::default()
    }
}

#[test]
fn test_points_on_one_plane_give_one_record() {
    // Tilted plane z = 0.3 x + 0.1 y + 2
    let points = grid(20, 20, 0.1, |x, y| Point3::new(x, y, 0.3 * x + 0.1 * y + 2.0));
    let cloud = PointCloud::from_positions(points);
    let result = segment_planes(&cloud, &SegmentationConfig::default(), &NativeProvider).unwrap();

    assert_eq!(result.planes.len(), 1);
    assert_eq!(result.planes[0].inlier_count, 400);
    assert_relative_eq!(result.planes[0].inlier_ratio, 1.0);
    assert_eq!(result.remaining_points, 0);
}

#[test]
fn test_empty_cloud_gives_no_planes() {
    let result = segment_planes(&PointCloud::new(), &SegmentationConfig::default(), &NativeProvider).unwrap();
    assert!(result.planes.is_empty());
    assert!(result.residual_cloud(&PointCloud::new()).is_empty());
}

#[test]
fn test_orientation_classification() {
    let cases = [
        (Vector3::new(0.0, 0.0, 1.0), Orientation::Horizontal, SurfaceType::Floor),
        (Vector3::new(0.0, 0.0, -1.0), Orientation::Horizontal, SurfaceType::Ceiling),
        (Vector3::new(1.0, 0.0, 0.0), Orientation::Vertical, SurfaceType::Wall),
    ];
    for (normal, orientation, sub_type) in cases {
        assert_eq!(classify_orientation(&normal, 0.8, None), (orientation, sub_type));
    }
}

#[test]
fn test_room_scan_segmentation() {
    let cloud = room_scan();
    let result = segment_planes(&cloud, &room_config(), &NativeProvider).unwrap();

    assert_eq!(result.planes.len(), 2);
    assert_eq!(result.status, SegmentationStatus::InsufficientPoints);
    assert_eq!(result.remaining_points, 60);

    let floor = &result.planes[0];
    assert_eq!(floor.plane_index, 0);
    assert_eq!(floor.inlier_count, 400);
    assert_eq!(floor.sub_type, SurfaceType::Floor);

    let wall = &result.planes[1];
    assert_eq!(wall.plane_index, 1);
    assert_eq!(wall.inlier_count, 300);
    assert_eq!(wall.orientation, Orientation::Vertical);
    assert_eq!(wall.sub_type, SurfaceType::Wall);
    assert_relative_eq!(wall.centroid[0], 3.0, epsilon = 1e-9);
    assert_relative_eq!(wall.inlier_ratio, 300.0 / 760.0, epsilon = 1e-4);
}

#[test]
fn test_residual_has_no_further_planes() {
    let cloud = room_scan();
    let config = room_config();
    let first = segment_planes(&cloud, &config, &NativeProvider).unwrap();
    let residual = first.residual_cloud(&cloud);
    assert_eq!(residual.len(), first.remaining_points);

    let second = segment_planes(&residual, &config, &NativeProvider).unwrap();
    assert!(second.planes.is_empty());
    assert_eq!(second.remaining_points, residual.len());
}

#[test]
fn test_segmentation_is_deterministic() {
    let cloud = room_scan();
    let a = segment_planes(&cloud, &room_config(), &NativeProvider).unwrap();
    let b = segment_planes(&cloud, &room_config(), &NativeProvider).unwrap();
    assert_eq!(a.planes.len(), b.planes.len());
    for (pa, pb) in a.planes.iter().zip(&b.planes) {
        assert_eq!(pa.normal, pb.normal);
        assert_eq!(pa.d, pb.d);
        assert_eq!(pa.inlier_indices, pb.inlier_indices);
    }
}

#[test]
fn test_segmentation_json_shape() {
    let cloud = room_scan();
    let result = segment_planes(&cloud, &room_config(), &NativeProvider).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["total_points"], 760);
    assert_eq!(json["status"], "insufficient_points");
    assert_eq!(json["planes"][0]["sub_type"], "floor");
    assert!(json["planes"][0].get("inlier_indices").is_none());
    assert!(json.get("residual_indices").is_none());
}

#[test]
fn test_two_stories_with_estimated_normals() {
    let mut points = grid(20, 20, 0.05, |x, y| Point3::new(x, y, 3.0));
    points.extend(grid(20, 20, 0.05, |x, y| Point3::new(x, y, 6.0)));
    let cloud = PointCloud::from_positions(points);

    let result = extract_floors(&cloud, &FloorConfig::default(), &NativeProvider).unwrap();
    assert_eq!(result.status, FloorStatus::Detected);
    assert_eq!(result.normals_failed, 0);
    assert_eq!(result.horizontal_points, 800);
    assert_eq!(result.floors.len(), 2);
    assert_relative_eq!(result.floors[0].height_m, 3.0, epsilon = 1e-6);
    assert_relative_eq!(result.floors[1].height_m, 6.0, epsilon = 1e-6);
    assert_relative_eq!(result.floors[1].floor_to_floor_m.unwrap(), 3.0, epsilon = 1e-6);
    assert_eq!(result.floors[0].floor_index, 0);
    assert_eq!(result.floors[1].floor_index, 1);
}

#[test]
fn test_close_clusters_merge_into_larger() {
    let mut points = grid(10, 12, 0.1, |x, y| Point3::new(x, y, 3.0));
    points.extend(grid(12, 20, 0.1, |x, y| Point3::new(x, y, 3.1)));
    points.extend(grid(10, 20, 0.1, |x, y| Point3::new(x, y, 6.0)));
    let n = points.len();
    let cloud = PointCloud::from_positions(points)
        .with_normals(vec![Vector3::z(); n])
        .unwrap();

    let result = extract_floors(&cloud, &FloorConfig::default(), &NativeProvider).unwrap();
    assert_eq!(result.floors.len(), 2);
    assert_relative_eq!(result.floors[0].height_m, 3.1, epsilon = 1e-6);
    assert_eq!(result.floors[0].point_count, 240);
    for pair in result.floors.windows(2) {
        assert!(pair[1].height_m - pair[0].height_m >= 0.3);
    }
}

#[test]
fn test_isolated_points_are_flagged_not_zeroed() {
    let mut points = grid(20, 20, 0.05, |x, y| Point3::new(x, y, 0.0));
    points.push(Point3::new(50.0, 50.0, 50.0));
    let cloud = PointCloud::from_positions(points);

    let result = extract_floors(&cloud, &FloorConfig::default(), &NativeProvider).unwrap();
    assert_eq!(result.normals_failed, 1);
    assert_eq!(result.horizontal_points, 400);
    assert_eq!(result.status, FloorStatus::SingleLevel);
}

#[test]
fn test_unit_cube_section() {
    let cube = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
    let result = cut_section(&cube, &CutPlane::horizontal(0.5), &SectionConfig::default(), &NativeProvider).unwrap();

    assert_eq!(result.status, SectionStatus::Ok);
    assert_eq!(result.segments.len(), 4);
    let perimeter: f64 = result.segments.iter().map(|s| s.length()).sum();
    assert_relative_eq!(perimeter, 4.0, epsilon = 1e-9);
    for s in &result.segments {
        assert_ne!(s.start, s.end);
    }

    let bbox = result.bounding_box.unwrap();
    assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (0.0, 0.0, 1.0, 1.0));
}

#[test]
fn test_cut_above_cube_is_not_an_error() {
    let cube = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
    let result = cut_section(&cube, &CutPlane::horizontal(2.0), &SectionConfig::default(), &NativeProvider).unwrap();
    assert!(result.segments.is_empty());
    assert_eq!(result.status, SectionStatus::NoIntersection);
    assert!(result.message.is_some());
}

#[test]
fn test_vertical_section_is_an_elevation() {
    let cube = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
    // Walking along +Y, the plane x = 0.5 sits at offset -0.5 along its normal (-1, 0, 0)
    let cut = CutPlane::vertical(-0.5, 90.0);
    let result = cut_section(&cube, &cut, &SectionConfig::default(), &NativeProvider).unwrap();

    assert_eq!(result.segments.len(), 4);
    let bbox = result.bounding_box.unwrap();
    assert_relative_eq!(bbox.min_x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(bbox.max_x, 1.0, epsilon = 1e-9);
    assert_relative_eq!(bbox.min_y, 0.0, epsilon = 1e-9);
    assert_relative_eq!(bbox.max_y, 1.0, epsilon = 1e-9);
}

#[test]
fn test_two_boxes_give_two_contours() {
    let mut mesh = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 3.0));
    mesh.merge(&Mesh::cuboid(Point3::new(4.0, 0.0, 0.0), Point3::new(6.0, 0.5, 3.0)));
    let result = cut_section(&mesh, &CutPlane::horizontal(1.2), &SectionConfig::default(), &NativeProvider).unwrap();
    assert_eq!(result.contour_count, 2);
    assert_eq!(result.segments.len(), 8);
    let bbox = result.bounding_box.unwrap();
    assert_relative_eq!(bbox.max_x, 6.0);
    assert_relative_eq!(bbox.max_y, 1.0);
}
