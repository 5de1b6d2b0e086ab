// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Least-squares plane fitting via covariance eigen-decomposition

use nalgebra::{Matrix3, Point3, Vector3};
use scan_lite_core::PlaneModel;

/// Relative eigenvalue below which the point spread is considered flat
const DEGENERATE_SPREAD: f64 = 1e-12;

/// Centroid and covariance of a point set, `None` for fewer than 3 points
fn covariance<'a, I>(points: I) -> Option<(Point3<f64>, Matrix3<f64>)>
where
    I: IntoIterator<Item = &'a Point3<f64>> + Clone,
{
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for p in points.clone() {
        sum += p.coords;
        count += 1;
    }
    if count < 3 {
        return None;
    }
    let centroid = sum / count as f64;

    let mut cov = Matrix3::zeros();
    for p in points {
        let r = p.coords - centroid;
        cov += r * r.transpose();
    }
    Some((Point3::from(centroid), cov / count as f64))
}

/// Direction of least variance of a neighborhood.
///
/// `None` when the points are (nearly) collinear or coincident, since the
/// normal is then undefined. The sign of the result is arbitrary.
pub fn principal_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    fit_with_centroid(points.iter()).map(|(_, normal)| normal)
}

/// Total least-squares plane through a point set
pub fn fit_plane_least_squares(points: &[Point3<f64>]) -> Option<PlaneModel> {
    let (centroid, normal) = fit_with_centroid(points.iter())?;
    PlaneModel::from_point_normal(&centroid, &normal)
}

/// Least-squares plane through `points[i]` for each listed index
pub fn fit_plane_indexed(points: &[Point3<f64>], indices: &[usize]) -> Option<PlaneModel> {
    let (centroid, normal) = fit_with_centroid(indices.iter().map(|&i| &points[i]))?;
    PlaneModel::from_point_normal(&centroid, &normal)
}

fn fit_with_centroid<'a, I>(points: I) -> Option<(Point3<f64>, Vector3<f64>)>
where
    I: IntoIterator<Item = &'a Point3<f64>> + Clone,
{
    let (centroid, cov) = covariance(points)?;
    let eigen = cov.symmetric_eigen();

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
    let middle = eigen.eigenvalues[order[1]];
    let largest = eigen.eigenvalues[order[2]];
    if !largest.is_finite() || largest <= 0.0 || middle <= largest * DEGENERATE_SPREAD {
        return None;
    }

    let normal: Vector3<f64> = eigen.eigenvectors.column(order[0]).into_owned();
    normal
        .try_normalize(f64::EPSILON)
        .map(|n| (centroid, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_tilted_plane() {
        // z = 0.5 x + 1
        let points: Vec<Point3<f64>> = (0..5)
            .flat_map(|i| (0..5).map(move |j| (i as f64, j as f64)))
            .map(|(x, y)| Point3::new(x, y, 0.5 * x + 1.0))
            .collect();
        let plane = fit_plane_least_squares(&points).unwrap();
        for p in &points {
            assert!(plane.distance(p) < 1e-9);
        }
        let expected = Vector3::new(-0.5, 0.0, 1.0).normalize();
        assert_relative_eq!(plane.normal().dot(&expected).abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_points_have_no_normal() {
        let points: Vec<Point3<f64>> = (0..6).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        assert!(principal_normal(&points).is_none());
        assert!(principal_normal(&points[..2]).is_none());
    }

    #[test]
    fn test_indexed_fit_uses_subset() {
        let mut points: Vec<Point3<f64>> = (0..4)
            .flat_map(|i| (0..4).map(move |j| Point3::new(i as f64, j as f64, 2.0)))
            .collect();
        points.push(Point3::new(0.0, 0.0, 50.0));
        let indices: Vec<usize> = (0..16).collect();
        let plane = fit_plane_indexed(&points, &indices).unwrap();
        assert_relative_eq!(plane.distance(&Point3::new(7.0, -3.0, 2.0)), 0.0, epsilon = 1e-9);
    }
}
