// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plane model in implicit form

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Plane `a·x + b·y + c·z + d = 0` with unit normal `(a, b, c)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneModel {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl PlaneModel {
    /// Build from raw coefficients, normalizing so that `(a, b, c)` has unit
    /// length. `None` if the normal part vanishes or is not finite.
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Option<Self> {
        let norm = (a * a + b * b + c * c).sqrt();
        if !norm.is_finite() || norm < f64::EPSILON || !d.is_finite() {
            return None;
        }
        Some(Self {
            a: a / norm,
            b: b / norm,
            c: c / norm,
            d: d / norm,
        })
    }

    /// Plane through `point` with the given normal
    pub fn from_point_normal(point: &Point3<f64>, normal: &Vector3<f64>) -> Option<Self> {
        let n = normal.try_normalize(f64::EPSILON)?;
        Self::new(n.x, n.y, n.z, -n.dot(&point.coords))
    }

    /// Plane through three points, `None` when they are collinear
    pub fn from_points(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Option<Self> {
        let normal = (p1 - p0).cross(&(p2 - p0));
        let scale = (p1 - p0).norm() * (p2 - p0).norm();
        if scale <= 0.0 || normal.norm() <= scale * 1e-12 {
            return None;
        }
        Self::from_point_normal(p0, &normal)
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        Vector3::new(self.a, self.b, self.c)
    }

    /// Calculate signed distance from point to plane
    /// Positive = on the side the normal points to
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.a * point.x + self.b * point.y + self.c * point.z + self.d
    }

    #[inline]
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        self.signed_distance(point).abs()
    }

    /// Same plane with the normal reversed
    #[inline]
    pub fn flipped(&self) -> Self {
        Self {
            a: -self.a,
            b: -self.b,
            c: -self.c,
            d: -self.d,
        }
    }
}
