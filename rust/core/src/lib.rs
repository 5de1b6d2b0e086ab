// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Scan-Lite Core
//!
//! Data model shared by the scan-lite crates:
//!
//! - [`PointCloud`]: struct-of-arrays point storage with optional normals and colors
//! - [`Mesh`]: flat vertex/index triangle mesh
//! - [`PlaneModel`]: `a·x + b·y + c·z + d = 0` with unit normal
//! - Result records ([`PlaneRecord`], [`FloorLevel`], [`SectionResult`]) and
//!   the status enums that explain empty results
//!
//! Everything here is request-scoped: built from decoded input geometry,
//! consumed by one algorithm run, serialized, and dropped.

pub mod cloud;
pub mod error;
pub mod mesh;
pub mod outcome;
pub mod plane;
pub mod records;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

pub use cloud::{Bounds3, PointCloud};
pub use error::{Error, Result};
pub use mesh::{Mesh, Triangle};
pub use outcome::Outcome;
pub use plane::PlaneModel;
pub use records::{
    BoundingBox2D, FloorLevel, FloorStatus, Orientation, PlaneRecord, Point2D, SectionResult,
    SectionSegment, SectionStatus, SegmentationStatus, SurfaceType,
};
