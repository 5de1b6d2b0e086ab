//! Scan-Lite Geometry Primitives
//!
//! The capability layer the feature extractors are written against:
//! normal estimation, RANSAC plane fitting, plane–triangle intersection,
//! index selection and voxel down-sampling. Neighbor queries use a hashed
//! cell grid, linear algebra uses nalgebra, and per-point / per-trial work
//! runs on rayon.

pub mod fit;
pub mod intersect;
pub mod normals;
pub mod provider;
pub mod ransac;
pub mod spatial;
pub mod voxel;

pub use fit::{fit_plane_least_squares, principal_normal};
pub use intersect::{intersect_triangle, TriangleCut};
pub use normals::{estimate_normals, NormalParams};
pub use provider::{GeometryProvider, NativeProvider};
pub use ransac::{fit_plane_ransac, PlaneFit, RansacParams};
pub use spatial::SpatialGrid;
pub use voxel::voxel_down_sample;
