use thiserror::Error;

/// Result type for scan-lite operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an operation.
///
/// Missing data (too few points, no intersections) is not an error; it is
/// reported through the status field of the result records instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown cut plane type: {0}")]
    UnsupportedCutPlane(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid point cloud: {0}")]
    InvalidCloud(String),
}
