// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and the JSON error body.

use serde::Serialize;
use thiserror::Error;

/// Errors reported for a single request.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    InputUnavailable(String),

    #[error("{0}")]
    InvalidConfig(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Output(String),
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl CliError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::InputUnavailable(_) => "INPUT_UNAVAILABLE",
            CliError::InvalidConfig(_) => "INVALID_CONFIG",
            CliError::InvalidRequest(_) => "INVALID_REQUEST",
            CliError::Output(_) => "OUTPUT_ERROR",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        }
    }
}

impl From<scan_lite_core::Error> for CliError {
    fn from(err: scan_lite_core::Error) -> Self {
        use scan_lite_core::Error;
        match err {
            Error::InvalidConfig(_) | Error::UnsupportedCutPlane(_) => CliError::InvalidConfig(err.to_string()),
            Error::InputUnavailable(_) | Error::InvalidMesh(_) | Error::InvalidCloud(_) => {
                CliError::InputUnavailable(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::InvalidRequest(format!("Invalid request: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_codes() {
        let err = CliError::from(scan_lite_core::Error::UnsupportedCutPlane("diagonal".into()));
        assert_eq!(err.code(), "INVALID_CONFIG");
        assert_eq!(err.to_string(), "Unknown cut plane type: diagonal");

        let err = CliError::from(scan_lite_core::Error::InvalidMesh("index 9 out of range".into()));
        assert_eq!(err.code(), "INPUT_UNAVAILABLE");
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(CliError::Output("disk full".into()).to_response()).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "disk full", "code": "OUTPUT_ERROR" }));
    }
}
