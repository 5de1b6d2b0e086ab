use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, IoError>;

/// Errors raised while reading or writing geometry files
#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("No geometry in {0}")]
    Empty(String),

    #[error("LAS error: {0}")]
    Las(#[from] las::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IoError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        IoError::Parse {
            line,
            message: message.into(),
        }
    }
}

impl From<IoError> for scan_lite_core::Error {
    fn from(err: IoError) -> Self {
        scan_lite_core::Error::InputUnavailable(err.to_string())
    }
}
