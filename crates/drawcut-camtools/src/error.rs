//! Error types for the CAM tools crate.
//!
//! This module provides structured error types for program generation and
//! parameter validation.

use std::io;

use drawcut_core::GeometryError;
use thiserror::Error;

/// Errors that can occur while generating a motion program.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// Invalid parameters were provided to a generator.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The geometry to cut is unusable.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Initials could not be laid out.
    #[error("Initials layout failed: {0}")]
    Initials(String),

    /// I/O error while writing a program file.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<drawcut_core::Error> for CamToolError {
    fn from(err: drawcut_core::Error) -> Self {
        match err {
            drawcut_core::Error::Geometry(e) => CamToolError::Geometry(e),
            drawcut_core::Error::Io(e) => CamToolError::IoError(e),
            other => CamToolError::InvalidParameters(other.to_string()),
        }
    }
}

/// Result type for CAM tool operations.
pub type CamToolResult<T> = Result<T, CamToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CamToolError::InvalidParameters("depth_of_cut must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid parameters: depth_of_cut must be positive"
        );

        let err: CamToolError = GeometryError::DegenerateOutline.into();
        assert!(err.to_string().starts_with("Geometry error: "));
    }

    #[test]
    fn test_core_error_conversion() {
        let err: CamToolError = drawcut_core::Error::Geometry(GeometryError::EmptyPath).into();
        assert!(matches!(err, CamToolError::Geometry(GeometryError::EmptyPath)));
    }
}
