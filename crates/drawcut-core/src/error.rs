//! Error handling for DrawCut
//!
//! Provides the error types for every layer of the application:
//! - Geometry errors (outline generation, path import)
//! - Controller errors (calibration and telemetry)
//! - Connection errors (opening the motion device)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Raised synchronously by outline generation and path import when the
/// input cannot be turned into a machine-safe outline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The buffered path did not produce exactly an outer and an inner contour
    #[error("Path has intersections or has no interior ({contours} contours)")]
    IntersectingOrNoInterior {
        /// Number of contours the buffer produced.
        contours: usize,
    },

    /// The path contains no drawable segment
    #[error("Path is empty")]
    EmptyPath,

    /// An outline with no contour cannot be machined
    #[error("Outline has no contours")]
    DegenerateOutline,

    /// Buffer width must be finite and positive
    #[error("Invalid buffer width: {0}")]
    InvalidWidth(f64),

    /// Flattening tolerance must be finite and positive
    #[error("Invalid flattening tolerance: {0}")]
    InvalidTolerance(f64),

    /// The offset engine could not process the loop
    #[error("Offset failed: {0}")]
    OffsetFailed(String),

    /// Path data could not be parsed
    #[error("Invalid path data: {0}")]
    PathData(String),

    /// Glyph outlines were unavailable
    #[error("Glyph error: {0}")]
    Glyph(String),
}

/// Probe telemetry error type
///
/// The coordinate reset needs the depth reported by the probing cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeTelemetryError {
    /// The probing stages completed without a probe report
    #[error("Probe depth was not reported before coordinate reset")]
    MissingProbeDepth,

    /// A probe report could not be parsed
    #[error("Malformed probe report: {line}")]
    MalformedReport {
        /// The offending console line.
        line: String,
    },
}

/// Controller error type
///
/// Represents errors raised while calibrating or streaming to the cutter.
/// Calibration errors move the session to `Failed`; they are not retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// Probe telemetry was missing or malformed
    #[error(transparent)]
    ProbeTelemetry(#[from] ProbeTelemetryError),

    /// The controller reported an error line
    #[error("Controller reported an error: {line}")]
    ControllerProtocol {
        /// The console line that contained the error.
        line: String,
    },

    /// A calibration stream finished unsuccessfully
    #[error("Stream failed during {stage}")]
    StreamFailed {
        /// The calibration stage that was streaming.
        stage: String,
    },

    /// The controller task has stopped
    #[error("Cutter controller is not running")]
    NotRunning,

    /// The motion device rejected an operation
    #[error("Device error: {message}")]
    Device {
        /// The error message from the device.
        message: String,
    },
}

/// Connection error type
///
/// Represents errors opening or talking to the motion device.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Connection lost
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {reason}")]
    IoError {
        /// The reason for the I/O error.
        reason: String,
    },

    /// No port configured while the cutter is enabled
    #[error("No serial port configured")]
    NoPortConfigured,
}

/// Main error type for DrawCut
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a controller error
    pub fn is_controller_error(&self) -> bool {
        matches!(self, Error::Controller(_))
    }
}

impl From<ProbeTelemetryError> for Error {
    fn from(err: ProbeTelemetryError) -> Self {
        Error::Controller(ControllerError::ProbeTelemetry(err))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_display() {
        let err = GeometryError::IntersectingOrNoInterior { contours: 3 };
        assert_eq!(
            err.to_string(),
            "Path has intersections or has no interior (3 contours)"
        );
    }

    #[test]
    fn test_probe_error_wraps_into_controller() {
        let err: Error = ProbeTelemetryError::MissingProbeDepth.into();
        assert!(err.is_controller_error());
        assert_eq!(
            err.to_string(),
            "Probe depth was not reported before coordinate reset"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_geometry_error());
    }

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::FailedToOpen {
            port: "/dev/ttyUSB0".to_string(),
            reason: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to open port /dev/ttyUSB0: busy");
        assert!(Error::from(err).is_connection_error());
    }
}
