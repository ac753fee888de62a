//! # DrawCut Core
//!
//! Core types shared by the DrawCut crates: the error taxonomy, machining
//! and calibration parameters, the motion program model and cancellable
//! background tasks.

pub mod background;
pub mod error;
pub mod params;
pub mod position;
pub mod program;

pub use background::BackgroundTask;
pub use error::{
    ConnectionError, ControllerError, Error, GeometryError, ProbeTelemetryError, Result,
};
pub use params::{
    pass_count, pass_depths, CalibrationParameters, MachiningParameters, MaterialDimensions,
};
pub use position::Position;
pub use program::{MotionCommand, MotionProgram, OffsetMode};
