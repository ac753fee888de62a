//! # DrawCut Communication
//!
//! Drives the cutter through its startup calibration and streams programs
//! once it is ready. Device telemetry is classified into typed events, a
//! single controller task folds them into the calibration session, and the
//! GRBL device runs the serial IO loop.

pub mod controller;
pub mod device;
pub mod event;
pub mod sequences;
pub mod session;
pub mod telemetry;

pub use controller::{
    controller_channel, send_sequence, ControllerInbox, ControllerMessage, CutterController,
    CutterHandle,
};
pub use device::{EventSink, GrblConfig, GrblDevice, LineTransport, MotionDevice, SerialTransport};
pub use event::{CalibrationState, CutterEvent};
pub use sequences::CalibrationSequences;
pub use session::{CalibrationSession, Directive};
pub use telemetry::{classify_console_line, parse_probe_report, parse_status_report};
