//! Calibration states and the events that drive them.

use std::fmt;

use drawcut_core::Position;
use serde::{Deserialize, Serialize};

/// Where the cutter is in its startup calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalibrationState {
    NotConnected,
    Connected,
    Homing,
    /// Fast probe toward the tool length sensor.
    Probing1,
    /// Slow probe for the precise tool length.
    Probing2,
    /// Retract clear of the sensor.
    Probing3,
    CoordinateReset,
    Ready,
    /// Terminal; the session ignores every further event.
    Failed,
}

impl CalibrationState {
    /// States in which a calibration stream is running.
    pub fn is_streaming_stage(self) -> bool {
        matches!(
            self,
            CalibrationState::Probing1
                | CalibrationState::Probing2
                | CalibrationState::Probing3
                | CalibrationState::CoordinateReset
        )
    }

    /// Ready or Failed.
    pub fn is_settled(self) -> bool {
        matches!(self, CalibrationState::Ready | CalibrationState::Failed)
    }
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalibrationState::NotConnected => "not connected",
            CalibrationState::Connected => "connected",
            CalibrationState::Homing => "homing",
            CalibrationState::Probing1 => "probing (fast)",
            CalibrationState::Probing2 => "probing (fine)",
            CalibrationState::Probing3 => "retracting",
            CalibrationState::CoordinateReset => "resetting coordinates",
            CalibrationState::Ready => "ready",
            CalibrationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Typed notification from the motion device.
#[derive(Debug, Clone, PartialEq)]
pub enum CutterEvent {
    /// Connection announcement or firmware welcome.
    Banner,
    /// The firmware asks for homing or unlocking.
    Unlocked,
    StatusUpdate {
        state: String,
        machine: Position,
        work: Position,
    },
    /// Successful probe contact at machine Z.
    ProbeResult { z: f64 },
    /// The device acknowledged one command.
    CommandCompleted,
    /// A started stream has drained.
    StreamComplete { success: bool },
    ConsoleError { text: String },
}
