//! Motion commands and programs.
//!
//! A [`MotionProgram`] is built once by a generator and then either streamed
//! to the motion device or written to a file. Both sinks receive the same
//! lines, rendered by [`MotionCommand::to_line`].

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// G10 addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffsetMode {
    /// `L2`: set the coordinate system origin to the given machine values.
    Absolute,
    /// `L20`: make the current position read as the given values.
    CurrentPosition,
}

impl OffsetMode {
    fn code(self) -> u8 {
        match self {
            OffsetMode::Absolute => 2,
            OffsetMode::CurrentPosition => 20,
        }
    }
}

/// One line of a motion program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionCommand {
    /// `; text`
    Comment(String),
    /// `G21`
    Metric,
    /// `G90`
    Absolute,
    /// `G17`
    XyPlane,
    /// `G54`
    SelectWorkCoordinates,
    /// `G92.1`
    ClearCoordinateOffset,
    /// `G49`
    CancelToolLengthOffset,
    /// `G10 L.. P.. X.. Y.. Z..`
    SetWorkOffset {
        mode: OffsetMode,
        system: u8,
        x: f64,
        y: f64,
        z: f64,
    },
    /// `G4 P..`, seconds.
    Dwell(f64),
    /// `M3 S..`
    SpindleOn(u32),
    /// `M5`
    SpindleStop,
    /// `G0` with any subset of axes.
    Rapid {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
    },
    /// `G1 X.. Y.. F..`
    Linear { x: f64, y: f64, feed: f64 },
    /// `G1 Z.. F..`, a Z-only descent.
    Plunge { z: f64, feed: f64 },
    /// `G38.2 Z.. F..`
    Probe { z: f64, feed: f64 },
}

impl MotionCommand {
    /// Rapid move in the XY plane.
    pub fn rapid_xy(x: f64, y: f64) -> Self {
        MotionCommand::Rapid {
            x: Some(x),
            y: Some(y),
            z: None,
        }
    }

    /// Rapid move along Z only.
    pub fn rapid_z(z: f64) -> Self {
        MotionCommand::Rapid {
            x: None,
            y: None,
            z: Some(z),
        }
    }

    /// Render the command as a controller line.
    pub fn to_line(&self) -> String {
        match self {
            MotionCommand::Comment(text) => format!("; {}", text),
            MotionCommand::Metric => "G21".to_string(),
            MotionCommand::Absolute => "G90".to_string(),
            MotionCommand::XyPlane => "G17".to_string(),
            MotionCommand::SelectWorkCoordinates => "G54".to_string(),
            MotionCommand::ClearCoordinateOffset => "G92.1".to_string(),
            MotionCommand::CancelToolLengthOffset => "G49".to_string(),
            MotionCommand::SetWorkOffset {
                mode,
                system,
                x,
                y,
                z,
            } => format!(
                "G10 L{} P{} X{:.3} Y{:.3} Z{:.3}",
                mode.code(),
                system,
                x,
                y,
                z
            ),
            MotionCommand::Dwell(seconds) => format!("G4 P{}", seconds),
            MotionCommand::SpindleOn(rpm) => format!("M3 S{}", rpm),
            MotionCommand::SpindleStop => "M5".to_string(),
            MotionCommand::Rapid { x, y, z } => {
                let mut line = String::from("G0");
                for (axis, value) in [('X', x), ('Y', y), ('Z', z)] {
                    if let Some(value) = value {
                        line.push_str(&format!(" {}{:.3}", axis, value));
                    }
                }
                line
            }
            MotionCommand::Linear { x, y, feed } => {
                format!("G1 X{:.3} Y{:.3} F{:.1}", x, y, feed)
            }
            MotionCommand::Plunge { z, feed } => format!("G1 Z{:.3} F{:.1}", z, feed),
            MotionCommand::Probe { z, feed } => format!("G38.2 Z{:.3} F{:.1}", z, feed),
        }
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// An ordered, finite sequence of motion commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionProgram {
    commands: Vec<MotionCommand>,
}

impl MotionProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: MotionCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[MotionCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every command rendered as a controller line.
    pub fn lines(&self) -> Vec<String> {
        self.commands.iter().map(MotionCommand::to_line).collect()
    }

    /// The program text, one command per line.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in self.lines() {
            text.push_str(&line);
            text.push('\n');
        }
        text
    }

    /// Write the program text to `path`, replacing any existing file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_text())?;
        tracing::info!("Wrote {} program lines to {}", self.len(), path.display());
        Ok(())
    }

    pub fn into_commands(self) -> Vec<MotionCommand> {
        self.commands
    }
}

impl From<Vec<MotionCommand>> for MotionProgram {
    fn from(commands: Vec<MotionCommand>) -> Self {
        Self { commands }
    }
}

impl Extend<MotionCommand> for MotionProgram {
    fn extend<T: IntoIterator<Item = MotionCommand>>(&mut self, iter: T) {
        self.commands.extend(iter);
    }
}

impl IntoIterator for MotionProgram {
    type Item = MotionCommand;
    type IntoIter = std::vec::IntoIter<MotionCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}
