//! Machine and work coordinates reported by the controller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A three-axis coordinate in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl FromStr for Position {
    type Err = String;

    /// Parses the controller's `x,y,z` triple.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid coordinate '{}': {}", s, e))?;
        match values.as_slice() {
            [x, y, z] => Ok(Position::new(*x, *y, *z)),
            _ => Err(format!("expected 3 axes in '{}'", s)),
        }
    }
}
