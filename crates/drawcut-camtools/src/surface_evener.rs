//! Surface evener.
//!
//! Levels the top of the stock before cutting: a serpentine raster over the
//! whole material, one layer per depth pass, with rows spaced by a share of
//! the tool diameter.

use drawcut_core::{pass_depths, MachiningParameters, MaterialDimensions, MotionCommand, MotionProgram};
use serde::{Deserialize, Serialize};

use crate::error::{CamToolError, CamToolResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfacingParameters {
    /// Total material removed from the top of the stock, in mm.
    pub depth: f64,
    /// Distance between raster rows as a percentage of the tool diameter.
    pub stepover_percent: f64,
}

impl Default for SurfacingParameters {
    fn default() -> Self {
        Self {
            depth: 0.5,
            stepover_percent: 40.0,
        }
    }
}

/// Levels the top of the stock with a serpentine raster.
pub struct SurfaceEvener {
    params: SurfacingParameters,
}

impl SurfaceEvener {
    pub fn new(params: SurfacingParameters) -> Self {
        Self { params }
    }

    pub fn generate(
        &self,
        material: &MaterialDimensions,
        machining: &MachiningParameters,
    ) -> CamToolResult<MotionProgram> {
        machining
            .validate()
            .map_err(CamToolError::InvalidParameters)?;
        let p = &self.params;
        if !p.depth.is_finite() || p.depth <= 0.0 {
            return Err(CamToolError::InvalidParameters(format!(
                "surfacing depth must be positive, got {}",
                p.depth
            )));
        }
        if !(p.stepover_percent > 0.0 && p.stepover_percent <= 100.0) {
            return Err(CamToolError::InvalidParameters(format!(
                "stepover must be within (0, 100] percent, got {}",
                p.stepover_percent
            )));
        }
        if material.size_x <= 0.0 || material.size_y <= 0.0 {
            return Err(CamToolError::InvalidParameters(format!(
                "material size must be positive, got {} x {}",
                material.size_x, material.size_y
            )));
        }

        let mut program = MotionProgram::new();

        // Header
        program.push(MotionCommand::Comment("Surface evener".to_string()));
        program.push(MotionCommand::Comment(format!(
            "Stock: {:.1} x {:.1} mm, depth {:.2} mm",
            material.size_x, material.size_y, p.depth
        )));

        program.push(MotionCommand::Metric);
        program.push(MotionCommand::Absolute);
        program.push(MotionCommand::XyPlane);
        program.push(MotionCommand::rapid_z(machining.safe_z));
        program.push(MotionCommand::SpindleOn(machining.spindle_rpm));

        let step_dist = machining.tool_diameter * (p.stepover_percent / 100.0);

        for depth in pass_depths(p.depth, machining.depth_of_cut) {
            program.push(MotionCommand::rapid_z(machining.safe_z));
            program.push(MotionCommand::rapid_xy(0.0, 0.0));
            program.push(MotionCommand::Plunge {
                z: depth,
                feed: machining.plunge_feed_rate,
            });

            let mut current_y = 0.0;
            let mut going_right = true;
            loop {
                let target_x = if going_right { material.size_x } else { 0.0 };
                program.push(MotionCommand::Linear {
                    x: target_x,
                    y: current_y,
                    feed: machining.feed_rate,
                });

                if current_y >= material.size_y {
                    break;
                }
                current_y = (current_y + step_dist).min(material.size_y);
                program.push(MotionCommand::Linear {
                    x: target_x,
                    y: current_y,
                    feed: machining.feed_rate,
                });
                going_right = !going_right;
            }
        }

        program.push(MotionCommand::rapid_z(machining.safe_z));
        program.push(MotionCommand::SpindleStop);
        program.push(MotionCommand::rapid_xy(0.0, 0.0));

        tracing::info!("Generated surface evener program: {} lines", program.len());
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_covers_stock() {
        let material = MaterialDimensions {
            size_x: 20.0,
            size_y: 10.0,
            thickness: 6.0,
        };
        let machining = MachiningParameters {
            tool_diameter: 4.0,
            depth_of_cut: 1.0,
            ..MachiningParameters::default()
        };
        let program = SurfaceEvener::new(SurfacingParameters {
            depth: 0.5,
            stepover_percent: 50.0,
        })
        .generate(&material, &machining)
        .unwrap();
        let lines = program.lines();

        assert_eq!(lines.iter().filter(|l| l.starts_with("G1 Z")).count(), 1);
        // Rows at y = 0, 2, 4, 6, 8, 10.
        let rows: Vec<&String> = lines
            .iter()
            .filter(|l| l.starts_with("G1 X20.000") || l.starts_with("G1 X0.000"))
            .collect();
        assert_eq!(rows.len(), 11);
        assert!(lines.iter().any(|l| l.starts_with("G1 X") && l.contains("Y10.000")));
        assert!(!lines.iter().any(|l| l.contains("Y12.000")));
    }

    #[test]
    fn test_passes_follow_depth_of_cut() {
        let machining = MachiningParameters {
            depth_of_cut: 0.4,
            ..MachiningParameters::default()
        };
        let program = SurfaceEvener::new(SurfacingParameters {
            depth: 1.0,
            stepover_percent: 80.0,
        })
        .generate(&MaterialDimensions::default(), &machining)
        .unwrap();
        let plunges: Vec<String> = program
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("G1 Z"))
            .collect();
        assert_eq!(
            plunges,
            vec!["G1 Z-0.400 F150.0", "G1 Z-0.800 F150.0", "G1 Z-1.000 F150.0"]
        );
    }

    #[test]
    fn test_rejects_bad_stepover() {
        let err = SurfaceEvener::new(SurfacingParameters {
            depth: 0.5,
            stepover_percent: 0.0,
        })
        .generate(&MaterialDimensions::default(), &MachiningParameters::default())
        .unwrap_err();
        assert!(matches!(err, CamToolError::InvalidParameters(_)));
    }
}
