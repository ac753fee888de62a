//! Calibration command sequences.

use drawcut_core::{CalibrationParameters, MotionCommand, OffsetMode};

/// Builds the command lists streamed during calibration.
#[derive(Debug, Clone, Default)]
pub struct CalibrationSequences {
    params: CalibrationParameters,
}

impl CalibrationSequences {
    pub fn new(params: CalibrationParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CalibrationParameters {
        &self.params
    }

    fn clear_g54() -> MotionCommand {
        MotionCommand::SetWorkOffset {
            mode: OffsetMode::Absolute,
            system: 1,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Reset the coordinate state and probe toward the sensor at the fast feed.
    pub fn probe1(&self) -> Vec<MotionCommand> {
        let p = &self.params;
        vec![
            MotionCommand::Dwell(p.settle_dwell),
            MotionCommand::SpindleStop,
            MotionCommand::ClearCoordinateOffset,
            MotionCommand::SelectWorkCoordinates,
            Self::clear_g54(),
            MotionCommand::Metric,
            MotionCommand::CancelToolLengthOffset,
            MotionCommand::Absolute,
            Self::clear_g54(),
            MotionCommand::Rapid {
                x: Some(p.sensor_x),
                y: None,
                z: Some(p.approach_z),
            },
            MotionCommand::rapid_z(p.descend_z),
            MotionCommand::Probe {
                z: p.fast_probe_z,
                feed: p.fast_probe_feed,
            },
            MotionCommand::Dwell(p.settle_dwell),
        ]
    }

    /// Back off to `start_z` and probe again at the fine feed.
    pub fn probe2(&self, start_z: f64) -> Vec<MotionCommand> {
        let p = &self.params;
        vec![
            MotionCommand::rapid_z(start_z),
            MotionCommand::Probe {
                z: p.fine_probe_z,
                feed: p.fine_probe_feed,
            },
            MotionCommand::Dwell(p.settle_dwell),
        ]
    }

    /// Retract and move clear of the sensor.
    pub fn probe3(&self) -> Vec<MotionCommand> {
        let p = &self.params;
        vec![
            MotionCommand::rapid_z(p.retract_z),
            MotionCommand::Rapid {
                x: Some(p.clearance_x),
                y: None,
                z: None,
            },
        ]
    }

    /// Make the current position the work origin, with Z compensated for the
    /// measured probe depth.
    pub fn coordinate_reset(&self, probe_depth: f64) -> Vec<MotionCommand> {
        let p = &self.params;
        vec![MotionCommand::SetWorkOffset {
            mode: OffsetMode::CurrentPosition,
            system: 0,
            x: p.work_origin_x,
            y: p.work_origin_y,
            z: p.probing_offset - probe_depth,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(commands: &[MotionCommand]) -> Vec<String> {
        commands.iter().map(MotionCommand::to_line).collect()
    }

    #[test]
    fn test_probe1_lines() {
        let seq = CalibrationSequences::default();
        assert_eq!(
            lines(&seq.probe1()),
            vec![
                "G4 P0.005",
                "M5",
                "G92.1",
                "G54",
                "G10 L2 P1 X0.000 Y0.000 Z0.000",
                "G21",
                "G49",
                "G90",
                "G10 L2 P1 X0.000 Y0.000 Z0.000",
                "G0 X-2.500 Z-5.000",
                "G0 Z-35.000",
                "G38.2 Z-105.000 F800.0",
                "G4 P0.005",
            ]
        );
    }

    #[test]
    fn test_probe2_starts_above_contact() {
        let seq = CalibrationSequences::default();
        assert_eq!(
            lines(&seq.probe2(-79.405)),
            vec!["G0 Z-79.405", "G38.2 Z-182.675 F200.0", "G4 P0.005"]
        );
    }

    #[test]
    fn test_probe3_and_reset() {
        let seq = CalibrationSequences::default();
        assert_eq!(lines(&seq.probe3()), vec!["G0 Z-5.000", "G0 X-5.000"]);
        assert_eq!(
            lines(&seq.coordinate_reset(-84.405)),
            vec!["G10 L20 P0 X220.000 Y205.000 Z94.405"]
        );
    }
}
