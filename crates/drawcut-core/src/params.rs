//! Machining, material and calibration parameter values.
//!
//! These are plain values injected into the outliner, the program generators
//! and the cutter controller at construction or per call. They are never
//! mutated by the components that receive them.

use serde::{Deserialize, Serialize};

/// Floating point slack when turning a depth ratio into a pass count.
const PASS_EPSILON: f64 = 1e-9;

/// Spindle, feed and depth settings for one machining job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachiningParameters {
    /// Spindle speed in RPM.
    pub spindle_rpm: u32,
    /// Cutting feed in mm/min.
    pub feed_rate: f64,
    /// Z-only descent feed in mm/min.
    pub plunge_feed_rate: f64,
    /// Depth removed per pass in mm.
    pub depth_of_cut: f64,
    /// Final depth below the stock surface in mm.
    pub target_depth: f64,
    /// Cutter diameter in mm.
    pub tool_diameter: f64,
    /// Width of the drawn line in mm.
    pub motif_width: f64,
    /// Clearance height for rapid moves in mm.
    pub safe_z: f64,
}

impl Default for MachiningParameters {
    fn default() -> Self {
        Self {
            spindle_rpm: 12000,
            feed_rate: 600.0,
            plunge_feed_rate: 150.0,
            depth_of_cut: 1.0,
            target_depth: 6.0,
            tool_diameter: 3.175,
            motif_width: 4.0,
            safe_z: 5.0,
        }
    }
}

impl MachiningParameters {
    /// Number of depth passes needed to reach `target_depth`.
    pub fn pass_count(&self) -> usize {
        pass_count(self.target_depth, self.depth_of_cut)
    }

    /// Z level of every pass, from the shallowest to `-target_depth`.
    pub fn pass_depths(&self) -> Vec<f64> {
        pass_depths(self.target_depth, self.depth_of_cut)
    }

    /// Checks that every value can drive a machine.
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("feed_rate", self.feed_rate),
            ("plunge_feed_rate", self.plunge_feed_rate),
            ("depth_of_cut", self.depth_of_cut),
            ("target_depth", self.target_depth),
            ("tool_diameter", self.tool_diameter),
            ("motif_width", self.motif_width),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }
        if self.spindle_rpm == 0 {
            return Err("spindle_rpm must be positive".to_string());
        }
        if !self.safe_z.is_finite() || self.safe_z < 0.0 {
            return Err(format!("safe_z must not be negative, got {}", self.safe_z));
        }
        Ok(())
    }
}

/// Number of passes of at most `step` each needed to reach `total`.
pub fn pass_count(total: f64, step: f64) -> usize {
    if total <= 0.0 || step <= 0.0 {
        return 0;
    }
    ((total / step) - PASS_EPSILON).ceil().max(1.0) as usize
}

/// Negative Z level of each pass, the last one clamped to `-total`.
pub fn pass_depths(total: f64, step: f64) -> Vec<f64> {
    (1..=pass_count(total, step))
        .map(|pass| -(pass as f64 * step).min(total))
        .collect()
}

/// Stock dimensions in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDimensions {
    pub size_x: f64,
    pub size_y: f64,
    pub thickness: f64,
}

impl Default for MaterialDimensions {
    fn default() -> Self {
        Self {
            size_x: 120.0,
            size_y: 80.0,
            thickness: 6.35,
        }
    }
}

/// Probe geometry and work origin used by the calibration sequences.
///
/// All Z values are machine coordinates; the machine homes at Z 0 and
/// probes downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParameters {
    /// Height of the tool setter above the stock surface.
    pub probing_offset: f64,
    /// Lift above the first contact before the slow probe.
    pub retract_distance: f64,
    /// Dwell used to synchronise the planner, in seconds.
    pub settle_dwell: f64,
    /// X of the tool setter.
    pub sensor_x: f64,
    /// Z after moving over the tool setter.
    pub approach_z: f64,
    /// Z reached with a rapid before the fast probe.
    pub descend_z: f64,
    /// Fast probe travel limit.
    pub fast_probe_z: f64,
    pub fast_probe_feed: f64,
    /// Slow probe travel limit.
    pub fine_probe_z: f64,
    pub fine_probe_feed: f64,
    /// Z after leaving the tool setter.
    pub retract_z: f64,
    /// X clearance after leaving the tool setter.
    pub clearance_x: f64,
    /// Machine position of the work origin.
    pub work_origin_x: f64,
    pub work_origin_y: f64,
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self {
            probing_offset: 10.0,
            retract_distance: 5.0,
            settle_dwell: 0.005,
            sensor_x: -2.5,
            approach_z: -5.0,
            descend_z: -35.0,
            fast_probe_z: -105.0,
            fast_probe_feed: 800.0,
            fine_probe_z: -182.675,
            fine_probe_feed: 200.0,
            retract_z: -5.0,
            clearance_x: -5.0,
            work_origin_x: 220.0,
            work_origin_y: 205.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_count_exact_multiple() {
        assert_eq!(pass_count(6.0, 2.0), 3);
        assert_eq!(pass_depths(6.0, 2.0), vec![-2.0, -4.0, -6.0]);
    }

    #[test]
    fn test_pass_count_remainder_clamps_last_pass() {
        assert_eq!(pass_count(5.0, 2.0), 3);
        assert_eq!(pass_depths(5.0, 2.0), vec![-2.0, -4.0, -5.0]);
    }

    #[test]
    fn test_pass_count_float_noise() {
        assert_eq!(pass_count(0.3, 0.1), 3);
        assert_eq!(pass_count(0.9, 0.3), 3);
    }

    #[test]
    fn test_pass_count_shallow_and_invalid() {
        assert_eq!(pass_count(0.5, 2.0), 1);
        assert_eq!(pass_count(0.0, 1.0), 0);
        assert_eq!(pass_count(1.0, 0.0), 0);
    }

    #[test]
    fn test_default_parameters_validate() {
        assert!(MachiningParameters::default().validate().is_ok());

        let params = MachiningParameters {
            depth_of_cut: 0.0,
            ..Default::default()
        };
        assert!(params.validate().unwrap_err().contains("depth_of_cut"));
    }
}
