//! Configuration file handling.
//!
//! The configuration is one file, TOML by default or JSON when the file name
//! ends in `.json`, with one table per concern:
//! - `machining`, `material` and `calibration` values for the machine
//! - `surfacing` and `initials` for the program generators
//! - `connection` for the serial port
//! - `output` for where programs and shapes live

use std::path::{Path, PathBuf};

use drawcut_camtools::{CutProgramConfig, SurfacingParameters};
use drawcut_communication::GrblConfig;
use drawcut_core::{CalibrationParameters, MachiningParameters, MaterialDimensions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SettingsError, SettingsResult};

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Where generated programs and shape files are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Written before every cut is streamed.
    pub program_file: PathBuf,
    /// Written before every surfacing run is streamed.
    pub surfacing_file: PathBuf,
    /// Directory of `<id>.svg` files resolved from scanned codes.
    pub shapes_dir: PathBuf,
    /// JSON list of preset shapes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presets_file: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            program_file: PathBuf::from("output.nc"),
            surfacing_file: PathBuf::from("surfaceEvener.nc"),
            shapes_dir: PathBuf::from("shapes"),
            presets_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub machining: MachiningParameters,
    pub material: MaterialDimensions,
    pub calibration: CalibrationParameters,
    pub surfacing: SurfacingParameters,
    pub initials: CutProgramConfig,
    pub connection: GrblConfig,
    pub output: OutputSettings,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a config file.
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path)?;
        let config: Self = match format {
            Format::Toml => toml::from_str(&content)?,
            Format::Json => serde_json::from_str(&content)?,
        };
        config.validate()?;
        info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate and write the config, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let content = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> SettingsResult<()> {
        self.machining
            .validate()
            .map_err(|reason| SettingsError::invalid("machining", reason))?;

        let positive = [
            ("material.size_x", self.material.size_x),
            ("material.size_y", self.material.size_y),
            ("calibration.fast_probe_feed", self.calibration.fast_probe_feed),
            ("calibration.fine_probe_feed", self.calibration.fine_probe_feed),
            ("calibration.retract_distance", self.calibration.retract_distance),
            ("surfacing.depth", self.surfacing.depth),
            ("surfacing.stepover_percent", self.surfacing.stepover_percent),
            (
                "initials.flattening_tolerance",
                self.initials.flattening_tolerance,
            ),
            ("initials.initials_height", self.initials.initials_height),
            ("initials.initials_depth", self.initials.initials_depth),
        ];
        for (key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SettingsError::invalid(
                    key,
                    format!("must be positive, got {}", value),
                ));
            }
        }

        if self.surfacing.stepover_percent > 100.0 {
            return Err(SettingsError::invalid(
                "surfacing.stepover_percent",
                "must not exceed 100",
            ));
        }
        if !(self.initials.initials_fill > 0.0 && self.initials.initials_fill <= 1.0) {
            return Err(SettingsError::invalid(
                "initials.initials_fill",
                "must be within (0, 1]",
            ));
        }
        if self.connection.baud_rate == 0 {
            return Err(SettingsError::invalid(
                "connection.baud_rate",
                "must be positive",
            ));
        }
        if self.connection.poll_interval_ms == 0 {
            return Err(SettingsError::invalid(
                "connection.poll_interval_ms",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// `config.toml` in the platform config directory.
pub fn default_config_path() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("drawcut").join(CONFIG_FILE_NAME))
        .ok_or_else(|| {
            SettingsError::ConfigDirectory("no configuration directory on this platform".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.output.program_file, PathBuf::from("output.nc"));
        assert_eq!(config.connection.baud_rate, 115_200);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.machining.tool_diameter = 2.0;
        config.connection.port = "/dev/ttyUSB0".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.machining.tool_diameter, 2.0);
        assert_eq!(loaded.connection.port, "/dev/ttyUSB0");
        assert_eq!(loaded.calibration, config.calibration);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "material": { "size_x": 200.0 } }"#).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.material.size_x, 200.0);
        assert_eq!(loaded.material.size_y, MaterialDimensions::default().size_y);
        assert_eq!(loaded.machining, MachiningParameters::default());
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let mut config = Config::default();
        config.machining.depth_of_cut = 0.0;
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));

        let mut config = Config::default();
        config.material.size_y = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("material.size_y"));

        let mut config = Config::default();
        config.initials.flattening_tolerance = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.machining.feed_rate = -5.0;
        assert!(config.save_to_file(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_extension() {
        let err = Config::load_from_file(Path::new("settings.yaml")).unwrap_err();
        assert!(matches!(err, SettingsError::UnsupportedFormat(ref ext) if ext == "yaml"));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.output, OutputSettings::default());
    }
}
