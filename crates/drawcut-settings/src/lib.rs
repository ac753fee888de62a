//! DrawCut Settings Crate
//!
//! Loads, validates and saves the machine, material and output settings the
//! rest of DrawCut is configured from.

pub mod config;
pub mod error;

pub use config::{default_config_path, Config, OutputSettings, CONFIG_FILE_NAME};
pub use error::{SettingsError, SettingsResult};
