//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! celestium-config.toml file. Every section is optional; anything missing
//! takes its default, so a file holding only a `[location]` block is valid.
//!
//! ```toml
//! [location]
//! latitude = 51.4769
//! longitude = 0.0
//!
//! [rotation]
//! mode = "TRUE_SOLAR"
//!
//! [forecast]
//! max_attempts = 5
//! planets = ["Mars", "Jupiter"]
//! ```

use crate::forecast::ForecastSettings;
use crate::{GeoPosition, RotationMode};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "celestium-config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config IO: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialization: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration loaded from celestium-config.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub location: LocationConfig,
    pub rotation: RotationConfig,
    /// Forecaster constants
    pub forecast: ForecastSettings,
    /// Lane cadences
    pub schedule: ScheduleConfig,
}

/// Fixed observer position and acquisition timeout
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Degrees north; the location is used only when both coordinates are set
    pub latitude: Option<f64>,
    /// Degrees east
    pub longitude: Option<f64>,
    /// Seconds to wait for a fix before giving up
    pub timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            latitude: None,
            longitude: None,
            timeout_secs: 15,
        }
    }
}

impl LocationConfig {
    /// Configured position, if both coordinates are present and valid.
    pub fn position(&self) -> Option<GeoPosition> {
        GeoPosition::new(self.latitude?, self.longitude?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Convention at startup
    pub mode: RotationMode,
}

/// Polling cadences of the scheduler lanes
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub solar_interval_ms: u64,
    pub lunar_interval_ms: u64,
    /// Target frame period for the rotation path (16 ms ≈ 60 Hz)
    pub frame_interval_ms: u64,
    pub forecast_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            solar_interval_ms: 1_000,
            lunar_interval_ms: 60_000,
            frame_interval_ms: 16,
            forecast_interval_secs: 3_600,
        }
    }
}

impl Config {
    /// Load configuration from celestium-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::try_load_from_path(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{}: {}; using default configuration", path.display(), e);
                Self::default()
            }
        }
    }

    /// Strict variant of [`Config::load_from_path`].
    pub fn try_load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save current configuration to celestium-config.toml
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(CONFIG_FILE)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}
