//! Device configuration.
//!
//! A single [`DeviceConfig`] is built at startup and handed to every
//! component. Durations are stored in milliseconds so the JSON form stays
//! flat and human-editable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buhlmann::{DecoParameters, GradientFactors};
use crate::error::ConfigError;

/// Button pin order: Back, Up, Down, Enter.
pub const DEFAULT_BUTTON_PINS: [u8; 4] = [5, 6, 13, 26];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub log_path: PathBuf,
    pub sensor_period_ms: u64,
    pub render_period_ms: u64,
    pub input_poll_ms: u64,
    pub debounce_ms: u64,
    pub calibration_duration_ms: u64,
    pub calibration_interval_ms: u64,
    pub button_pins: [u8; 4],
    pub gf_low: f64,
    pub gf_high: f64,
    pub stop_interval_m: f64,
    pub ppo2_max: f64,
    /// Added to the sensor depth before flooring at 0.
    pub depth_offset_m: f64,
    pub deco_refresh_ms: u64,
    /// Offset of the on-screen clock from UTC.
    pub utc_offset_hours: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("mesures.json"),
            sensor_period_ms: 200,
            render_period_ms: 200,
            input_poll_ms: 100,
            debounce_ms: 300,
            calibration_duration_ms: 10_000,
            calibration_interval_ms: 50,
            button_pins: DEFAULT_BUTTON_PINS,
            gf_low: 0.30,
            gf_high: 0.85,
            stop_interval_m: 3.0,
            ppo2_max: 1.4,
            depth_offset_m: 0.0,
            deco_refresh_ms: 1_000,
            utc_offset_hours: 2,
        }
    }
}

impl DeviceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.deco_parameters()?;
        let periods = [
            ("sensor_period_ms", self.sensor_period_ms),
            ("render_period_ms", self.render_period_ms),
            ("input_poll_ms", self.input_poll_ms),
            ("calibration_interval_ms", self.calibration_interval_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(ConfigError::InvalidSetting {
                    name,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if !(self.ppo2_max > 0.0) {
            return Err(ConfigError::InvalidSetting {
                name: "ppo2_max",
                reason: format!("{} is not a positive pressure", self.ppo2_max),
            });
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::InvalidSetting {
                name: "utc_offset_hours",
                reason: format!("{} is not a valid UTC offset", self.utc_offset_hours),
            });
        }
        Ok(())
    }

    pub fn deco_parameters(&self) -> Result<DecoParameters, ConfigError> {
        if !(self.stop_interval_m > 0.0) {
            return Err(ConfigError::InvalidSetting {
                name: "stop_interval_m",
                reason: format!("{} is not a positive interval", self.stop_interval_m),
            });
        }
        Ok(DecoParameters {
            gradient_factors: GradientFactors::new(self.gf_low, self.gf_high)?,
            stop_interval_m: self.stop_interval_m,
        })
    }

    pub fn sensor_period(&self) -> Duration {
        Duration::from_millis(self.sensor_period_ms)
    }

    pub fn render_period(&self) -> Duration {
        Duration::from_millis(self.render_period_ms)
    }

    pub fn input_poll(&self) -> Duration {
        Duration::from_millis(self.input_poll_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn calibration_duration(&self) -> Duration {
        Duration::from_millis(self.calibration_duration_ms)
    }

    pub fn calibration_interval(&self) -> Duration {
        Duration::from_millis(self.calibration_interval_ms)
    }

    pub fn deco_refresh(&self) -> Duration {
        Duration::from_millis(self.deco_refresh_ms)
    }
}
