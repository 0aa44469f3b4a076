use thiserror::Error;

/// Error type for decompression and gas computations.
#[derive(Error, Debug, Clone, PartialEq, uniffi::Error)]
pub enum DecoError {
    #[error("O2 fraction {fraction} is outside (0, 1]")]
    InvalidO2Fraction { fraction: f64 },

    #[error("gas fractions must each be within [0, 1] and sum to a positive total")]
    InvalidGasMix,

    #[error("gradient factor {value} is outside (0, 1]")]
    InvalidGradientFactor { value: f64 },

    #[error("gradient factor low ({low}) is greater than high ({high})")]
    GradientFactorOrder { low: f64, high: f64 },
}

/// Error type for device configuration and configuration screen inputs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("gas percent {0} is outside [1, 100)")]
    GasPercentOutOfRange(u8),

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error(transparent)]
    Deco(#[from] DecoError),

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error type for dive log persistence.
#[derive(Error, Debug)]
pub enum DiveLogError {
    #[error("dive log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("dive log is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid dive time {0:?}, expected MMM:SS")]
    DiveTime(String),
}

/// Error type for the hardware sensor bus.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("sensor bus failed to initialize: {0}")]
    Init(String),

    #[error("sensor read failed: {0}")]
    Read(String),

    #[error("calibration collected no samples")]
    NoCalibrationSamples,
}

/// Error type for starting and stopping the worker loops.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("{0} is already running")]
    AlreadyRunning(&'static str),

    #[error("{0} is being stopped by another caller")]
    Stopping(&'static str),

    #[error("{0} cannot start: sensor bus unavailable")]
    BusUnavailable(&'static str),

    #[error("{0} worker panicked before it could be joined")]
    JoinFailed(&'static str),

    #[error("failed to spawn {name} worker: {reason}")]
    Spawn { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecoError::InvalidO2Fraction { fraction: 1.5 };
        assert_eq!(err.to_string(), "O2 fraction 1.5 is outside (0, 1]");

        let err = ConfigError::GasPercentOutOfRange(100);
        assert_eq!(err.to_string(), "gas percent 100 is outside [1, 100)");

        let err = LifecycleError::AlreadyRunning("sensor acquisition");
        assert_eq!(err.to_string(), "sensor acquisition is already running");

        let err = DiveLogError::DiveTime("1:2:3".to_string());
        assert_eq!(err.to_string(), "invalid dive time \"1:2:3\", expected MMM:SS");

        let err = SensorError::Read("i2c nack".to_string());
        assert_eq!(err.to_string(), "sensor read failed: i2c nack");
    }

    #[test]
    fn test_deco_error_converts_into_config_error() {
        let err: ConfigError = DecoError::InvalidGradientFactor { value: 0.0 }.into();
        assert_eq!(err.to_string(), "gradient factor 0 is outside (0, 1]");
    }
}
