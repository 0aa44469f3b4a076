use chrono::{DateTime, Utc};

use crate::error::{ConfigError, DecoError};

/// Breathing gas as inert/oxygen fractions summing to 1.
#[derive(Clone, Copy, Debug, PartialEq, uniffi::Record)]
pub struct GasMix {
    pub o2: f64,
    pub n2: f64,
    pub he: f64,
}

impl GasMix {
    pub const AIR: GasMix = GasMix {
        o2: 0.21,
        n2: 0.79,
        he: 0.0,
    };

    /// Build a mix from O2 and He fractions, the remainder being N2.
    pub fn new(o2: f64, he: f64) -> Result<Self, DecoError> {
        if !(o2 > 0.0 && o2 <= 1.0) {
            return Err(DecoError::InvalidO2Fraction { fraction: o2 });
        }
        if !(0.0..=1.0).contains(&he) || o2 + he > 1.0 + 1e-9 {
            return Err(DecoError::InvalidGasMix);
        }
        Ok(Self {
            o2,
            n2: (1.0 - o2 - he).max(0.0),
            he,
        })
    }

    /// Build a mix from three fractions, normalizing them to sum to 1.
    pub fn from_fractions(o2: f64, n2: f64, he: f64) -> Result<Self, DecoError> {
        let parts = [o2, n2, he];
        if parts.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return Err(DecoError::InvalidGasMix);
        }
        let total = o2 + n2 + he;
        if total <= 0.0 {
            return Err(DecoError::InvalidGasMix);
        }
        let mix = Self {
            o2: o2 / total,
            n2: n2 / total,
            he: he / total,
        };
        if mix.o2 <= 0.0 {
            return Err(DecoError::InvalidO2Fraction { fraction: mix.o2 });
        }
        Ok(mix)
    }

    /// Nitrox mix from an O2 percentage as selected on the configuration screen.
    pub fn nitrox(percent: u8) -> Result<Self, ConfigError> {
        if percent == 0 || percent >= 100 {
            return Err(ConfigError::GasPercentOutOfRange(percent));
        }
        Ok(Self::new(f64::from(percent) / 100.0, 0.0)?)
    }
}

/// One point of a dive profile, time in seconds from any fixed origin.
#[derive(Clone, Copy, Debug, PartialEq, uniffi::Record)]
pub struct ProfilePoint {
    pub t_sec: f64,
    pub depth_m: f64,
}

/// Compass heading, undefined until the compass has been calibrated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Heading {
    Degrees(f64),
    Uncalibrated,
}

impl Heading {
    /// Sentinel written to the dive log for an uncalibrated compass.
    pub const UNCALIBRATED_SENTINEL: f64 = -1.0;

    pub fn as_logged(&self) -> f64 {
        match self {
            Heading::Degrees(deg) => *deg,
            Heading::Uncalibrated => Self::UNCALIBRATED_SENTINEL,
        }
    }

    pub fn from_logged(value: f64) -> Self {
        if value < 0.0 || !value.is_finite() {
            Heading::Uncalibrated
        } else {
            Heading::Degrees(value)
        }
    }
}

/// Raw magnetometer vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawVector {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// One read of the pressure/temperature sensor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthReading {
    pub temperature_c: f64,
    pub pressure_mbar: f64,
    pub depth_m: f64,
}

/// Hard-iron offsets of the two horizontal magnetometer axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompassCalibration {
    pub x_offset: f64,
    pub y_offset: f64,
}

impl CompassCalibration {
    /// Offsets are the midpoints of the observed axis ranges.
    pub fn from_extents(x_min: i16, x_max: i16, y_min: i16, y_max: i16) -> Self {
        Self {
            x_offset: (f64::from(x_max) + f64::from(x_min)) / 2.0,
            y_offset: (f64::from(y_max) + f64::from(y_min)) / 2.0,
        }
    }

    /// Heading in degrees within [0, 360).
    pub fn heading(&self, raw: RawVector) -> Heading {
        let x = f64::from(raw.x) - self.x_offset;
        let y = f64::from(raw.y) - self.y_offset;
        let mut deg = y.atan2(x).to_degrees();
        if deg < 0.0 {
            deg += 360.0;
        }
        Heading::Degrees(deg)
    }
}

/// Latest acquisition result, published as a whole.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorSample {
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub pressure_mbar: f64,
    pub depth_m: f64,
    pub heading: Heading,
}

impl SensorSample {
    pub fn new(timestamp: DateTime<Utc>, reading: DepthReading, heading: Heading) -> Self {
        Self {
            timestamp,
            temperature_c: reading.temperature_c,
            pressure_mbar: reading.pressure_mbar,
            depth_m: reading.depth_m.max(0.0),
            heading,
        }
    }
}

/// State of a dive in progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiveSession {
    pub dive_start: DateTime<Utc>,
    pub gas: GasMix,
}

impl DiveSession {
    pub fn new(dive_start: DateTime<Utc>, gas: GasMix) -> Self {
        Self { dive_start, gas }
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.dive_start).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_mix_new() {
        let mix = GasMix::new(0.32, 0.0).unwrap();
        assert!((mix.n2 - 0.68).abs() < 1e-12);
        assert!(GasMix::new(0.0, 0.0).is_err());
        assert!(GasMix::new(1.2, 0.0).is_err());
        assert_eq!(GasMix::new(0.5, 0.6), Err(DecoError::InvalidGasMix));
    }

    #[test]
    fn test_gas_mix_normalizes_fractions() {
        let mix = GasMix::from_fractions(21.0, 79.0, 0.0).unwrap();
        assert!((mix.o2 - 0.21).abs() < 1e-12);
        assert!((mix.o2 + mix.n2 + mix.he - 1.0).abs() < 1e-12);
        assert!(GasMix::from_fractions(0.0, 1.0, 0.0).is_err());
        assert!(GasMix::from_fractions(0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_nitrox_percent_range() {
        assert!((GasMix::nitrox(32).unwrap().o2 - 0.32).abs() < 1e-12);
        assert!(matches!(
            GasMix::nitrox(100),
            Err(ConfigError::GasPercentOutOfRange(100))
        ));
        assert!(GasMix::nitrox(0).is_err());
    }

    #[test]
    fn test_heading_sentinel() {
        assert_eq!(Heading::Uncalibrated.as_logged(), -1.0);
        assert_eq!(Heading::from_logged(-1.0), Heading::Uncalibrated);
        assert_eq!(Heading::from_logged(90.0), Heading::Degrees(90.0));
    }

    #[test]
    fn test_calibrated_heading() {
        let cal = CompassCalibration::from_extents(-100, 300, -200, 200);
        assert_eq!(cal.x_offset, 100.0);
        assert_eq!(cal.y_offset, 0.0);

        // Pointing along +y after removing the offset.
        match cal.heading(RawVector { x: 100, y: 50, z: 0 }) {
            Heading::Degrees(deg) => assert!((deg - 90.0).abs() < 1e-9),
            Heading::Uncalibrated => panic!("calibrated compass returned no heading"),
        }
        // Pointing along -y wraps into [0, 360).
        match cal.heading(RawVector { x: 100, y: -50, z: 0 }) {
            Heading::Degrees(deg) => assert!((deg - 270.0).abs() < 1e-9),
            Heading::Uncalibrated => panic!("calibrated compass returned no heading"),
        }
    }

    #[test]
    fn test_sample_depth_floored() {
        let reading = DepthReading {
            temperature_c: 18.0,
            pressure_mbar: 1000.0,
            depth_m: -0.4,
        };
        let sample = SensorSample::new(Utc::now(), reading, Heading::Uncalibrated);
        assert_eq!(sample.depth_m, 0.0);
    }
}
