//! Sensor acquisition loop and compass calibration.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::divelog::DiveLog;
use crate::error::{LifecycleError, SensorError};
use crate::models::{CompassCalibration, DepthReading, Heading, RawVector, SensorSample};
use crate::task::{lock, Worker, WorkerState};

const WORKER_NAME: &str = "sensor acquisition";

/// Hardware access to the depth/temperature sensor and the magnetometer.
pub trait SensorBus: Send {
    fn read_depth_sensor(&mut self) -> Result<DepthReading, SensorError>;
    fn read_heading_raw(&mut self) -> Result<RawVector, SensorError>;
}

/// Most recent sample, replaced as a whole by the acquisition loop.
#[derive(Clone, Debug, Default)]
pub struct SnapshotCell(Arc<Mutex<Option<SensorSample>>>);

impl SnapshotCell {
    pub fn publish(&self, sample: SensorSample) {
        *lock(&self.0) = Some(sample);
    }

    pub fn latest(&self) -> Option<SensorSample> {
        *lock(&self.0)
    }

    pub fn clear(&self) {
        *lock(&self.0) = None;
    }
}

struct Shared<B> {
    bus: Arc<Mutex<B>>,
    calibration: Arc<Mutex<Option<CompassCalibration>>>,
    snapshot: SnapshotCell,
    log: DiveLog,
    depth_offset_m: f64,
}

// Not derived: `B` itself need not be `Clone`.
impl<B> Clone for Shared<B> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
            calibration: Arc::clone(&self.calibration),
            snapshot: self.snapshot.clone(),
            log: self.log.clone(),
            depth_offset_m: self.depth_offset_m,
        }
    }
}

impl<B: SensorBus> Shared<B> {
    /// Read every sensor once.
    fn acquire(&self) -> Result<SensorSample, SensorError> {
        let calibration = *lock(&self.calibration);
        let mut bus = lock(&self.bus);
        let heading = match calibration {
            Some(cal) => cal.heading(bus.read_heading_raw()?),
            None => Heading::Uncalibrated,
        };
        let mut reading = bus.read_depth_sensor()?;
        reading.depth_m += self.depth_offset_m;
        Ok(SensorSample::new(Utc::now(), reading, heading))
    }

    fn tick(&self) {
        match self.acquire() {
            Ok(sample) => {
                self.snapshot.publish(sample);
                if let Err(e) = self.log.append_sample(&sample) {
                    warn!("sample not logged, acquisition continues: {e}");
                }
            }
            Err(e) => debug!("skipping acquisition tick: {e}"),
        }
    }
}

/// Periodic sensor reader publishing a [`SnapshotCell`] and feeding the dive log.
pub struct SensorAcquisition<B> {
    worker: Worker,
    shared: Option<Shared<B>>,
    init_error: Option<SensorError>,
    calibration: Arc<Mutex<Option<CompassCalibration>>>,
    snapshot: SnapshotCell,
    period: Duration,
    calibration_duration: Duration,
    calibration_interval: Duration,
}

impl<B: SensorBus + 'static> SensorAcquisition<B> {
    /// `bus` is the outcome of initializing the hardware; a failed bus
    /// makes every later `start` fail.
    pub fn new(bus: Result<B, SensorError>, log: DiveLog, config: &DeviceConfig) -> Self {
        let calibration = Arc::new(Mutex::new(None));
        let snapshot = SnapshotCell::default();
        let (shared, init_error) = match bus {
            Ok(bus) => (
                Some(Shared {
                    bus: Arc::new(Mutex::new(bus)),
                    calibration: Arc::clone(&calibration),
                    snapshot: snapshot.clone(),
                    log,
                    depth_offset_m: config.depth_offset_m,
                }),
                None,
            ),
            Err(e) => {
                warn!("sensor bus unavailable: {e}");
                (None, Some(e))
            }
        };
        Self {
            worker: Worker::new(WORKER_NAME),
            shared,
            init_error,
            calibration,
            snapshot,
            period: config.sensor_period(),
            calibration_duration: config.calibration_duration(),
            calibration_interval: config.calibration_interval(),
        }
    }

    pub fn start(&self) -> Result<(), LifecycleError> {
        let shared = self
            .shared
            .clone()
            .ok_or(LifecycleError::BusUnavailable(WORKER_NAME))?;
        let period = self.period;
        self.worker
            .start(move |signal| signal.every(period, || shared.tick()))
    }

    pub fn stop(&self) -> Result<(), LifecycleError> {
        self.worker.stop()
    }

    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }

    pub fn init_error(&self) -> Option<&SensorError> {
        self.init_error.as_ref()
    }

    pub fn snapshot(&self) -> SnapshotCell {
        self.snapshot.clone()
    }

    pub fn calibration(&self) -> Option<CompassCalibration> {
        *lock(&self.calibration)
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration().is_some()
    }

    /// Sample the magnetometer for the configured duration and derive the
    /// horizontal offsets from the axis midpoints.
    ///
    /// Blocks the caller. Callers must not run it while acquisition is
    /// running.
    pub fn calibrate(&self) -> Result<CompassCalibration, SensorError> {
        let shared = self.shared.as_ref().ok_or_else(|| {
            SensorError::Init("cannot calibrate without a sensor bus".to_string())
        })?;
        info!("compass calibration started");

        let mut extents: Option<(i16, i16, i16, i16)> = None;
        let started = Instant::now();
        while started.elapsed() < self.calibration_duration {
            match lock(&shared.bus).read_heading_raw() {
                Ok(raw) => {
                    let (x_min, x_max, y_min, y_max) =
                        extents.unwrap_or((raw.x, raw.x, raw.y, raw.y));
                    extents = Some((
                        x_min.min(raw.x),
                        x_max.max(raw.x),
                        y_min.min(raw.y),
                        y_max.max(raw.y),
                    ));
                }
                Err(e) => debug!("calibration read skipped: {e}"),
            }
            thread::sleep(self.calibration_interval);
        }

        let (x_min, x_max, y_min, y_max) = extents.ok_or(SensorError::NoCalibrationSamples)?;
        let calibration = CompassCalibration::from_extents(x_min, x_max, y_min, y_max);
        *lock(&self.calibration) = Some(calibration);
        info!(
            "compass calibrated: x_offset={:.1} y_offset={:.1}",
            calibration.x_offset, calibration.y_offset
        );
        Ok(calibration)
    }
}
