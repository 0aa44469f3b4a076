//! Display refresh loop and the telemetry it pushes into dive screens.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use log::{debug, warn};

use crate::buhlmann::{max_operating_depth, DecoParameters, DecoResult, DecompressionModel};
use crate::config::DeviceConfig;
use crate::dive_time::format_dive_time;
use crate::divelog::DiveLog;
use crate::error::{ConfigError, LifecycleError};
use crate::models::{DiveSession, ProfilePoint};
use crate::screen::{DiveTelemetry, DrawField, Screen};
use crate::sensors::SnapshotCell;
use crate::task::{lock, Worker, WorkerState};

const WORKER_NAME: &str = "display render";

/// Pixel-level drawing of one frame.
pub trait Renderer: Send {
    fn draw(&mut self, fields: &[DrawField]);
}

/// Session in progress, shared between the coordinator and the render loop.
pub type SessionCell = Arc<Mutex<Option<DiveSession>>>;

/// Vertical speed in m/min from the last two profile points, positive when
/// descending.
pub fn vertical_speed(profile: &[ProfilePoint]) -> Option<f64> {
    match profile {
        [.., previous, last] if last.t_sec > previous.t_sec => {
            Some((last.depth_m - previous.depth_m) / (last.t_sec - previous.t_sec) * 60.0)
        }
        _ => None,
    }
}

struct DecoCache {
    dive_start: DateTime<Utc>,
    computed_at: Instant,
    deco: Option<DecoResult>,
    vertical_speed: Option<f64>,
}

/// Assembles [`DiveTelemetry`] from the sensor snapshot and the dive log.
///
/// The decompression state is recomputed from the log at most once per
/// refresh interval since it replays the whole dive.
struct TelemetrySource {
    snapshot: SnapshotCell,
    log: DiveLog,
    session: SessionCell,
    params: DecoParameters,
    ppo2_max: f64,
    clock_offset: FixedOffset,
    deco_refresh: Duration,
    cache: Mutex<Option<DecoCache>>,
}

impl TelemetrySource {
    fn gather(&self, now: DateTime<Utc>) -> DiveTelemetry {
        let clock = now
            .with_timezone(&self.clock_offset)
            .format("%H:%M:%S")
            .to_string();
        let sample = self.snapshot.latest();
        let Some(session) = *lock(&self.session) else {
            return DiveTelemetry {
                clock,
                dive_time: format_dive_time(0),
                sample,
                ..DiveTelemetry::default()
            };
        };

        let mut cache = lock(&self.cache);
        let stale = match &*cache {
            Some(c) => {
                c.dive_start != session.dive_start || c.computed_at.elapsed() >= self.deco_refresh
            }
            None => true,
        };
        if stale {
            let profile = self.log.profile_since(session.dive_start);
            let deco = DecompressionModel::new(session.gas, self.params).evaluate(&profile);
            debug!("deco refreshed over {} points: {deco:?}", profile.len());
            *cache = Some(DecoCache {
                dive_start: session.dive_start,
                computed_at: Instant::now(),
                deco,
                vertical_speed: vertical_speed(&profile),
            });
        }
        let (deco, speed) = cache
            .as_ref()
            .map(|c| (c.deco, c.vertical_speed))
            .unwrap_or_default();

        DiveTelemetry {
            clock,
            dive_time: format_dive_time(session.elapsed_secs(now)),
            sample,
            vertical_speed_m_min: speed,
            deco,
            mod_m: max_operating_depth(session.gas.o2, self.ppo2_max).ok(),
        }
    }
}

struct Shared<R> {
    renderer: Arc<Mutex<R>>,
    screen: Arc<Mutex<Screen>>,
    telemetry: Arc<TelemetrySource>,
}

impl<R> Clone for Shared<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            screen: Arc::clone(&self.screen),
            telemetry: Arc::clone(&self.telemetry),
        }
    }
}

impl<R: Renderer> Shared<R> {
    fn tick(&self) {
        let telemetry = self.telemetry.gather(Utc::now());
        let fields = {
            let screen = lock(&self.screen);
            screen.refresh(&telemetry);
            screen.render()
        };
        lock(&self.renderer).draw(&fields);
    }
}

/// Periodically draws the live screen.
pub struct RenderLoop<R> {
    worker: Worker,
    shared: Shared<R>,
    period: Duration,
}

impl<R: Renderer + 'static> RenderLoop<R> {
    pub fn new(
        renderer: R,
        screen: Arc<Mutex<Screen>>,
        snapshot: SnapshotCell,
        log: DiveLog,
        session: SessionCell,
        config: &DeviceConfig,
    ) -> Result<Self, ConfigError> {
        let clock_offset = FixedOffset::east_opt(config.utc_offset_hours * 3600)
            .unwrap_or_else(|| {
                warn!("utc offset {}h out of range, clock shows UTC", config.utc_offset_hours);
                Utc.fix()
            });
        let telemetry = TelemetrySource {
            snapshot,
            log,
            session,
            params: config.deco_parameters()?,
            ppo2_max: config.ppo2_max,
            clock_offset,
            deco_refresh: config.deco_refresh(),
            cache: Mutex::new(None),
        };
        Ok(Self {
            worker: Worker::new(WORKER_NAME),
            shared: Shared {
                renderer: Arc::new(Mutex::new(renderer)),
                screen,
                telemetry: Arc::new(telemetry),
            },
            period: config.render_period(),
        })
    }

    pub fn start(&self) -> Result<(), LifecycleError> {
        let shared = self.shared.clone();
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

    /// Draw one frame on the calling thread.
    pub fn render_once(&self) {
        self.shared.tick();
    }
}
