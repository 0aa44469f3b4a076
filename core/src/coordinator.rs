//! Cross-loop lifecycle: entering and leaving a dive, switching screens.
//!
//! Every change of the live screen follows the same order: stop the render
//! loop, swap the screen, start the render loop again.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{error, info, warn};

use crate::config::DeviceConfig;
use crate::divelog::{DiveEndRecord, DiveLog};
use crate::error::{ConfigError, LifecycleError, SensorError};
use crate::input::{InputBus, InputDispatchLoop};
use crate::models::{DiveSession, GasMix};
use crate::navigation::{Button, ScreenStateMachine, Transition};
use crate::render::{RenderLoop, Renderer, SessionCell};
use crate::screen::{CompassStatus, ScreenKind};
use crate::sensors::{SensorAcquisition, SensorBus};
use crate::task::lock;

pub struct SessionCoordinator<B, R> {
    navigator: ScreenStateMachine,
    sensors: SensorAcquisition<B>,
    render: RenderLoop<R>,
    log: DiveLog,
    session: SessionCell,
    transitions: Mutex<()>,
}

impl<B, R> SessionCoordinator<B, R>
where
    B: SensorBus + 'static,
    R: Renderer + 'static,
{
    pub fn new(
        bus: Result<B, SensorError>,
        renderer: R,
        config: &DeviceConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let log = DiveLog::new(&config.log_path);
        let sensors = SensorAcquisition::new(bus, log.clone(), config);
        let navigator = ScreenStateMachine::new();
        let session = SessionCell::default();
        let render = RenderLoop::new(
            renderer,
            navigator.screen(),
            sensors.snapshot(),
            log.clone(),
            Arc::clone(&session),
            config,
        )?;
        Ok(Self {
            navigator,
            sensors,
            render,
            log,
            session,
            transitions: Mutex::new(()),
        })
    }

    pub fn navigator(&self) -> &ScreenStateMachine {
        &self.navigator
    }

    pub fn sensors(&self) -> &SensorAcquisition<B> {
        &self.sensors
    }

    pub fn render(&self) -> &RenderLoop<R> {
        &self.render
    }

    pub fn log(&self) -> &DiveLog {
        &self.log
    }

    pub fn session(&self) -> Option<DiveSession> {
        *lock(&self.session)
    }

    pub fn is_diving(&self) -> bool {
        self.session().is_some()
    }

    /// Start drawing the configuration screen.
    pub fn start(&self) -> Result<(), LifecycleError> {
        self.render.start()
    }

    /// Feed presses from `input` into this coordinator.
    pub fn attach_input<I: InputBus + 'static>(
        self: &Arc<Self>,
        input: &InputDispatchLoop<I>,
    ) -> Result<(), LifecycleError> {
        let coordinator = Arc::clone(self);
        input.start(move |button| coordinator.handle(button))
    }

    /// Route one press and apply its effect.
    pub fn handle(&self, button: Button) {
        let transition = self.navigator.handle(button);
        if let Err(e) = self.apply(transition) {
            warn!("{transition:?} incomplete: {e}");
        }
    }

    pub fn apply(&self, transition: Transition) -> Result<(), LifecycleError> {
        let _serial = lock(&self.transitions);
        match transition {
            Transition::Stay => Ok(()),
            Transition::Show(kind) => self.switch_screen(kind),
            Transition::StartDive { gas } => self.enter_dive(gas),
            Transition::EndDive => self.leave_dive(),
            Transition::CalibrateCompass => {
                self.calibrate_compass();
                Ok(())
            }
        }
    }

    /// Stop every loop, closing the dive in progress if any.
    pub fn shutdown(&self) -> Result<(), LifecycleError> {
        let _serial = lock(&self.transitions);
        let render = self.render.stop();
        let sensors = self.sensors.stop();
        self.close_session();
        info!("device shut down");
        render.and(sensors)
    }

    fn switch_screen(&self, kind: ScreenKind) -> Result<(), LifecycleError> {
        match self.render.stop() {
            // The render thread has exited either way.
            Err(e @ LifecycleError::JoinFailed(_)) => warn!("{e}, restarting render loop"),
            other => other?,
        }
        self.navigator.swap(kind);
        self.render.start()
    }

    fn enter_dive(&self, gas: GasMix) -> Result<(), LifecycleError> {
        if self.is_diving() {
            warn!("dive already in progress, keeping its session");
            return self.switch_screen(ScreenKind::General);
        }
        *lock(&self.session) = Some(DiveSession::new(Utc::now(), gas));
        if let Err(e) = self.sensors.start() {
            error!("dive not started, staying in configuration: {e}");
            *lock(&self.session) = None;
            return Err(e);
        }
        info!("dive started on {:.0}% O2", gas.o2 * 100.0);
        self.switch_screen(ScreenKind::General)
    }

    fn leave_dive(&self) -> Result<(), LifecycleError> {
        let stopped = self.sensors.stop();
        self.close_session();
        self.sensors.snapshot().clear();
        self.switch_screen(ScreenKind::Config)?;
        if self.sensors.is_calibrated() {
            self.navigator.set_compass_status(CompassStatus::Calibrated);
        }
        stopped
    }

    /// Append the dive-end record for the session in progress.
    fn close_session(&self) {
        let Some(session) = lock(&self.session).take() else {
            return;
        };
        let now = Utc::now();
        let record = DiveEndRecord::new(
            now,
            session.elapsed_secs(now),
            self.log.max_depth_since(session.dive_start),
        );
        info!("dive ended: {} max {:.1} m", record.dive_time, record.max_depth);
        if let Err(e) = self.log.append_dive_end(record) {
            error!("dive end not logged: {e}");
        }
    }

    /// Blocks for the whole calibration. Runs without the screen lock so
    /// the render loop keeps showing progress.
    fn calibrate_compass(&self) {
        let status = match self.sensors.calibrate() {
            Ok(_) => CompassStatus::Calibrated,
            Err(e) => {
                warn!("compass calibration failed: {e}");
                CompassStatus::Failed
            }
        };
        self.navigator.set_compass_status(status);
    }
}
