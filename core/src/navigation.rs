//! Routing of button presses to the live screen.
//!
//! The machine decides *what* should happen; applying a screen change
//! (stopping the render loop, swapping, restarting it) is left to the
//! caller so the ordering lives in one place.

use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::models::GasMix;
use crate::screen::{CompassStatus, Outcome, Screen, ScreenKind};
use crate::task::lock;

pub use crate::screen::Button;

/// Navigation effect of one button press.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transition {
    /// The live screen handled the press itself.
    Stay,
    Show(ScreenKind),
    StartDive { gas: GasMix },
    EndDive,
    CalibrateCompass,
}

pub struct ScreenStateMachine {
    screen: Arc<Mutex<Screen>>,
    resume: Mutex<ScreenKind>,
}

impl Default for ScreenStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenStateMachine {
    pub fn new() -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen::new(ScreenKind::Config))),
            resume: Mutex::new(ScreenKind::General),
        }
    }

    /// Shared handle on the live screen, for the render loop.
    pub fn screen(&self) -> Arc<Mutex<Screen>> {
        Arc::clone(&self.screen)
    }

    pub fn kind(&self) -> ScreenKind {
        lock(&self.screen).kind()
    }

    pub fn handle(&self, button: Button) -> Transition {
        let mut screen = lock(&self.screen);
        let kind = screen.kind();

        if matches!(kind, ScreenKind::General | ScreenKind::Palier) {
            return match button {
                Button::Back => {
                    *lock(&self.resume) = kind;
                    Transition::Show(ScreenKind::Exit)
                }
                Button::Up | Button::Down => Transition::Show(match kind {
                    ScreenKind::General => ScreenKind::Palier,
                    _ => ScreenKind::General,
                }),
                Button::Enter => {
                    screen.update(button);
                    Transition::Stay
                }
            };
        }

        let outcome = screen.update(button);
        match (&*screen, outcome) {
            (Screen::Exit(_), Outcome::Confirm) => Transition::EndDive,
            (Screen::Exit(_), Outcome::Handled) if button == Button::Enter => {
                Transition::Show(*lock(&self.resume))
            }
            (Screen::Config(config), Outcome::Confirm) => match config.gas_mix() {
                Ok(gas) => Transition::StartDive { gas },
                Err(e) => {
                    warn!("dive not started: {e}");
                    Transition::Stay
                }
            },
            (_, Outcome::CalibrateCompass) => Transition::CalibrateCompass,
            (_, outcome) => {
                debug!("{kind:?} handled {button:?} as {outcome:?}");
                Transition::Stay
            }
        }
    }

    /// Replace the live screen with a fresh instance of `kind`.
    ///
    /// Callers must stop the render loop first.
    pub fn swap(&self, kind: ScreenKind) {
        *lock(&self.screen) = Screen::new(kind);
    }

    /// Report compass status into the configuration screen, if it is live.
    pub fn set_compass_status(&self, status: CompassStatus) {
        if let Screen::Config(config) = &mut *lock(&self.screen) {
            config.set_compass_status(status);
        }
    }

    pub fn with_screen<R>(&self, f: impl FnOnce(&mut Screen) -> R) -> R {
        f(&mut lock(&self.screen))
    }
}
