//! Screens of the device and the button vocabulary they react to.

pub mod config;
pub mod dive;
pub mod exit;
pub mod fields;

pub use config::{AlarmKind, BleStatus, CompassStatus, ConfigScreen, CursorPhase, GasKind};
pub use dive::{DiveTelemetry, GeneralScreen, PalierScreen};
pub use exit::{ExitChoice, ExitScreen};
pub use fields::{DrawField, FieldMap, FontClass};

/// Physical buttons, in wiring order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    Back,
    Up,
    Down,
    Enter,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Back, Button::Up, Button::Down, Button::Enter];
}

/// What a screen asks of the device after handling a button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    /// Start the dive from the configuration screen, or end it from the
    /// exit screen.
    Confirm,
    CalibrateCompass,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenKind {
    Config,
    General,
    Palier,
    Exit,
}

impl ScreenKind {
    pub fn is_diving(self) -> bool {
        !matches!(self, ScreenKind::Config)
    }
}

#[derive(Debug)]
pub enum Screen {
    Config(ConfigScreen),
    General(GeneralScreen),
    Palier(PalierScreen),
    Exit(ExitScreen),
}

impl Screen {
    pub fn new(kind: ScreenKind) -> Self {
        match kind {
            ScreenKind::Config => Screen::Config(ConfigScreen::new()),
            ScreenKind::General => Screen::General(GeneralScreen::new()),
            ScreenKind::Palier => Screen::Palier(PalierScreen::new()),
            ScreenKind::Exit => Screen::Exit(ExitScreen::new()),
        }
    }

    pub fn kind(&self) -> ScreenKind {
        match self {
            Screen::Config(_) => ScreenKind::Config,
            Screen::General(_) => ScreenKind::General,
            Screen::Palier(_) => ScreenKind::Palier,
            Screen::Exit(_) => ScreenKind::Exit,
        }
    }

    pub fn fields(&self) -> &FieldMap {
        match self {
            Screen::Config(s) => s.fields(),
            Screen::General(s) => s.fields(),
            Screen::Palier(s) => s.fields(),
            Screen::Exit(s) => s.fields(),
        }
    }

    pub fn update(&mut self, button: Button) -> Outcome {
        match self {
            Screen::Config(s) => s.update(button),
            Screen::Exit(s) => s.update(button),
            Screen::General(_) | Screen::Palier(_) => Outcome::Handled,
        }
    }

    /// Push fresh telemetry into the displayed fields.
    pub fn refresh(&self, telemetry: &DiveTelemetry) {
        match self {
            Screen::Config(_) => {}
            Screen::General(s) => s.refresh(telemetry),
            Screen::Palier(s) => s.refresh(telemetry),
            Screen::Exit(s) => s.set_clock(&telemetry.clock),
        }
    }

    pub fn render(&self) -> Vec<DrawField> {
        self.fields().snapshot()
    }
}
