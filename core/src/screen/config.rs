//! Pre-dive configuration wizard.

use crate::error::ConfigError;
use crate::models::GasMix;
use crate::screen::fields::{FieldMap, FontClass};
use crate::screen::{Button, Outcome};

const AIR_PERCENT: u8 = 21;
const NITROX_DEFAULT_PERCENT: u8 = 32;
const NITROX_MIN_PERCENT: u8 = 22;
const GAS_PERCENT_MAX: u8 = 99;

/// Cursor position of the configuration wizard.
///
/// Rows are where the cursor rests between edits; the other phases edit
/// the value of the row above them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorPhase {
    SelectGasKind,
    SelectGasType,
    SelectGasPercent,
    SelectAlarmKind,
    SelectAlarmOption,
    SelectCompassCal,
    SelectBleCal,
    Start,
}

impl CursorPhase {
    pub const ALL: [CursorPhase; 8] = [
        CursorPhase::SelectGasKind,
        CursorPhase::SelectGasType,
        CursorPhase::SelectGasPercent,
        CursorPhase::SelectAlarmKind,
        CursorPhase::SelectAlarmOption,
        CursorPhase::SelectCompassCal,
        CursorPhase::SelectBleCal,
        CursorPhase::Start,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn is_row(self) -> bool {
        !matches!(
            self,
            CursorPhase::SelectGasType
                | CursorPhase::SelectGasPercent
                | CursorPhase::SelectAlarmOption
        )
    }

    /// The row that owns this phase.
    pub fn row(self) -> Self {
        match self {
            CursorPhase::SelectGasType | CursorPhase::SelectGasPercent => {
                CursorPhase::SelectGasKind
            }
            CursorPhase::SelectAlarmOption => CursorPhase::SelectAlarmKind,
            row => row,
        }
    }

    pub fn next_row(self) -> Self {
        let mut phase = self.next();
        while !phase.is_row() {
            phase = phase.next();
        }
        phase
    }

    pub fn previous_row(self) -> Self {
        let mut phase = self.previous();
        while !phase.is_row() {
            phase = phase.previous();
        }
        phase
    }

    /// Where the cursor glyph is drawn.
    pub fn position(self) -> (i32, i32) {
        match self {
            CursorPhase::SelectGasKind => (80, 60),
            CursorPhase::SelectGasType => (210, 60),
            CursorPhase::SelectGasPercent => (280, 60),
            CursorPhase::SelectAlarmKind => (80, 110),
            CursorPhase::SelectAlarmOption => (210, 110),
            CursorPhase::SelectCompassCal => (80, 160),
            CursorPhase::SelectBleCal => (80, 210),
            CursorPhase::Start => (80, 260),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasKind {
    Air,
    Nitrox,
}

impl GasKind {
    pub fn label(self) -> &'static str {
        match self {
            GasKind::Air => "AIR",
            GasKind::Nitrox => "NITROX",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlarmKind {
    SpeedAndMod,
    Speed,
    Mod,
    Stop,
    Off,
}

impl AlarmKind {
    pub const ALL: [AlarmKind; 5] = [
        AlarmKind::SpeedAndMod,
        AlarmKind::Speed,
        AlarmKind::Mod,
        AlarmKind::Stop,
        AlarmKind::Off,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|a| *a == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            AlarmKind::SpeedAndMod => "Speed / MOD",
            AlarmKind::Speed => "Speed",
            AlarmKind::Mod => "MOD",
            AlarmKind::Stop => "Stop",
            AlarmKind::Off => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompassStatus {
    NotCalibrated,
    Calibrating,
    Calibrated,
    Failed,
}

impl CompassStatus {
    pub fn label(self) -> &'static str {
        match self {
            CompassStatus::NotCalibrated => "Not calibrated",
            CompassStatus::Calibrating => "Calibrating ...",
            CompassStatus::Calibrated => "Calibrated",
            CompassStatus::Failed => "Failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BleStatus {
    Disconnected,
    Pairing,
    Connected,
}

impl BleStatus {
    pub fn label(self) -> &'static str {
        match self {
            BleStatus::Disconnected => "Disconnected",
            BleStatus::Pairing => "Rotate the device",
            BleStatus::Connected => "Connected",
        }
    }
}

#[derive(Debug)]
pub struct ConfigScreen {
    fields: FieldMap,
    phase: CursorPhase,
    gas_kind: GasKind,
    gas_percent: u8,
    alarm_kind: AlarmKind,
    compass_status: CompassStatus,
    ble_status: BleStatus,
}

impl Default for ConfigScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigScreen {
    pub fn new() -> Self {
        let fields = FieldMap::new(&[
            ("ind_title", 5, 5, FontClass::Small, "Settings"),
            ("ind_gas", 100, 60, FontClass::Small, "Gas:"),
            ("ind_gas_perc", 350, 60, FontClass::Small, "%"),
            ("ind_alarm", 100, 110, FontClass::Small, "Alarm:"),
            ("ind_compass", 100, 160, FontClass::Small, "Compass:"),
            ("ind_ble", 100, 210, FontClass::Small, "BLE:"),
            ("ind_start", 100, 260, FontClass::Small, "Start dive"),
            ("val_gas", 230, 60, FontClass::Small, ""),
            ("val_gas_perc", 300, 60, FontClass::Small, ""),
            ("val_alarm", 230, 110, FontClass::Small, ""),
            ("val_compass", 230, 160, FontClass::Small, ""),
            ("val_ble", 230, 210, FontClass::Small, ""),
            ("cursor", 80, 60, FontClass::Small, ">"),
        ]);
        let screen = Self {
            fields,
            phase: CursorPhase::SelectGasKind,
            gas_kind: GasKind::Air,
            gas_percent: AIR_PERCENT,
            alarm_kind: AlarmKind::SpeedAndMod,
            compass_status: CompassStatus::NotCalibrated,
            ble_status: BleStatus::Disconnected,
        };
        screen.sync_fields();
        screen
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn phase(&self) -> CursorPhase {
        self.phase
    }

    pub fn gas_kind(&self) -> GasKind {
        self.gas_kind
    }

    pub fn gas_percent(&self) -> u8 {
        self.gas_percent
    }

    pub fn alarm_kind(&self) -> AlarmKind {
        self.alarm_kind
    }

    pub fn compass_status(&self) -> CompassStatus {
        self.compass_status
    }

    pub fn ble_status(&self) -> BleStatus {
        self.ble_status
    }

    /// Breathing gas for the dive about to start.
    pub fn gas_mix(&self) -> Result<GasMix, ConfigError> {
        match self.gas_kind {
            GasKind::Air => Ok(GasMix::AIR),
            GasKind::Nitrox => GasMix::nitrox(self.gas_percent),
        }
    }

    /// Flip between air and nitrox. Air always resets the percentage to 21.
    pub fn toggle_gas(&mut self) {
        match self.gas_kind {
            GasKind::Air => {
                self.gas_kind = GasKind::Nitrox;
                self.gas_percent = NITROX_DEFAULT_PERCENT;
            }
            GasKind::Nitrox => {
                self.gas_kind = GasKind::Air;
                self.gas_percent = AIR_PERCENT;
            }
        }
        self.sync_fields();
    }

    pub fn set_gas_percent(&mut self, percent: u8) -> Result<(), ConfigError> {
        if percent == 0 || percent >= 100 {
            return Err(ConfigError::GasPercentOutOfRange(percent));
        }
        self.gas_percent = percent;
        self.sync_fields();
        Ok(())
    }

    pub fn set_compass_status(&mut self, status: CompassStatus) {
        self.compass_status = status;
        self.sync_fields();
    }

    pub fn set_ble_status(&mut self, status: BleStatus) {
        self.ble_status = status;
        self.sync_fields();
    }

    pub fn update(&mut self, button: Button) -> Outcome {
        let outcome = self.step(button);
        self.sync_fields();
        outcome
    }

    fn step(&mut self, button: Button) -> Outcome {
        let phase = self.phase;
        match (phase, button) {
            (_, Button::Back) => {
                self.phase = phase.row();
                Outcome::Handled
            }
            (_, Button::Up) if phase.is_row() => {
                self.phase = phase.previous_row();
                Outcome::Handled
            }
            (_, Button::Down) if phase.is_row() => {
                self.phase = phase.next_row();
                Outcome::Handled
            }
            (CursorPhase::SelectGasType, Button::Up | Button::Down) => {
                self.toggle_gas();
                Outcome::Handled
            }
            (CursorPhase::SelectGasPercent, Button::Up) => {
                self.gas_percent = (self.gas_percent + 1).min(GAS_PERCENT_MAX);
                Outcome::Handled
            }
            (CursorPhase::SelectGasPercent, Button::Down) => {
                self.gas_percent = self.gas_percent.saturating_sub(1).max(NITROX_MIN_PERCENT);
                Outcome::Handled
            }
            (CursorPhase::SelectAlarmOption, Button::Up) => {
                self.alarm_kind = self.alarm_kind.previous();
                Outcome::Handled
            }
            (CursorPhase::SelectAlarmOption, Button::Down) => {
                self.alarm_kind = self.alarm_kind.next();
                Outcome::Handled
            }
            (CursorPhase::Start, Button::Enter) => Outcome::Confirm,
            (CursorPhase::SelectCompassCal, Button::Enter) => {
                self.compass_status = CompassStatus::Calibrating;
                self.phase = phase.next();
                Outcome::CalibrateCompass
            }
            (CursorPhase::SelectGasType, Button::Enter) if self.gas_kind == GasKind::Air => {
                self.phase = CursorPhase::SelectAlarmKind;
                Outcome::Handled
            }
            (_, Button::Enter) => {
                self.phase = phase.next();
                Outcome::Handled
            }
            // Remaining Up/Down pairs are on rows and handled above.
            (_, Button::Up | Button::Down) => Outcome::Handled,
        }
    }

    fn sync_fields(&self) {
        let percent = match self.gas_kind {
            GasKind::Air => String::new(),
            GasKind::Nitrox => self.gas_percent.to_string(),
        };
        self.fields.set_texts(&[
            ("val_gas", self.gas_kind.label().to_string()),
            ("val_gas_perc", percent),
            ("val_alarm", self.alarm_kind.label().to_string()),
            ("val_compass", self.compass_status.label().to_string()),
            ("val_ble", self.ble_status.label().to_string()),
        ]);
        self.fields.set_position("cursor", self.phase.position());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUTTONS: [Button; 4] = [Button::Back, Button::Up, Button::Down, Button::Enter];

    fn at_phase(phase: CursorPhase) -> ConfigScreen {
        let mut screen = ConfigScreen::new();
        screen.phase = phase;
        screen
    }

    #[test]
    fn test_init() {
        let screen = ConfigScreen::new();
        assert_eq!(screen.gas_percent(), 21);
        assert_eq!(screen.gas_kind(), GasKind::Air);
        assert_eq!(screen.phase(), CursorPhase::SelectGasKind);
        assert_eq!(screen.fields().text("val_gas").as_deref(), Some("AIR"));
        assert_eq!(screen.fields().position("cursor"), Some((80, 60)));
    }

    #[test]
    fn test_phase_next_previous_are_inverse() {
        for phase in CursorPhase::ALL {
            assert_eq!(phase.next().previous(), phase);
            assert_eq!(phase.previous().next(), phase);
        }
        assert_eq!(CursorPhase::Start.next(), CursorPhase::SelectGasKind);
        assert_eq!(CursorPhase::SelectGasKind.previous(), CursorPhase::Start);
        assert_eq!(AlarmKind::Off.next(), AlarmKind::SpeedAndMod);
    }

    #[test]
    fn test_row_navigation() {
        let mut screen = ConfigScreen::new();
        screen.update(Button::Down);
        assert_eq!(screen.phase(), CursorPhase::SelectAlarmKind);
        screen.update(Button::Up);
        assert_eq!(screen.phase(), CursorPhase::SelectGasKind);
        screen.update(Button::Up);
        assert_eq!(screen.phase(), CursorPhase::Start);
        assert_eq!(screen.fields().position("cursor"), Some((80, 260)));
    }

    #[test]
    fn test_set_gas() {
        let mut screen = ConfigScreen::new();
        screen.toggle_gas();
        assert_eq!(screen.gas_kind(), GasKind::Nitrox);
        screen.toggle_gas();
        assert_eq!(screen.gas_kind(), GasKind::Air);
        assert_eq!(screen.gas_percent(), 21);
    }

    #[test]
    fn test_nitrox_wizard() {
        let mut screen = ConfigScreen::new();
        assert_eq!(screen.update(Button::Enter), Outcome::Handled);
        assert_eq!(screen.phase(), CursorPhase::SelectGasType);
        screen.update(Button::Down);
        assert_eq!(screen.gas_kind(), GasKind::Nitrox);

        screen.update(Button::Enter);
        assert_eq!(screen.phase(), CursorPhase::SelectGasPercent);
        screen.update(Button::Up);
        screen.update(Button::Up);
        assert_eq!(screen.gas_percent(), 34);
        assert_eq!(screen.fields().text("val_gas_perc").as_deref(), Some("34"));
        assert!((screen.gas_mix().unwrap().o2 - 0.34).abs() < 1e-12);

        screen.update(Button::Enter);
        assert_eq!(screen.phase(), CursorPhase::SelectAlarmKind);
        screen.update(Button::Enter);
        screen.update(Button::Down);
        assert_eq!(screen.alarm_kind(), AlarmKind::Speed);
        screen.update(Button::Enter);
        assert_eq!(screen.phase(), CursorPhase::SelectCompassCal);

        assert_eq!(screen.update(Button::Enter), Outcome::CalibrateCompass);
        assert_eq!(screen.compass_status(), CompassStatus::Calibrating);
        assert_eq!(screen.phase(), CursorPhase::SelectBleCal);
        screen.update(Button::Enter);
        assert_eq!(screen.phase(), CursorPhase::Start);
        assert_eq!(screen.update(Button::Enter), Outcome::Confirm);
    }

    #[test]
    fn test_air_skips_percent() {
        let mut screen = ConfigScreen::new();
        screen.update(Button::Enter);
        screen.update(Button::Enter);
        assert_eq!(screen.phase(), CursorPhase::SelectAlarmKind);
        assert_eq!(screen.gas_mix().unwrap(), GasMix::AIR);
    }

    #[test]
    fn test_percent_bounds() {
        let mut screen = ConfigScreen::new();
        screen.toggle_gas();
        screen.phase = CursorPhase::SelectGasPercent;
        for _ in 0..100 {
            screen.update(Button::Up);
        }
        assert_eq!(screen.gas_percent(), 99);
        for _ in 0..100 {
            screen.update(Button::Down);
        }
        assert_eq!(screen.gas_percent(), 22);
        assert!(screen.set_gas_percent(100).is_err());
        assert!(screen.set_gas_percent(0).is_err());
        screen.set_gas_percent(40).unwrap();
        assert_eq!(screen.gas_percent(), 40);
    }

    #[test]
    fn test_back_leaves_edit_phase() {
        let mut screen = at_phase(CursorPhase::SelectAlarmOption);
        screen.update(Button::Back);
        assert_eq!(screen.phase(), CursorPhase::SelectAlarmKind);
        screen.update(Button::Back);
        assert_eq!(screen.phase(), CursorPhase::SelectAlarmKind);
    }

    #[test]
    fn test_only_enter_on_start_confirms() {
        for phase in CursorPhase::ALL {
            for button in BUTTONS {
                let outcome = at_phase(phase).update(button);
                let expected = phase == CursorPhase::Start && button == Button::Enter;
                assert_eq!(
                    outcome == Outcome::Confirm,
                    expected,
                    "{phase:?} + {button:?} gave {outcome:?}"
                );
            }
        }
    }
}
