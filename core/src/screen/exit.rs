//! End-of-dive confirmation.

use crate::screen::fields::{FieldMap, FontClass};
use crate::screen::{Button, Outcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitChoice {
    No,
    Yes,
}

impl ExitChoice {
    fn toggled(self) -> Self {
        match self {
            ExitChoice::No => ExitChoice::Yes,
            ExitChoice::Yes => ExitChoice::No,
        }
    }

    /// Where the selector frame is drawn.
    pub fn position(self) -> (i32, i32) {
        match self {
            ExitChoice::No => (135, 150),
            ExitChoice::Yes => (335, 150),
        }
    }
}

#[derive(Debug)]
pub struct ExitScreen {
    fields: FieldMap,
    choice: ExitChoice,
}

impl Default for ExitScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl ExitScreen {
    pub fn new() -> Self {
        let screen = Self {
            fields: FieldMap::new(&[
                ("val_time", 10, 0, FontClass::Small, ""),
                ("stop_dive", 120, 80, FontClass::Big, "End dive?"),
                ("no", 150, 150, FontClass::Small, "NO"),
                ("yes", 350, 150, FontClass::Small, "YES"),
                ("selector", 135, 150, FontClass::Small, "[   ]"),
            ]),
            choice: ExitChoice::No,
        };
        screen.sync_fields();
        screen
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn choice(&self) -> ExitChoice {
        self.choice
    }

    pub fn set_clock(&self, clock: &str) {
        self.fields.set_text("val_time", clock);
    }

    /// Enter on YES confirms; everything else only moves the selector.
    pub fn update(&mut self, button: Button) -> Outcome {
        let outcome = match button {
            Button::Up | Button::Down => {
                self.choice = self.choice.toggled();
                Outcome::Handled
            }
            Button::Enter if self.choice == ExitChoice::Yes => Outcome::Confirm,
            Button::Enter | Button::Back => Outcome::Handled,
        };
        self.sync_fields();
        outcome
    }

    fn sync_fields(&self) {
        self.fields.set_position("selector", self.choice.position());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_no() {
        let screen = ExitScreen::new();
        assert_eq!(screen.choice(), ExitChoice::No);
        assert_eq!(screen.fields().position("selector"), Some((135, 150)));
    }

    #[test]
    fn test_toggle_and_confirm() {
        let mut screen = ExitScreen::new();
        assert_eq!(screen.update(Button::Down), Outcome::Handled);
        assert_eq!(screen.choice(), ExitChoice::Yes);
        assert_eq!(screen.fields().position("selector"), Some((335, 150)));
        assert_eq!(screen.update(Button::Enter), Outcome::Confirm);
    }

    #[test]
    fn test_enter_on_no_does_not_confirm() {
        let mut screen = ExitScreen::new();
        assert_eq!(screen.update(Button::Enter), Outcome::Handled);
        screen.update(Button::Up);
        screen.update(Button::Up);
        assert_eq!(screen.choice(), ExitChoice::No);
        assert_eq!(screen.update(Button::Enter), Outcome::Handled);
        assert_eq!(screen.update(Button::Back), Outcome::Handled);
    }

    #[test]
    fn test_back_never_confirms() {
        let mut screen = ExitScreen::new();
        screen.update(Button::Down);
        assert_eq!(screen.update(Button::Back), Outcome::Handled);
        assert_eq!(screen.choice(), ExitChoice::Yes);
        assert_eq!(screen.fields().position("selector"), Some((335, 150)));
    }
}
