use std::sync::Mutex;

use log::warn;

use crate::task::lock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontClass {
    Big,
    Small,
}

/// One drawable text field, as handed to the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawField {
    pub name: &'static str,
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub font: FontClass,
}

/// Named fields of a screen.
///
/// The set of names is fixed at construction; only positions and texts
/// change afterwards. Every access goes through one lock so a render never
/// observes a half-applied batch.
#[derive(Debug)]
pub struct FieldMap {
    fields: Mutex<Vec<DrawField>>,
}

impl FieldMap {
    /// Build from `(name, x, y, font, initial text)` entries.
    pub fn new(entries: &[(&'static str, i32, i32, FontClass, &str)]) -> Self {
        let fields = entries
            .iter()
            .map(|&(name, x, y, font, text)| DrawField {
                name,
                x,
                y,
                text: text.to_string(),
                font,
            })
            .collect();
        Self {
            fields: Mutex::new(fields),
        }
    }

    pub fn set_text(&self, name: &str, text: impl Into<String>) {
        self.set_texts(&[(name, text.into())]);
    }

    /// Apply several text changes atomically.
    pub fn set_texts(&self, changes: &[(&str, String)]) {
        let mut fields = lock(&self.fields);
        for (name, text) in changes {
            match fields.iter_mut().find(|f| f.name == *name) {
                Some(field) => field.text.clone_from(text),
                None => warn!("ignoring unknown field {name}"),
            }
        }
    }

    pub fn set_position(&self, name: &str, (x, y): (i32, i32)) {
        let mut fields = lock(&self.fields);
        match fields.iter_mut().find(|f| f.name == name) {
            Some(field) => {
                field.x = x;
                field.y = y;
            }
            None => warn!("ignoring unknown field {name}"),
        }
    }

    pub fn text(&self, name: &str) -> Option<String> {
        lock(&self.fields)
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.text.clone())
    }

    pub fn position(&self, name: &str) -> Option<(i32, i32)> {
        lock(&self.fields)
            .iter()
            .find(|f| f.name == name)
            .map(|f| (f.x, f.y))
    }

    pub fn names(&self) -> Vec<&'static str> {
        lock(&self.fields).iter().map(|f| f.name).collect()
    }

    pub fn snapshot(&self) -> Vec<DrawField> {
        lock(&self.fields).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> FieldMap {
        FieldMap::new(&[
            ("ind_depth", 290, 110, FontClass::Small, "m"),
            ("val_depth", 170, 95, FontClass::Big, ""),
        ])
    }

    #[test]
    fn test_modify_field() {
        let fields = map();
        fields.set_text("val_depth", "15.20");
        assert_eq!(fields.text("val_depth").as_deref(), Some("15.20"));
        fields.set_position("val_depth", (10, 20));
        assert_eq!(fields.position("val_depth"), Some((10, 20)));
    }

    #[test]
    fn test_keys_are_stable() {
        let fields = map();
        fields.set_text("val_missing", "x");
        fields.set_position("val_missing", (1, 1));
        assert_eq!(fields.names(), vec!["ind_depth", "val_depth"]);
        assert_eq!(fields.text("val_missing"), None);
    }

    #[test]
    fn test_snapshot_keeps_order_and_fonts() {
        let fields = map();
        fields.set_texts(&[("val_depth", "3.00".to_string()), ("ind_depth", "ft".to_string())]);
        let drawn = fields.snapshot();
        assert_eq!(drawn.len(), 2);
        assert_eq!(drawn[0].text, "ft");
        assert_eq!(drawn[1].font, FontClass::Big);
        assert_eq!((drawn[1].x, drawn[1].y), (170, 95));
    }
}
