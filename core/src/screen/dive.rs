//! In-dive screens: the general dashboard and the decompression stop view.

use crate::buhlmann::{DecoResult, DecoTime};
use crate::models::{Heading, SensorSample};
use crate::screen::fields::{FieldMap, FontClass};

const NO_VALUE: &str = "--";

/// Everything a dive screen displays, gathered once per refresh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiveTelemetry {
    /// Wall clock, `HH:MM:SS`.
    pub clock: String,
    /// Elapsed dive time, `MMM:SS`.
    pub dive_time: String,
    pub sample: Option<SensorSample>,
    /// Positive when descending.
    pub vertical_speed_m_min: Option<f64>,
    pub deco: Option<DecoResult>,
    pub mod_m: Option<i32>,
}

impl DiveTelemetry {
    fn depth(&self) -> String {
        self.sample
            .map(|s| format!("{:.2}", s.depth_m))
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    fn temperature(&self) -> String {
        self.sample
            .map(|s| format!("{:.2}", s.temperature_c))
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    fn ambient_bar(&self) -> String {
        self.sample
            .map(|s| format!("{:.2}", s.pressure_mbar / 1000.0))
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    fn heading(&self) -> String {
        match self.sample.map(|s| s.heading) {
            Some(Heading::Degrees(deg)) => format!("{:03}", (deg.round() as i32).rem_euclid(360)),
            _ => "---".to_string(),
        }
    }

    fn vertical_speed(&self) -> String {
        match self.vertical_speed_m_min {
            Some(speed) if speed > 0.05 => format!("↓{speed:.1}"),
            Some(speed) if speed < -0.05 => format!("↑{:.1}", -speed),
            Some(_) => "0.0".to_string(),
            None => NO_VALUE.to_string(),
        }
    }

    fn next_stop(&self) -> String {
        match self.deco {
            Some(DecoResult {
                next_stop_m: Some(stop),
                ..
            }) => format!("{stop:.0}"),
            Some(_) => "-".to_string(),
            None => NO_VALUE.to_string(),
        }
    }

    fn ceiling(&self) -> String {
        self.deco
            .map(|d| format!("{:.1}", d.ceiling_m))
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    fn ndl(&self) -> String {
        self.deco
            .map(|d| deco_time(d.ndl))
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    fn stop_time(&self) -> String {
        self.deco
            .map(|d| deco_time(d.stop_time))
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    fn mod_m(&self) -> String {
        self.mod_m
            .map(|m| m.to_string())
            .unwrap_or_else(|| NO_VALUE.to_string())
    }
}

fn deco_time(time: DecoTime) -> String {
    match time {
        DecoTime::Minutes { value } => value.to_string(),
        DecoTime::NotComputed => NO_VALUE.to_string(),
    }
}

#[derive(Debug)]
pub struct GeneralScreen {
    fields: FieldMap,
}

impl Default for GeneralScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneralScreen {
    pub fn new() -> Self {
        Self {
            fields: FieldMap::new(&[
                ("ind_pressure", 430, 0, FontClass::Small, "BAR"),
                ("ind_ndl", 30, 75, FontClass::Big, "NDL"),
                ("ind_ndl_time", 90, 130, FontClass::Small, "MIN"),
                ("ind_depth", 290, 110, FontClass::Small, "m"),
                ("ind_updown", 370, 134, FontClass::Small, "m/min"),
                ("ind_temp", 170, 190, FontClass::Small, "°C"),
                ("ind_mod", 245, 190, FontClass::Small, "MOD (m):"),
                ("ind_palier", 95, 235, FontClass::Small, "Next stop:"),
                ("ind_palier_m", 335, 235, FontClass::Small, "m"),
                ("ind_timer", 95, 280, FontClass::Small, "Dive time:"),
                ("val_time", 10, 0, FontClass::Small, ""),
                ("val_heading", 215, 0, FontClass::Small, ""),
                ("val_pressure", 365, 0, FontClass::Small, ""),
                ("val_ndl", 30, 115, FontClass::Big, ""),
                ("val_depth", 170, 95, FontClass::Big, ""),
                ("val_updown", 320, 95, FontClass::Big, ""),
                ("val_temp", 100, 190, FontClass::Small, ""),
                ("val_mod", 360, 190, FontClass::Small, ""),
                ("val_palier", 290, 235, FontClass::Small, ""),
                ("val_timer", 290, 280, FontClass::Small, ""),
            ]),
        }
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn refresh(&self, telemetry: &DiveTelemetry) {
        self.fields.set_texts(&[
            ("val_time", telemetry.clock.clone()),
            ("val_heading", telemetry.heading()),
            ("val_pressure", telemetry.ambient_bar()),
            ("val_ndl", telemetry.ndl()),
            ("val_depth", telemetry.depth()),
            ("val_updown", telemetry.vertical_speed()),
            ("val_temp", telemetry.temperature()),
            ("val_mod", telemetry.mod_m()),
            ("val_palier", telemetry.next_stop()),
            ("val_timer", telemetry.dive_time.clone()),
        ]);
    }
}

#[derive(Debug)]
pub struct PalierScreen {
    fields: FieldMap,
}

impl Default for PalierScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl PalierScreen {
    pub fn new() -> Self {
        Self {
            fields: FieldMap::new(&[
                ("ind_pressure", 430, 0, FontClass::Small, "BAR"),
                ("ind_ndl", 30, 75, FontClass::Big, "NDL"),
                ("ind_ndl_time", 90, 130, FontClass::Small, "MIN"),
                ("ind_depth", 290, 110, FontClass::Small, "m"),
                ("ind_updown", 370, 134, FontClass::Small, "m/min"),
                ("ind_palier", 60, 190, FontClass::Small, "Stop:"),
                ("ind_palier_unit", 150, 235, FontClass::Small, "m"),
                ("ind_palier_time", 270, 190, FontClass::Small, "Time left:"),
                ("ind_palier_time_unit", 330, 235, FontClass::Small, "MIN"),
                ("ind_ceiling", 60, 150, FontClass::Small, "Ceiling (m):"),
                ("ind_timer", 95, 280, FontClass::Small, "Dive time:"),
                ("val_time", 10, 0, FontClass::Small, ""),
                ("val_pressure", 365, 0, FontClass::Small, ""),
                ("val_ndl", 30, 115, FontClass::Big, ""),
                ("val_depth", 170, 95, FontClass::Big, ""),
                ("val_updown", 320, 95, FontClass::Big, ""),
                ("val_ceiling", 200, 150, FontClass::Small, ""),
                ("val_palier", 60, 220, FontClass::Big, ""),
                ("val_palier_time", 270, 220, FontClass::Big, ""),
                ("val_timer", 290, 280, FontClass::Small, ""),
            ]),
        }
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn refresh(&self, telemetry: &DiveTelemetry) {
        self.fields.set_texts(&[
            ("val_time", telemetry.clock.clone()),
            ("val_pressure", telemetry.ambient_bar()),
            ("val_ndl", telemetry.ndl()),
            ("val_depth", telemetry.depth()),
            ("val_updown", telemetry.vertical_speed()),
            ("val_ceiling", telemetry.ceiling()),
            ("val_palier", telemetry.next_stop()),
            ("val_palier_time", telemetry.stop_time()),
            ("val_timer", telemetry.dive_time.clone()),
        ]);
    }
}
