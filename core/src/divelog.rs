//! Persisted dive log.
//!
//! The log is a single JSON array. Every append reads the whole file,
//! pushes one entry and rewrites it, all under a lock shared by every
//! [`DiveLog`] handle on the same path in this process, so readers never
//! see a partial file.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::dive_time::{format_dive_time, parse_dive_time};
use crate::error::DiveLogError;
use crate::models::{Heading, ProfilePoint, SensorSample};
use crate::task::lock;

/// Persisted form of a [`SensorSample`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiveLogRecord {
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    #[serde(rename = "pression_mbar")]
    pub pressure_mbar: f64,
    #[serde(rename = "profondeur_m")]
    pub depth_m: f64,
    #[serde(rename = "azimut_deg")]
    pub heading_deg: f64,
}

impl DiveLogRecord {
    pub fn heading(&self) -> Heading {
        Heading::from_logged(self.heading_deg)
    }
}

impl From<&SensorSample> for DiveLogRecord {
    fn from(sample: &SensorSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            temperature_c: sample.temperature_c,
            pressure_mbar: sample.pressure_mbar,
            depth_m: sample.depth_m,
            heading_deg: sample.heading.as_logged(),
        }
    }
}

/// Terminal record appended when a dive session ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiveEndRecord {
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    /// Elapsed time as `MMM:SS`.
    pub dive_time: String,
    pub max_depth: f64,
}

impl DiveEndRecord {
    pub fn new(timestamp: DateTime<Utc>, elapsed_secs: i64, max_depth: f64) -> Self {
        Self {
            timestamp,
            dive_time: format_dive_time(elapsed_secs),
            max_depth,
        }
    }

    pub fn elapsed_secs(&self) -> Result<i64, DiveLogError> {
        parse_dive_time(&self.dive_time)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogEntry {
    Sample(DiveLogRecord),
    DiveEnd(DiveEndRecord),
}

/// Write lock for `path`, created on first use.
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let key = path
        .parent()
        .and_then(|dir| dir.canonicalize().ok())
        .zip(path.file_name())
        .map(|(dir, name)| dir.join(name))
        .unwrap_or_else(|| path.to_path_buf());
    let mut locks = lock(LOCKS.get_or_init(Default::default));
    Arc::clone(locks.entry(key).or_default())
}

/// Handle on the dive log file. Every handle on the same path shares one lock.
#[derive(Clone, Debug)]
pub struct DiveLog {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl DiveLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            lock: path_lock(&path),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append_sample(&self, sample: &SensorSample) -> Result<(), DiveLogError> {
        self.append(LogEntry::Sample(DiveLogRecord::from(sample)))
    }

    pub fn append_dive_end(&self, record: DiveEndRecord) -> Result<(), DiveLogError> {
        self.append(LogEntry::DiveEnd(record))
    }

    pub fn append(&self, entry: LogEntry) -> Result<(), DiveLogError> {
        let _guard = lock(&self.lock);
        let mut entries = match self.read_unlocked() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("dive log {} unreadable, starting fresh: {e}", self.path.display());
                Vec::new()
            }
        };
        entries.push(entry);
        self.write_unlocked(&entries).inspect_err(|e| {
            error!("failed to write dive log {}: {e}", self.path.display());
        })
    }

    /// All entries, oldest first. An unreadable or corrupt log reads as empty.
    pub fn entries(&self) -> Vec<LogEntry> {
        let _guard = lock(&self.lock);
        self.read_unlocked().unwrap_or_else(|e| {
            warn!("dive log {} unreadable, treating as empty: {e}", self.path.display());
            Vec::new()
        })
    }

    pub fn samples(&self) -> Vec<DiveLogRecord> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                LogEntry::Sample(record) => Some(record),
                LogEntry::DiveEnd(_) => None,
            })
            .collect()
    }

    /// Depth profile of the samples logged at or after `start`, with times
    /// in seconds from `start`.
    pub fn profile_since(&self, start: DateTime<Utc>) -> Vec<ProfilePoint> {
        self.samples()
            .into_iter()
            .filter(|record| record.timestamp >= start)
            .map(|record| ProfilePoint {
                t_sec: (record.timestamp - start).num_milliseconds() as f64 / 1000.0,
                depth_m: record.depth_m,
            })
            .collect()
    }

    pub fn max_depth_since(&self, start: DateTime<Utc>) -> f64 {
        self.profile_since(start)
            .iter()
            .map(|p| p.depth_m)
            .fold(0.0, f64::max)
    }

    fn read_unlocked(&self) -> Result<Vec<LogEntry>, DiveLogError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<serde_json::Value> = serde_json::from_str(&json)?;
        let mut entries = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<LogEntry>(value) {
                Ok(entry) => entries.push(entry),
                Err(e) => debug!("skipping unrecognised dive log entry: {e}"),
            }
        }
        Ok(entries)
    }

    fn write_unlocked(&self, entries: &[LogEntry]) -> Result<(), DiveLogError> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// ISO-8601 UTC timestamps with microseconds and a trailing `Z`.
pub mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn format(timestamp: &DateTime<Utc>) -> String {
        timestamp.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }

    pub fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(timestamp))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}
