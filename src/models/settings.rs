//! User-editable tracking settings, persisted as `settings.json`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Unit the poll interval was entered in. Storage is always seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    #[default]
    Seconds,
    Minutes,
}

impl IntervalUnit {
    fn multiplier(self) -> u64 {
        match self {
            IntervalUnit::Seconds => 1,
            IntervalUnit::Minutes => 60,
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalUnit::Seconds => write!(f, "seconds"),
            IntervalUnit::Minutes => write!(f, "minutes"),
        }
    }
}

impl FromStr for IntervalUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => Ok(IntervalUnit::Seconds),
            "m" | "min" | "minute" | "minutes" => Ok(IntervalUnit::Minutes),
            other => Err(AppError::validation(format!(
                "unknown interval unit '{other}'"
            ))),
        }
    }
}

/// Tracking settings shared read-only with the polling worker.
///
/// `scan_days` is accepted and persisted but not applied to filtering: the
/// listing endpoint only returns currently open slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub source_country: String,
    pub mission_country: String,
    /// Poll interval in seconds
    pub check_interval: u64,
    pub interval_unit: IntervalUnit,
    pub scan_days: u32,
    pub initial_appointment_count: usize,
    /// Send a report on every cycle, not only when appointments exist
    pub send_all_updates: bool,

    /// Keys this version does not know about, kept across load/save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telegram_token: String::new(),
            telegram_chat_id: String::new(),
            source_country: String::new(),
            mission_country: String::new(),
            check_interval: 300,
            interval_unit: IntervalUnit::Seconds,
            scan_days: 1,
            initial_appointment_count: 5,
            send_all_updates: true,
            extra: serde_json::Map::new(),
        }
    }
}

impl Settings {
    pub const MAX_INTERVAL_VALUE: u64 = 3600;
    pub const MAX_SCAN_DAYS: u32 = 30;
    pub const MAX_INITIAL_COUNT: usize = 50;

    /// Poll interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval.max(1))
    }

    /// Set the interval from a value in the given unit.
    pub fn set_interval(&mut self, value: u64, unit: IntervalUnit) -> Result<()> {
        if value == 0 || value > Self::MAX_INTERVAL_VALUE {
            return Err(AppError::validation(format!(
                "interval must be within 1..={} {unit}",
                Self::MAX_INTERVAL_VALUE
            )));
        }
        self.check_interval = value * unit.multiplier();
        self.interval_unit = unit;
        Ok(())
    }

    /// Interval expressed in the unit it was entered in.
    pub fn interval_in_unit(&self) -> u64 {
        self.check_interval / self.interval_unit.multiplier()
    }

    /// Whether a country pair has been chosen.
    pub fn has_selection(&self) -> bool {
        !self.source_country.trim().is_empty() && !self.mission_country.trim().is_empty()
    }

    /// Whether messaging credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.telegram_token.trim().is_empty() && !self.telegram_chat_id.trim().is_empty()
    }

    /// Check the ranges the settings form enforces.
    pub fn validate(&self) -> Result<()> {
        let max_secs = Self::MAX_INTERVAL_VALUE * self.interval_unit.multiplier();
        if self.check_interval == 0 || self.check_interval > max_secs {
            return Err(AppError::validation(format!(
                "check_interval must be within 1..={max_secs} seconds"
            )));
        }
        if self.scan_days > Self::MAX_SCAN_DAYS {
            return Err(AppError::validation(format!(
                "scan_days must be within 0..={}",
                Self::MAX_SCAN_DAYS
            )));
        }
        if self.initial_appointment_count == 0
            || self.initial_appointment_count > Self::MAX_INITIAL_COUNT
        {
            return Err(AppError::validation(format!(
                "initial_appointment_count must be within 1..={}",
                Self::MAX_INITIAL_COUNT
            )));
        }
        Ok(())
    }
}
