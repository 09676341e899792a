//! Appointment records as listed upstream and their normalized snapshots.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::time::{DISPLAY_DATE, STORAGE_DATE, parse_appointment_date};

/// Stand-in for missing optional text fields.
pub const PLACEHOLDER: &str = "Not specified";

/// Stand-in for a missing booking link.
pub const PLACEHOLDER_LINK: &str = "#";

/// One element of the upstream listing. Every field may be absent.
///
/// Fields are read leniently: a value of an unexpected type is treated as
/// absent instead of failing the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentRecord {
    #[serde(deserialize_with = "lenient::text")]
    pub source_country: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub mission_country: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub appointment_date: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub center_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub visa_category: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub visa_subcategory: Option<String>,
    #[serde(deserialize_with = "lenient::count")]
    pub people_looking: Option<i64>,
    #[serde(deserialize_with = "lenient::text")]
    pub book_now_link: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub last_checked: Option<String>,
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Strings pass through, numbers and booleans are rendered as text,
    /// anything else is dropped.
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => {
                log::warn!("Ignoring non-text listing value: {}", other);
                None
            }
        })
    }

    /// Whole numbers, integral floats and numeric strings become a count.
    pub fn count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let count = match &value {
            Value::Null => return Ok(None),
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        if count.is_none() {
            log::warn!("Ignoring non-integer people_looking: {}", value);
        }
        Ok(count)
    }
}

impl AppointmentRecord {
    /// Required identity fields, if all are present and non-empty.
    pub fn identity(&self) -> Option<(&str, &str, &str)> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }
        Some((
            non_empty(&self.source_country)?,
            non_empty(&self.mission_country)?,
            non_empty(&self.appointment_date)?,
        ))
    }

    /// Whether this record belongs to the given country pair.
    pub fn matches(&self, source_country: &str, mission_country: &str) -> bool {
        matches!(
            self.identity(),
            Some((source, mission, _)) if source == source_country && mission == mission_country
        )
    }

    /// Build the key and normalized snapshot for this record.
    ///
    /// Fails with a parse error when required fields are missing or the date
    /// is malformed.
    pub fn normalize(&self) -> Result<(AppointmentKey, AppointmentSnapshot)> {
        let (source, mission, raw_date) = self
            .identity()
            .ok_or_else(|| AppError::parse("appointment", "missing required field"))?;
        let date = parse_appointment_date(raw_date)?;

        let text = |v: &Option<String>| {
            v.as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(PLACEHOLDER)
                .to_string()
        };

        let key = AppointmentKey {
            source_country: source.to_string(),
            mission_country: mission.to_string(),
            date,
        };
        let snapshot = AppointmentSnapshot {
            date: date.format(DISPLAY_DATE).to_string(),
            center: text(&self.center_name),
            visa_category: text(&self.visa_category),
            visa_subcategory: text(&self.visa_subcategory),
            people_looking: self.people_looking.unwrap_or(0),
            link: self
                .book_now_link
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(PLACEHOLDER_LINK)
                .to_string(),
        };
        Ok((key, snapshot))
    }
}

/// Identity of a trackable slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppointmentKey {
    pub source_country: String,
    pub mission_country: String,
    pub date: NaiveDate,
}

impl AppointmentKey {
    /// Key string used in the history file.
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AppointmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.source_country,
            self.mission_country,
            self.date.format(STORAGE_DATE)
        )
    }
}

impl Serialize for AppointmentKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Last-known normalized state of one key, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSnapshot {
    /// Date in display format (`dd.mm.yyyy`)
    pub date: String,
    pub center: String,
    pub visa_category: String,
    pub visa_subcategory: String,
    pub people_looking: i64,
    pub link: String,
}

/// A snapshot matched in the current cycle, with its report-only delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedAppointment {
    pub key: AppointmentKey,
    pub snapshot: AppointmentSnapshot,
    /// `new - previous` people looking, when the key was known and changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub people_looking_change: Option<i64>,
}
