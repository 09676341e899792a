//! Date and timestamp parsing/formatting shared by the cycle and the reports.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{AppError, Result};

/// Format used for check times and the upstream freshness value.
pub const DISPLAY_TIMESTAMP: &str = "%d.%m.%Y - %H:%M:%S";

/// Format used for appointment dates in reports.
pub const DISPLAY_DATE: &str = "%d.%m.%Y";

/// Format used inside history keys.
pub const STORAGE_DATE: &str = "%Y-%m-%d";

/// Parse an appointment date, ignoring any time-of-day or zone suffix.
pub fn parse_appointment_date(raw: &str) -> Result<NaiveDate> {
    let date_part = raw
        .trim()
        .split(['T', ' '])
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(date_part, STORAGE_DATE)
        .map_err(|e| AppError::parse("appointment_date", format!("'{raw}': {e}")))
}

/// Parse an ISO-8601 timestamp. Values without a zone are taken as UTC.
pub fn parse_upstream_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
        .map_err(|e| AppError::parse("last_checked", format!("'{raw}': {e}")))
}

/// Build a fixed offset from whole hours east of UTC.
pub fn offset_hours(hours: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| AppError::config(format!("invalid UTC offset: {hours} hours")))
}

/// Render a timestamp in the display format.
pub fn format_timestamp<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format(DISPLAY_TIMESTAMP).to_string()
}
