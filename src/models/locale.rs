//! Report wording, overridable through `locale.toml`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Message templates. Placeholders are written as `{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    pub report_title: String,
    /// `{source}`, `{mission}`
    pub route: String,
    /// `{time}`
    pub checked_at: String,
    /// `{time}`
    pub previous_check: String,
    /// `{time}`
    pub feed_updated: String,
    /// Shown instead of a previous check time on the first cycle
    pub first_check: String,
    /// `{count}`
    pub appointments_header: String,
    /// `{date}`
    pub date: String,
    /// `{center}`
    pub center: String,
    /// `{category}`
    pub visa_type: String,
    /// `{subcategory}`
    pub subcategory: String,
    /// `{count}`
    pub people_looking: String,
    /// `{change}` (signed)
    pub people_change: String,
    /// `{link}`
    pub booking_link: String,
    pub no_appointments: String,
    /// `{error}`
    pub error: String,
    pub test_message: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            report_title: "🔄 Appointment Check Report".into(),
            route: "🌍 {source} ➡️ {mission}".into(),
            checked_at: "⏰ Checked at: {time}".into(),
            previous_check: "📤 Previous check: {time}".into(),
            feed_updated: "🔄 Feed last updated: {time}".into(),
            first_check: "First check".into(),
            appointments_header: "📅 Available appointments ({count}):".into(),
            date: "📅 Date: {date}".into(),
            center: "🏢 Center: {center}".into(),
            visa_type: "📋 Visa type: {category}".into(),
            subcategory: "📝 Subcategory: {subcategory}".into(),
            people_looking: "👥 People looking: {count}".into(),
            people_change: " ({change} change)".into(),
            booking_link: "🔗 <a href='{link}'>Booking link</a>".into(),
            no_appointments: "❌ No appointments are currently available.".into(),
            error: "⚠️ Error: {error}".into(),
            test_message: "✅ Visa tracker test message".into(),
        }
    }
}

impl Locale {
    /// Load templates from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load templates or return the built-in English ones.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        if !path.as_ref().exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Locale load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }
}
