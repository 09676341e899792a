// src/models/mod.rs

//! Domain models for the tracker.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod appointment;
mod config;
mod country;
mod history;
mod locale;
mod poll;
mod settings;

// Re-export all public types
pub use appointment::{
    AppointmentKey, AppointmentRecord, AppointmentSnapshot, MatchedAppointment, PLACEHOLDER,
    PLACEHOLDER_LINK,
};
pub use config::{ApiConfig, Config, DisplayConfig, LoggingConfig, PathsConfig, TelegramConfig};
pub use country::{CountryCatalog, CountryPair, DEFAULT_COUNTRY};
pub use history::HistoryState;
pub use locale::Locale;
pub use poll::{PollOutcome, PollResult};
pub use settings::{IntervalUnit, Settings};
