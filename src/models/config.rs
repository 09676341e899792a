//! Runtime configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root runtime configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listing endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Messaging sink settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Report rendering settings
    #[serde(default)]
    pub display: DisplayConfig,

    /// File locations, relative to the storage directory
    #[serde(default)]
    pub paths: PathsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.api.listing_url)?;
        Url::parse(&self.telegram.api_base)?;
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.telegram.timeout_secs == 0 {
            return Err(AppError::validation("telegram.timeout_secs must be > 0"));
        }
        if !(-12..=14).contains(&self.display.upstream_utc_offset_hours) {
            return Err(AppError::validation(
                "display.upstream_utc_offset_hours must be within -12..=14",
            ));
        }
        Ok(())
    }
}

/// Listing endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// JSON endpoint returning the appointment list
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listing_url: defaults::listing_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::api_timeout(),
        }
    }
}

/// Bot API settings. Credentials live in the user settings, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Base URL of the bot API
    #[serde(default = "defaults::telegram_api_base")]
    pub api_base: String,

    /// Upper bound for a single send, in seconds
    #[serde(default = "defaults::telegram_timeout")]
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::telegram_api_base(),
            timeout_secs: defaults::telegram_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Fixed offset the upstream "last updated" time is shown in
    #[serde(default = "defaults::upstream_offset")]
    pub upstream_utc_offset_hours: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            upstream_utc_offset_hours: defaults::upstream_offset(),
        }
    }
}

/// File names inside the storage directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::settings_file")]
    pub settings_file: String,

    #[serde(default = "defaults::history_file")]
    pub history_file: String,

    #[serde(default = "defaults::countries_file")]
    pub countries_file: String,

    #[serde(default = "defaults::locale_file")]
    pub locale_file: String,
}

impl PathsConfig {
    /// Resolve the country catalog path against the storage directory.
    pub fn countries_path(&self, root: &Path) -> PathBuf {
        root.join(&self.countries_file)
    }

    /// Resolve the locale path against the storage directory.
    pub fn locale_path(&self, root: &Path) -> PathBuf {
        root.join(&self.locale_file)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            settings_file: defaults::settings_file(),
            history_file: defaults::history_file(),
            countries_file: defaults::countries_file(),
            locale_file: defaults::locale_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Api defaults
    pub fn listing_url() -> String {
        "https://api.schengenvisaappointments.com/api/visa-list/?format=json".into()
    }
    pub fn user_agent() -> String {
        concat!("visa-tracker/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn api_timeout() -> u64 {
        30
    }

    // Telegram defaults
    pub fn telegram_api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn telegram_timeout() -> u64 {
        10
    }

    pub fn upstream_offset() -> i32 {
        3
    }

    // Path defaults
    pub fn settings_file() -> String {
        "settings.json".into()
    }
    pub fn history_file() -> String {
        "scan_history.json".into()
    }
    pub fn countries_file() -> String {
        "countries.json".into()
    }
    pub fn locale_file() -> String {
        "locale.toml".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
