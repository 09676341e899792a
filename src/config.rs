// src/config.rs

//! Configuration loading and component assembly.
//!
//! A storage directory holds `config.toml` next to the user settings, the
//! history and the optional catalog/locale files. [`Workspace`] loads the
//! file-based configuration once and builds the runtime components from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{Config, CountryCatalog, Locale, PollResult, Settings};
use crate::pipeline::Tracker;
use crate::services::{HttpListingSource, Notifier, TelegramSink};
use crate::storage::{HistoryStore, LocalStorage};

/// Runtime configuration file name inside the storage directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Loaded configuration for one storage directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    pub config: Config,
    pub locale: Locale,
    pub countries: CountryCatalog,
    pub storage: LocalStorage,
}

impl Workspace {
    /// Load `config.toml` (falling back to defaults), the locale and the
    /// country catalog, then validate the config.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = Config::load_or_default(root.join(CONFIG_FILE));
        config.validate()?;

        let locale = Locale::load_or_default(config.paths.locale_path(&root));
        let countries = CountryCatalog::load_or_default(config.paths.countries_path(&root));
        let storage = LocalStorage::new(&root, config.paths.clone());

        Ok(Self {
            root,
            config,
            locale,
            countries,
            storage,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current user settings, seeded on first run.
    pub async fn settings(&self) -> Result<Settings> {
        self.storage.load_settings().await
    }

    pub async fn history(&self) -> HistoryStore {
        HistoryStore::open(Arc::new(self.storage.clone())).await
    }

    pub fn listing_source(&self) -> Result<HttpListingSource> {
        HttpListingSource::new(&self.config.api)
    }

    /// Notifier delivering to the chat named in `settings`.
    pub fn notifier(&self, settings: &Settings) -> Result<Notifier> {
        let sink = TelegramSink::new(&self.config.telegram, settings)?;
        Ok(Notifier::new(Arc::new(sink), self.locale.clone()))
    }

    /// Assemble a tracker for `settings` against the live endpoints.
    pub async fn tracker(
        &self,
        settings: Settings,
    ) -> Result<(Tracker, mpsc::UnboundedReceiver<PollResult>)> {
        let source = Arc::new(self.listing_source()?);
        let notifier = Arc::new(self.notifier(&settings)?);
        let history = self.history().await;
        Ok(Tracker::new(
            settings,
            history,
            source,
            notifier,
            self.config.display.clone(),
        ))
    }
}
