//! Local filesystem storage implementation.
//!
//! Every document is written atomically (temp file, then rename) so a crash
//! mid-write leaves the previous version in place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{HistoryState, PathsConfig, Settings};
use crate::storage::HistoryStorage;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    paths: PathsConfig,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, paths: PathsConfig) -> Self {
        Self {
            root_dir: root_dir.into(),
            paths,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        let persist = |e: std::io::Error| AppError::persistence(path.display().to_string(), e);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(persist)?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await.map_err(persist)?;
        file.write_all(bytes).await.map_err(persist)?;
        file.flush().await.map_err(persist)?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await.map_err(persist)?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load user settings, seeding the file with defaults on first run.
    pub async fn load_settings(&self) -> Result<Settings> {
        match self.read_json(&self.paths.settings_file).await? {
            Some(settings) => Ok(settings),
            None => {
                log::info!(
                    "No {} found, writing defaults",
                    self.paths.settings_file
                );
                let settings = Settings::default();
                if let Err(e) = self.save_settings(&settings).await {
                    log::error!("Failed to seed settings: {}", e);
                }
                Ok(settings)
            }
        }
    }

    /// Persist user settings.
    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write_json(&self.paths.settings_file, settings).await
    }
}

#[async_trait]
impl HistoryStorage for LocalStorage {
    async fn load_history(&self) -> Result<Option<HistoryState>> {
        self.read_json(&self.paths.history_file).await
    }

    async fn save_history(&self, state: &HistoryState) -> Result<()> {
        self.write_json(&self.paths.history_file, state).await
    }
}
