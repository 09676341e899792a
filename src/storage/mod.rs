//! Storage abstractions for scan history and settings.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Runtime configuration
//! ├── settings.json         # User settings (credentials, country pair, cadence)
//! ├── scan_history.json     # Last scan time + last-seen snapshot per appointment
//! ├── countries.json        # Optional country pair catalog
//! └── locale.toml           # Optional report wording
//! ```

mod history;
pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::HistoryState;

// Re-export for convenience
pub use history::HistoryStore;
pub use local::LocalStorage;

/// Trait for history persistence backends.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Load the persisted history, `None` when nothing was saved yet.
    async fn load_history(&self) -> Result<Option<HistoryState>>;

    /// Replace the persisted history with `state`.
    async fn save_history(&self, state: &HistoryState) -> Result<()>;
}
