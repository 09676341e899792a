//! Guarded in-memory history shared by the worker and foreground readers.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::HistoryState;
use crate::storage::HistoryStorage;

/// In-memory history behind an exclusive lock, backed by a persistence layer.
///
/// The in-memory state is authoritative: a failed save is logged and the next
/// successful save writes everything accumulated since.
#[derive(Clone)]
pub struct HistoryStore {
    state: Arc<Mutex<HistoryState>>,
    backend: Arc<dyn HistoryStorage>,
}

impl HistoryStore {
    /// Load persisted history. Never fails: missing or unreadable data yields
    /// an empty state.
    pub async fn open(backend: Arc<dyn HistoryStorage>) -> Self {
        let state = match backend.load_history().await {
            Ok(Some(state)) => {
                log::info!(
                    "Loaded scan history: {} appointments, last scan {}",
                    state.len(),
                    state.last_scan.as_deref().unwrap_or("never")
                );
                state
            }
            Ok(None) => {
                log::info!("No scan history found, starting empty");
                let state = HistoryState::default();
                if let Err(e) = backend.save_history(&state).await {
                    log::error!("Failed to create scan history: {}", e);
                }
                state
            }
            Err(e) => {
                log::warn!("Scan history unreadable ({}), starting empty", e);
                HistoryState::default()
            }
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            backend,
        }
    }

    /// Copy of the current state for display.
    pub async fn snapshot(&self) -> HistoryState {
        self.state.lock().await.clone()
    }

    pub async fn last_scan(&self) -> Option<String> {
        self.state.lock().await.last_scan.clone()
    }

    /// Run a read-modify-write on the state and persist the result, all under
    /// one lock acquisition.
    pub async fn update<R>(&self, mutate: impl FnOnce(&mut HistoryState) -> R) -> R {
        let mut state = self.state.lock().await;
        let out = mutate(&mut *state);
        self.persist(&*state).await;
        out
    }

    /// Save `state`, logging instead of propagating failures.
    async fn persist(&self, state: &HistoryState) -> bool {
        match self.backend.save_history(state).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Error saving scan history: {}", e);
                false
            }
        }
    }
}
