// src/pipeline/cycle.rs

//! One poll cycle: fetch → filter → diff → persist.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};
use futures::FutureExt;

use crate::error::Result;
use crate::models::{DisplayConfig, PollOutcome, PollResult, Settings};
use crate::pipeline::diff::{DiffEngine, latest_upstream_update};
use crate::services::ListingSource;
use crate::storage::HistoryStore;
use crate::utils::time::{format_timestamp, offset_hours};

/// A configured cycle, run once per scheduler tick.
pub struct PollCycle {
    source: Arc<dyn ListingSource>,
    history: HistoryStore,
    engine: DiffEngine,
    upstream_offset: FixedOffset,
}

impl PollCycle {
    pub fn new(
        source: Arc<dyn ListingSource>,
        history: HistoryStore,
        settings: &Settings,
        display: &DisplayConfig,
    ) -> Result<Self> {
        Ok(Self {
            source,
            history,
            engine: DiffEngine::for_settings(settings),
            upstream_offset: offset_hours(display.upstream_utc_offset_hours)?,
        })
    }

    /// Run a cycle now. Never fails: errors and panics become an error result.
    pub async fn run(&self) -> PollResult {
        let now = Local::now();
        match AssertUnwindSafe(self.run_at(now)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                log::error!("Error checking appointments: {}", e);
                self.failed(now, e.to_string()).await
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("Appointment check panicked: {}", message);
                self.failed(now, message).await
            }
        }
    }

    /// Run a cycle as of `now`, propagating errors.
    pub async fn run_at(&self, now: DateTime<Local>) -> Result<PollResult> {
        let current_time = format_timestamp(&now);
        let listing = self.source.fetch().await?;

        let api_last_checked = latest_upstream_update(&listing.records)
            .map(|ts| format_timestamp(&ts.with_timezone(&self.upstream_offset)));

        let selected = self.engine.select(&listing.records);
        let scan_time = current_time.clone();
        let (last_check, appointments) = self
            .history
            .update(|state| self.engine.apply(state, selected, scan_time))
            .await;

        log::info!(
            "Check complete: {} matching appointments ({} listed, {} rejected)",
            appointments.len(),
            listing.records.len(),
            listing.rejected
        );

        Ok(PollResult {
            current_time,
            last_check,
            api_last_checked,
            outcome: PollOutcome::Appointments(appointments),
        })
    }

    async fn failed(&self, now: DateTime<Local>, message: String) -> PollResult {
        PollResult::failed(format_timestamp(&now), self.history.last_scan().await, message)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}
