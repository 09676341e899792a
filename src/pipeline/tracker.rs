// src/pipeline/tracker.rs

//! Tracking controller: owns the settings, the scheduler and the wiring
//! between a cycle, the notifier and the result display.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{AppError, Result};
use crate::models::{DisplayConfig, PollResult, Settings};
use crate::pipeline::cycle::PollCycle;
use crate::pipeline::scheduler::PollScheduler;
use crate::services::{ListingSource, Notifier};
use crate::storage::HistoryStore;

/// Start/stop controller for one tracking session at a time.
///
/// Every result is dispatched through the [`Notifier`] and then forwarded to
/// the receiver returned by [`Tracker::new`]. Settings are frozen while a
/// session is running.
pub struct Tracker {
    settings: Settings,
    history: HistoryStore,
    source: Arc<dyn ListingSource>,
    notifier: Arc<Notifier>,
    display: DisplayConfig,
    scheduler: PollScheduler,
    results: mpsc::UnboundedSender<PollResult>,
    tracking: bool,
}

impl Tracker {
    pub fn new(
        settings: Settings,
        history: HistoryStore,
        source: Arc<dyn ListingSource>,
        notifier: Arc<Notifier>,
        display: DisplayConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PollResult>) {
        let (results, receiver) = mpsc::unbounded_channel();
        let tracker = Self {
            scheduler: PollScheduler::new(settings.interval()),
            settings,
            history,
            source,
            notifier,
            display,
            results,
            tracking: false,
        };
        (tracker, receiver)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Whether the user wants tracking on, regardless of worker health.
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Replace the settings. Rejected while tracking.
    ///
    /// The notifier's sink keeps the credentials it was built with.
    pub fn update_settings(&mut self, settings: Settings) -> Result<()> {
        if self.tracking {
            return Err(AppError::validation(
                "settings cannot be changed while tracking",
            ));
        }
        settings.validate()?;
        self.scheduler.set_interval(settings.interval());
        self.settings = settings;
        Ok(())
    }

    /// Start polling with the current settings.
    ///
    /// Returns `Ok(false)` when a session is already running.
    pub fn start_tracking(&mut self) -> Result<bool> {
        if !self.settings.has_selection() {
            return Err(AppError::validation(
                "select a source and mission country first",
            ));
        }
        if self.scheduler.is_running() {
            log::warn!("Tracking is already running");
            return Ok(false);
        }

        let cycle = Arc::new(PollCycle::new(
            Arc::clone(&self.source),
            self.history.clone(),
            &self.settings,
            &self.display,
        )?);
        let notifier = Arc::clone(&self.notifier);
        let settings = Arc::new(self.settings.clone());
        let results = self.results.clone();

        self.scheduler.set_interval(self.settings.interval());
        self.scheduler.start(move || {
            let cycle = Arc::clone(&cycle);
            let notifier = Arc::clone(&notifier);
            let settings = Arc::clone(&settings);
            let results = results.clone();
            async move {
                let result = cycle.run().await;
                notifier.dispatch(&result, &settings).await;
                if results.send(result).is_err() {
                    log::debug!("No result listener attached");
                }
            }
        });
        self.tracking = true;

        log::info!(
            "Tracking started: {} -> {}, every {}s",
            self.settings.source_country,
            self.settings.mission_country,
            self.settings.interval().as_secs()
        );
        Ok(true)
    }

    /// Stop polling and wait for the worker to finish its current cycle.
    pub async fn stop_tracking(&mut self) {
        if !self.tracking && !self.scheduler.is_running() {
            return;
        }
        self.tracking = false;
        self.scheduler.stop().await;
        log::info!("Tracking stopped");
    }

    /// Restart the worker if it died while tracking is wanted.
    ///
    /// Returns whether a restart happened.
    pub async fn supervise(&mut self) -> Result<bool> {
        if !self.tracking || !self.scheduler.has_terminated() {
            return Ok(false);
        }
        log::warn!("Tracking worker terminated unexpectedly, restarting");
        self.stop_tracking().await;
        self.start_tracking()
    }
}
