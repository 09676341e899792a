//! Output of one poll cycle.

use serde::Serialize;

use crate::models::MatchedAppointment;

/// Either the matched appointments or the reason the cycle failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    Appointments(Vec<MatchedAppointment>),
    Failed(String),
}

/// Point-in-time result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResult {
    /// Local time the cycle ran, display formatted
    pub current_time: String,
    /// `last_scan` as it was before this cycle, `None` on first check
    pub last_check: Option<String>,
    /// Freshest upstream `last_checked`, shown in the configured offset
    pub api_last_checked: Option<String>,
    pub outcome: PollOutcome,
}

impl PollResult {
    /// Result for a cycle that did not complete.
    pub fn failed(
        current_time: String,
        last_check: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            current_time,
            last_check,
            api_last_checked: None,
            outcome: PollOutcome::Failed(message.into()),
        }
    }

    /// Matched appointments, empty for failed cycles.
    pub fn appointments(&self) -> &[MatchedAppointment] {
        match &self.outcome {
            PollOutcome::Appointments(list) => list,
            PollOutcome::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            PollOutcome::Failed(message) => Some(message),
            PollOutcome::Appointments(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }
}
