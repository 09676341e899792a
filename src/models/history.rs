//! Persisted scan history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{AppointmentKey, AppointmentSnapshot};

/// Last scan time plus the last-seen snapshot of every key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    /// Display-formatted time of the last successful cycle, `None` if never
    #[serde(default)]
    pub last_scan: Option<String>,

    /// Snapshots keyed by `source_mission_YYYY-MM-DD`
    #[serde(default)]
    pub appointments: BTreeMap<String, AppointmentSnapshot>,
}

impl HistoryState {
    /// Store `snapshot` under `key`, returning the previous people-looking
    /// count if the key was already known.
    pub fn upsert(&mut self, key: &AppointmentKey, snapshot: AppointmentSnapshot) -> Option<i64> {
        self.appointments
            .insert(key.storage_key(), snapshot)
            .map(|previous| previous.people_looking)
    }

    pub fn get(&self, key: &AppointmentKey) -> Option<&AppointmentSnapshot> {
        self.appointments.get(&key.storage_key())
    }

    /// Snapshots recorded for one country pair, in ascending date order.
    pub fn for_pair<'a>(
        &'a self,
        source_country: &'a str,
        mission_country: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a AppointmentSnapshot)> + 'a {
        let prefix = format!("{source_country}_{mission_country}_");
        // ISO dates sort lexically, so map order is date order within a pair.
        self.appointments
            .iter()
            .filter(move |(key, _)| {
                key.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| !rest.contains('_'))
            })
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }
}
