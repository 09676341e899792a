//! Diff calculation between a fetched listing and the scan history.
//!
//! Filters the listing to the selected country pair, normalizes each record,
//! and compares it with the last-seen snapshot of the same key. Everything in
//! here is synchronous and free of I/O; the cycle wraps it with fetching and
//! persistence.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::models::{
    AppointmentKey, AppointmentRecord, AppointmentSnapshot, HistoryState, MatchedAppointment,
    Settings,
};
use crate::utils::time::parse_upstream_timestamp;

/// Change in people looking since the previous sighting.
///
/// `None` on first sight or when the count is unchanged.
pub fn people_looking_change(previous: Option<i64>, current: i64) -> Option<i64> {
    previous
        .filter(|&prev| prev != current)
        .map(|prev| current.saturating_sub(prev))
}

/// Snapshot-level form of [`people_looking_change`].
pub fn snapshot_change(
    previous: Option<&AppointmentSnapshot>,
    current: &AppointmentSnapshot,
) -> Option<i64> {
    people_looking_change(previous.map(|p| p.people_looking), current.people_looking)
}

/// Freshest `last_checked` across the whole listing, matched or not.
///
/// Unparseable timestamps are skipped with a warning.
pub fn latest_upstream_update(records: &[AppointmentRecord]) -> Option<DateTime<FixedOffset>> {
    records
        .iter()
        .filter_map(|record| record.last_checked.as_deref())
        .filter_map(|raw| match parse_upstream_timestamp(raw) {
            Ok(ts) => Some(ts),
            Err(e) => {
                log::warn!("Error parsing upstream time: {}", e);
                None
            }
        })
        .max()
}

/// Calculator for one country pair.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    source_country: String,
    mission_country: String,
}

impl DiffEngine {
    pub fn new(source_country: impl Into<String>, mission_country: impl Into<String>) -> Self {
        Self {
            source_country: source_country.into(),
            mission_country: mission_country.into(),
        }
    }

    /// Engine for the pair selected in `settings`.
    pub fn for_settings(settings: &Settings) -> Self {
        Self::new(&settings.source_country, &settings.mission_country)
    }

    /// Filter and normalize the records of the selected pair.
    ///
    /// Records missing a required field never match; records with a bad date
    /// are skipped individually. When a key occurs more than once, the last
    /// occurrence wins. The map's key order is ascending date order.
    pub fn select(
        &self,
        records: &[AppointmentRecord],
    ) -> BTreeMap<AppointmentKey, AppointmentSnapshot> {
        let mut selected = BTreeMap::new();
        for record in records {
            if !record.matches(&self.source_country, &self.mission_country) {
                continue;
            }
            match record.normalize() {
                Ok((key, snapshot)) => {
                    if selected.insert(key, snapshot).is_some() {
                        log::debug!("Duplicate listing entry, keeping the later one");
                    }
                }
                Err(e) => log::error!("Error processing appointment: {}", e),
            }
        }
        selected
    }

    /// Merge `selected` into `state`, stamp the scan time, and report each
    /// appointment with its delta.
    ///
    /// Returns the `last_scan` value from before this call.
    pub fn apply(
        &self,
        state: &mut HistoryState,
        selected: BTreeMap<AppointmentKey, AppointmentSnapshot>,
        scan_time: String,
    ) -> (Option<String>, Vec<MatchedAppointment>) {
        let previous_scan = state.last_scan.replace(scan_time);

        let appointments = selected
            .into_iter()
            .map(|(key, snapshot)| {
                let previous = state.upsert(&key, snapshot.clone());
                MatchedAppointment {
                    people_looking_change: people_looking_change(previous, snapshot.people_looking),
                    key,
                    snapshot,
                }
            })
            .collect();

        (previous_scan, appointments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: &str, mission: &str, date: &str, people: i64) -> AppointmentRecord {
        AppointmentRecord {
            source_country: Some(source.into()),
            mission_country: Some(mission.into()),
            appointment_date: Some(date.into()),
            people_looking: Some(people),
            ..Default::default()
        }
    }

    fn engine() -> DiffEngine {
        DiffEngine::new("Turkey", "Germany")
    }

    #[test]
    fn test_people_looking_change() {
        assert_eq!(people_looking_change(None, 12), None);
        assert_eq!(people_looking_change(Some(12), 12), None);
        assert_eq!(people_looking_change(Some(12), 20), Some(8));
        assert_eq!(people_looking_change(Some(20), 5), Some(-15));
        assert_eq!(people_looking_change(Some(-1), i64::MAX), Some(i64::MAX));
        assert_eq!(people_looking_change(Some(1), i64::MIN), Some(i64::MIN));
    }

    #[test]
    fn test_snapshot_change() {
        let (_, old) = record("Turkey", "Germany", "2024-05-01", 3).normalize().unwrap();
        let (_, new) = record("Turkey", "Germany", "2024-05-01", 4).normalize().unwrap();
        assert_eq!(snapshot_change(Some(&old), &new), Some(1));
        assert_eq!(snapshot_change(None, &new), None);
    }

    #[test]
    fn test_latest_upstream_update_scans_everything() {
        let mut matching = record("Turkey", "Germany", "2024-05-01", 1);
        matching.last_checked = Some("2024-05-01T08:00:00Z".into());
        let mut other = record("Spain", "France", "2024-05-01", 1);
        other.last_checked = Some("2024-05-01T09:30:00Z".into());
        let mut broken = AppointmentRecord::default();
        broken.last_checked = Some("garbage".into());

        let latest = latest_upstream_update(&[matching, broken, other]).unwrap();
        assert_eq!(latest.to_rfc3339(), "2024-05-01T09:30:00+00:00");
    }

    #[test]
    fn test_latest_upstream_update_none() {
        assert!(latest_upstream_update(&[record("Turkey", "Germany", "2024-05-01", 1)]).is_none());
    }

    #[test]
    fn test_select_filters_pair_and_drops_malformed() {
        let mut missing_date = record("Turkey", "Germany", "", 1);
        missing_date.appointment_date = None;
        let records = vec![
            missing_date,
            record("Turkey", "France", "2024-05-02", 1),
            record("Turkey", "Germany", "not-a-date", 1),
            record("Turkey", "Germany", "2024-06-01T10:00:00+03:00", 2),
            record("Turkey", "Germany", "2024-05-01", 3),
        ];

        let selected = engine().select(&records);
        let dates: Vec<String> = selected.values().map(|s| s.date.clone()).collect();
        assert_eq!(dates, vec!["01.05.2024", "01.06.2024"]);
        assert!(
            selected
                .keys()
                .all(|k| k.source_country == "Turkey" && k.mission_country == "Germany")
        );
    }

    #[test]
    fn test_select_last_duplicate_wins() {
        let records = vec![
            record("Turkey", "Germany", "2024-05-01", 3),
            record("Turkey", "Germany", "2024-05-01T12:00:00Z", 9),
        ];
        let selected = engine().select(&records);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.values().next().unwrap().people_looking, 9);
    }

    #[test]
    fn test_apply_first_sight_then_change() {
        let engine = engine();
        let mut state = HistoryState::default();

        let first = engine.select(&[record("Turkey", "Germany", "2024-05-01T00:00:00Z", 12)]);
        let (previous, matched) = engine.apply(&mut state, first, "t1".into());
        assert_eq!(previous, None);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].snapshot.date, "01.05.2024");
        assert_eq!(matched[0].snapshot.people_looking, 12);
        assert_eq!(matched[0].people_looking_change, None);

        let second = engine.select(&[record("Turkey", "Germany", "2024-05-01T00:00:00Z", 20)]);
        let (previous, matched) = engine.apply(&mut state, second, "t2".into());
        assert_eq!(previous.as_deref(), Some("t1"));
        assert_eq!(matched[0].people_looking_change, Some(8));
        assert_eq!(state.last_scan.as_deref(), Some("t2"));
        assert_eq!(
            state.appointments["Turkey_Germany_2024-05-01"].people_looking,
            20
        );
    }

    #[test]
    fn test_apply_unchanged_listing_has_no_changes() {
        let engine = engine();
        let mut state = HistoryState::default();
        let records = vec![
            record("Turkey", "Germany", "2024-05-01", 12),
            record("Turkey", "Germany", "2024-05-03", 4),
        ];

        engine.apply(&mut state, engine.select(&records), "t1".into());
        let (_, matched) = engine.apply(&mut state, engine.select(&records), "t1".into());

        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|m| m.people_looking_change.is_none()));
    }

    #[test]
    fn test_apply_keeps_unseen_keys() {
        let engine = engine();
        let mut state = HistoryState::default();
        engine.apply(
            &mut state,
            engine.select(&[record("Turkey", "Germany", "2024-05-01", 1)]),
            "t1".into(),
        );
        let (_, matched) = engine.apply(&mut state, BTreeMap::new(), "t2".into());

        assert!(matched.is_empty());
        assert_eq!(state.len(), 1);
    }
}
