// src/cad/filter.rs
use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::cad::types::Incident;

/// `true` when the incident was dispatched at or after `now - lookback`.
pub fn is_recent(incident: &Incident, now: DateTime<Tz>, lookback: Duration) -> bool {
    incident.timestamp >= now - lookback
}

pub fn retain_recent(incidents: Vec<Incident>, now: DateTime<Tz>, lookback: Duration) -> Vec<Incident> {
    incidents
        .into_iter()
        .filter(|inc| is_recent(inc, now, lookback))
        .collect()
}

/// Case-sensitive substring match against any configured filter.
pub fn matches_municipality<S: AsRef<str>>(incident: &Incident, filters: &[S]) -> bool {
    filters
        .iter()
        .any(|f| incident.municipality.contains(f.as_ref()))
}

/// Keep incidents in the configured municipalities. No filters → everything passes.
pub fn filter_by_municipality<S: AsRef<str>>(incidents: &[Incident], filters: &[S]) -> Vec<Incident> {
    if filters.is_empty() {
        return incidents.to_vec();
    }
    incidents
        .iter()
        .filter(|inc| matches_municipality(inc, filters))
        .cloned()
        .collect()
}
