// src/cad/types.rs
use anyhow::Result;
use chrono::{DateTime, SecondsFormat};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use std::fmt;

/// Section of the dispatch page an incident was listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Fire,
    Ems,
    Traffic,
    #[default]
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fire => "FIRE",
            Category::Ems => "EMS",
            Category::Traffic => "TRAFFIC",
            Category::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    #[serde(serialize_with = "iso8601")]
    pub timestamp: DateTime<Tz>,
    pub id: String,
    pub location: String,
    pub municipality: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub category: Category,
    pub station: String,
    pub description: String,
    pub raw_timestamp: String,
    pub comments_url: String,
    pub units_on_scene: Vec<String>,
}

impl Incident {
    /// Build an incident from the six positional fields of a dispatch row.
    /// Detail fields (`comments_url`, `units_on_scene`) start empty.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &str,
        incident_type: &str,
        location: &str,
        municipality: &str,
        raw_timestamp: &str,
        station: &str,
        timestamp: DateTime<Tz>,
        category: Category,
    ) -> Self {
        let description =
            format!("{location} | {municipality} | {incident_type} | {category} | Stn {station}");
        Self {
            timestamp,
            id: id.to_string(),
            location: location.to_string(),
            municipality: municipality.to_string(),
            incident_type: incident_type.to_string(),
            category,
            station: station.to_string(),
            description,
            raw_timestamp: raw_timestamp.to_string(),
            comments_url: String::new(),
            units_on_scene: Vec::new(),
        }
    }
}

/// One published snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    #[serde(serialize_with = "iso8601")]
    pub last_update: DateTime<Tz>,
    pub total_incidents: usize,
    pub filtered_incidents: usize,
    pub incidents: Vec<Incident>,
}

impl Payload {
    pub fn new(last_update: DateTime<Tz>, total_incidents: usize, incidents: Vec<Incident>) -> Self {
        Self {
            last_update,
            total_incidents,
            filtered_incidents: incidents.len(),
            incidents,
        }
    }
}

fn iso8601<S: Serializer>(ts: &DateTime<Tz>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, false))
}

/// Source of raw page bodies. Any error means "no content" for that URL.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn sample() -> Incident {
        let ts = New_York.with_ymd_and_hms(2025, 11, 29, 0, 31, 4).unwrap();
        Incident::new(
            "F25065066",
            "FIRE ALARM",
            "LANCASTER AVE & COUNTRY CLUB DR",
            "East Caln Township",
            "11-29-2025 00:31:04",
            "46",
            ts,
            Category::Fire,
        )
    }

    #[test]
    fn description_joins_fields_in_order() {
        assert_eq!(
            sample().description,
            "LANCASTER AVE & COUNTRY CLUB DR | East Caln Township | FIRE ALARM | FIRE | Stn 46"
        );
    }

    #[test]
    fn incident_json_has_expected_fields() {
        let v = serde_json::to_value(sample()).unwrap();
        let obj = v.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "category",
                "comments_url",
                "description",
                "id",
                "location",
                "municipality",
                "raw_timestamp",
                "station",
                "timestamp",
                "type",
                "units_on_scene",
            ]
        );
        assert_eq!(v["timestamp"], "2025-11-29T00:31:04-05:00");
        assert_eq!(v["category"], "FIRE");
        assert_eq!(v["units_on_scene"], serde_json::json!([]));
    }

    #[test]
    fn payload_counts_filtered_incidents() {
        let now = New_York.with_ymd_and_hms(2025, 7, 4, 12, 0, 0).unwrap();
        let p = Payload::new(now, 3, vec![sample()]);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["last_update"], "2025-07-04T12:00:00-04:00");
        assert_eq!(v["total_incidents"], 3);
        assert_eq!(v["filtered_incidents"], 1);
        assert_eq!(v["incidents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn ems_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Category::Ems).unwrap(), "EMS");
        assert_eq!(Category::default(), Category::Unknown);
    }
}
