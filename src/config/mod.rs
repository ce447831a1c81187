// src/config/mod.rs
use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_WEBCAD_URL: &str = "https://webcad.chesco.org/WebCad/webcad.asp";
pub const DEFAULT_TOPIC: &str = "chesco/cad/official_summary";
pub const DEFAULT_CLIENT_ID: &str = "chesco_cad_official";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    /// Credentials are only sent when this is non-empty.
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub topic: String,
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub webcad_url: Url,
    /// Municipality substrings; empty means publish everything.
    pub filters: Vec<String>,
    pub lookback_hours: u32,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub mqtt: MqttConfig,
    pub metrics_addr: Option<SocketAddr>,
    pub run_once: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing or blank keys take defaults;
    /// present but unparsable values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let webcad_url = get("WEBCAD_URL").unwrap_or_else(|| DEFAULT_WEBCAD_URL.to_string());
        let webcad_url =
            Url::parse(&webcad_url).with_context(|| format!("WEBCAD_URL is not a valid URL: {webcad_url}"))?;

        let filters = get("TARGET_FILTERS")
            .map(|raw| parse_filter_list(&raw))
            .unwrap_or_default();

        let lookback_hours = parse_or(get("LOOKBACK_HOURS"), "LOOKBACK_HOURS", 8u32)?;
        let poll_secs = parse_or(get("POLL_INTERVAL"), "POLL_INTERVAL", 60u64)?;
        if poll_secs == 0 {
            bail!("POLL_INTERVAL must be at least 1 second");
        }
        let timeout_secs = parse_or(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", 30u64)?;

        let mqtt = MqttConfig {
            host: get("MQTT_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(get("MQTT_PORT"), "MQTT_PORT", 1883u16)?,
            username: get("MQTT_USERNAME").unwrap_or_default(),
            password: lookup("MQTT_PASSWORD").unwrap_or_default(),
            client_id: get("MQTT_CLIENT_ID").unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            topic: get("MQTT_TOPIC").unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
        };

        let metrics_addr = get("METRICS_ADDR")
            .map(|v| v.parse::<SocketAddr>().with_context(|| format!("METRICS_ADDR: {v}")))
            .transpose()?;

        let run_once = get("RUN_ONCE").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        Ok(Self {
            webcad_url,
            filters,
            lookback_hours,
            poll_interval: Duration::from_secs(poll_secs),
            http_timeout: Duration::from_secs(timeout_secs),
            mqtt,
            metrics_addr,
            run_once,
        })
    }

    /// Recency window as a chrono duration.
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.lookback_hours))
    }
}

/// Split a comma-separated `TARGET_FILTERS` value. Entries are trimmed, empty
/// ones dropped, and repeats collapsed; order is kept as written.
pub fn parse_filter_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !out.iter().any(|seen| seen == part) {
            out.push(part.to_string());
        }
    }
    out
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v.parse().with_context(|| format!("{key} must be a number, got {v:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_match_the_county_feed() {
        let cfg = from_map(&[]).unwrap();
        assert_eq!(cfg.webcad_url.as_str(), DEFAULT_WEBCAD_URL);
        assert!(cfg.filters.is_empty());
        assert_eq!(cfg.lookback(), chrono::Duration::hours(8));
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
        assert_eq!(cfg.mqtt.host, "localhost");
        assert_eq!(cfg.mqtt.port, 1883);
        assert_eq!(cfg.mqtt.topic, DEFAULT_TOPIC);
        assert_eq!(cfg.mqtt.client_id, DEFAULT_CLIENT_ID);
        assert!(cfg.mqtt.username.is_empty());
        assert!(cfg.metrics_addr.is_none());
        assert!(!cfg.run_once);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = from_map(&[
            ("TARGET_FILTERS", "East Caln, Downingtown"),
            ("MQTT_HOST", "broker.lan"),
            ("MQTT_PORT", "8883"),
            ("MQTT_USERNAME", "ha"),
            ("MQTT_PASSWORD", "s3cret"),
            ("MQTT_TOPIC", "cad/summary"),
            ("POLL_INTERVAL", "15"),
            ("METRICS_ADDR", "127.0.0.1:9100"),
            ("RUN_ONCE", "1"),
        ])
        .unwrap();
        assert_eq!(cfg.filters, vec!["East Caln".to_string(), "Downingtown".to_string()]);
        assert_eq!(cfg.mqtt.host, "broker.lan");
        assert_eq!(cfg.mqtt.port, 8883);
        assert_eq!(cfg.mqtt.username, "ha");
        assert_eq!(cfg.mqtt.password, "s3cret");
        assert_eq!(cfg.mqtt.topic, "cad/summary");
        assert_eq!(cfg.poll_interval, Duration::from_secs(15));
        assert_eq!(cfg.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
        assert!(cfg.run_once);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = from_map(&[("MQTT_PORT", "eighteen")]).unwrap_err();
        assert!(format!("{err:#}").contains("MQTT_PORT"));
        assert!(from_map(&[("POLL_INTERVAL", "-5")]).is_err());
        assert!(from_map(&[("WEBCAD_URL", "not a url")]).is_err());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = from_map(&[("POLL_INTERVAL", "0")]).unwrap_err();
        assert!(err.to_string().contains("POLL_INTERVAL"));
        assert!(from_map(&[("POLL_INTERVAL", "1")]).is_ok());
    }

    #[test]
    fn filter_list_keeps_written_order() {
        assert_eq!(
            parse_filter_list(" West Chester , ,East Caln,West Chester"),
            vec!["West Chester".to_string(), "East Caln".to_string()]
        );
        assert!(parse_filter_list("").is_empty());
        assert!(parse_filter_list(" , ").is_empty());
    }
}
