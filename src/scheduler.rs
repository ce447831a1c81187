// src/scheduler.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use metrics::{counter, gauge};

use crate::cad::{self, types::PageFetcher, types::Payload};
use crate::config::AppConfig;
use crate::publish::Publisher;

/// One poll cycle: connect to the bus, scrape, publish the snapshot, disconnect.
///
/// A failed connect skips the cycle before anything is fetched. A failed
/// dispatch page fetch publishes nothing, so the retained snapshot from the
/// last good cycle stays in place.
pub async fn run_cycle(
    fetcher: &dyn PageFetcher,
    publisher: &dyn Publisher,
    cfg: &AppConfig,
    now: DateTime<Tz>,
) -> Result<Payload> {
    let mut session = match publisher.connect().await {
        Ok(session) => session,
        Err(e) => {
            counter!("cad_publish_errors_total").increment(1);
            return Err(e).context("connecting to broker");
        }
    };

    let payload = match cad::run_once(fetcher, cfg, now).await {
        Ok(payload) => payload,
        Err(e) => {
            if let Err(de) = session.disconnect().await {
                tracing::debug!("mqtt disconnect after failed scrape: {de:#}");
            }
            return Err(e).context("scraping dispatch page");
        }
    };

    let body = serde_json::to_vec(&payload).context("serializing snapshot")?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        if let Ok(pretty) = serde_json::to_string_pretty(&payload) {
            tracing::debug!("snapshot:\n{pretty}");
        }
    }

    if let Err(e) = session.publish(&cfg.mqtt.topic, body).await {
        counter!("cad_publish_errors_total").increment(1);
        return Err(e).context("publishing snapshot");
    }
    gauge!("cad_last_publish_ts").set(Utc::now().timestamp() as f64);

    if let Err(e) = session.disconnect().await {
        tracing::warn!("mqtt disconnect: {e:#}");
    }

    tracing::info!(
        target: "cad",
        topic = %cfg.mqtt.topic,
        total = payload.total_incidents,
        filtered = payload.filtered_incidents,
        "published snapshot"
    );
    Ok(payload)
}

/// Scrape once and return the snapshot without touching the bus.
pub async fn dry_run(fetcher: &dyn PageFetcher, cfg: &AppConfig) -> Result<Payload> {
    cad::run_once(fetcher, cfg, cad::now_local()).await
}

/// Poll forever with a fixed sleep between cycles. Cycle errors are logged and
/// never stop the loop.
pub async fn run_forever(fetcher: &dyn PageFetcher, publisher: &dyn Publisher, cfg: &AppConfig) {
    tracing::info!(
        url = %cfg.webcad_url,
        topic = %cfg.mqtt.topic,
        interval_secs = cfg.poll_interval.as_secs(),
        filters = ?cfg.filters,
        "starting poll loop"
    );
    loop {
        if let Err(e) = run_cycle(fetcher, publisher, cfg, cad::now_local()).await {
            counter!("cad_cycles_failed_total").increment(1);
            tracing::warn!("poll cycle failed, retrying after delay: {e:#}");
        }
        tokio::time::sleep(cfg.poll_interval).await;
    }
}
