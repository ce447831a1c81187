// src/cad/mod.rs
pub mod fetch;
pub mod filter;
pub mod links;
pub mod scanner;
pub mod tokenize;
pub mod types;
pub mod units;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use url::Url;

use crate::cad::links::CommentLinks;
use crate::cad::types::{Incident, PageFetcher, Payload};
use crate::config::AppConfig;

/// Civil timezone of the dispatch center. Page timestamps carry no zone and are
/// read in this one.
pub const CAD_TIMEZONE: Tz = chrono_tz::America::New_York;

pub fn now_local() -> DateTime<Tz> {
    Utc::now().with_timezone(&CAD_TIMEZONE)
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("cad_cycles_total", "Poll cycles run.");
        describe_counter!(
            "cad_fetch_errors_total",
            "Failed page fetches, labelled by page (primary/comments)."
        );
        describe_counter!(
            "cad_incidents_parsed_total",
            "Valid incident blocks found on the dispatch page."
        );
        describe_counter!(
            "cad_blocks_dropped_total",
            "Incident blocks dropped for a bad dispatch time."
        );
        describe_counter!("cad_publish_errors_total", "Failed broker connects/publishes.");
        describe_counter!(
            "cad_cycles_failed_total",
            "Poll cycles that published nothing."
        );
        describe_histogram!("cad_cycle_ms", "Fetch + parse time per cycle in milliseconds.");
        describe_gauge!("cad_last_publish_ts", "Unix ts of the last published snapshot.");
    });
}

/// Log the first `n` lines of a fetched page; upstream format drift shows up here first.
pub(crate) fn log_head(page: &str, url: &str, lines: &[String], n: usize) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    tracing::debug!(page, url, total = lines.len(), "first lines of page");
    for (i, line) in lines.iter().take(n).enumerate() {
        tracing::debug!(page, "{i:02}: {line:?}");
    }
}

/// Fetch the dispatch page and return every recent incident with its
/// comments link and on-scene units resolved. A failed dispatch page fetch
/// fails the whole pass; a failed comments page only empties that incident's units.
pub async fn collect_incidents(
    fetcher: &dyn PageFetcher,
    page_url: &Url,
    now: DateTime<Tz>,
    lookback: Duration,
) -> Result<Vec<Incident>> {
    let html = match fetcher.fetch(page_url.as_str()).await {
        Ok(body) => body,
        Err(e) => {
            counter!("cad_fetch_errors_total", "page" => "primary").increment(1);
            return Err(e).with_context(|| {
                format!("fetching dispatch page {page_url} via {}", fetcher.name())
            });
        }
    };

    let lines = tokenize::text_lines(&html);
    log_head("primary", page_url.as_str(), &lines, 40);

    let links = CommentLinks::from_html(&html, page_url);
    let report = scanner::scan(&lines);
    counter!("cad_incidents_parsed_total").increment(report.incidents.len() as u64);
    counter!("cad_blocks_dropped_total").increment(report.malformed as u64);

    let parsed = report.incidents.len();
    let mut incidents = filter::retain_recent(report.incidents, now, lookback);
    tracing::debug!(
        parsed,
        recent = incidents.len(),
        malformed = report.malformed,
        links = links.len(),
        "scanned dispatch page"
    );

    // One comments request at a time.
    for incident in incidents.iter_mut() {
        incident.comments_url = links.url_for(&incident.id);
        incident.units_on_scene = units::units_on_scene(fetcher, &incident.comments_url).await;
    }

    Ok(incidents)
}

/// Run one full extraction pass and assemble the snapshot for `now`.
pub async fn run_once(
    fetcher: &dyn PageFetcher,
    cfg: &AppConfig,
    now: DateTime<Tz>,
) -> Result<Payload> {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let all = collect_incidents(fetcher, &cfg.webcad_url, now, cfg.lookback()).await?;
    let mine = filter::filter_by_municipality(&all, &cfg.filters);

    counter!("cad_cycles_total").increment(1);
    histogram!("cad_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    Ok(Payload::new(now, all.len(), mine))
}
