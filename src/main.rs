//! WebCAD → MQTT bridge — binary entrypoint.
//! Loads configuration, wires the HTTP fetcher and MQTT publisher, and polls forever.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use webcad_mqtt::cad::fetch::HttpFetcher;
use webcad_mqtt::publish::mqtt::MqttPublisher;
use webcad_mqtt::{scheduler, AppConfig};

/// `RUST_LOG` controls verbosity (default `info`); `LOG_FORMAT=json` switches
/// to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env().context("loading configuration")?;

    if let Some(addr) = cfg.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing prometheus exporter")?;
        tracing::info!(%addr, "metrics exporter listening");
    }

    let fetcher = HttpFetcher::new(cfg.http_timeout)?;

    if cfg.run_once {
        let payload = scheduler::dry_run(&fetcher, &cfg).await?;
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let publisher = MqttPublisher::from_config(&cfg.mqtt);
    scheduler::run_forever(&fetcher, &publisher, &cfg).await;
    Ok(())
}
