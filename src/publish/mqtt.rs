// src/publish/mqtt.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{BusSession, Publisher};
use crate::config::MqttConfig;

const KEEP_ALIVE: Duration = Duration::from_secs(60);
/// Snapshots with many incidents easily exceed rumqttc's 10 KiB default.
const MAX_PACKET_BYTES: usize = 256 * 1024;

#[derive(Clone)]
pub struct MqttPublisher {
    options: MqttOptions,
    timeout: Duration,
}

impl MqttPublisher {
    pub fn from_config(cfg: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(cfg.client_id.clone(), cfg.host.clone(), cfg.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_max_packet_size(MAX_PACKET_BYTES, MAX_PACKET_BYTES);
        if !cfg.username.is_empty() {
            options.set_credentials(cfg.username.clone(), cfg.password.clone());
        }
        Self {
            options,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Override the keepalive interval (at least one second).
    pub fn with_keep_alive(mut self, secs: u64) -> Self {
        self.options.set_keep_alive(Duration::from_secs(secs.max(1)));
        self
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn connect(&self) -> Result<Box<dyn BusSession>> {
        let (client, eventloop) = AsyncClient::new(self.options.clone(), 10);
        let (host, port) = self.options.broker_address();
        let (tx, events) = mpsc::unbounded_channel();

        let mut session = MqttSession {
            client,
            events,
            driver: spawn_driver(eventloop, tx),
            timeout: self.timeout,
        };
        session
            .wait_for(|ev| matches!(ev, Event::Incoming(Packet::ConnAck(_))))
            .await
            .with_context(|| format!("mqtt connect to {host}:{port}"))?;
        tracing::debug!(%host, port, "mqtt connected");

        Ok(Box::new(session))
    }
}

/// An open broker connection. The event loop runs in a task owned by the
/// session, so keepalive pings keep flowing while the caller scrapes.
pub struct MqttSession {
    client: AsyncClient,
    events: mpsc::UnboundedReceiver<Result<Event>>,
    driver: JoinHandle<()>,
    timeout: Duration,
}

impl MqttSession {
    /// Wait until `done` matches an event, the connection fails, or the
    /// session timeout elapses.
    async fn wait_for<F>(&mut self, done: F) -> Result<()>
    where
        F: Fn(&Event) -> bool + Send,
    {
        let limit = self.timeout;
        let events = &mut self.events;
        tokio::time::timeout(limit, async {
            while let Some(ev) = events.recv().await {
                if done(&ev?) {
                    return Ok::<(), anyhow::Error>(());
                }
            }
            Err(anyhow!("mqtt event loop stopped"))
        })
        .await
        .map_err(|_| anyhow!("timed out after {limit:?}"))?
    }
}

impl Drop for MqttSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[async_trait]
impl BusSession for MqttSession {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .await
            .context("mqtt publish request")?;
        self.wait_for(|ev| matches!(ev, Event::Incoming(Packet::PubAck(_))))
            .await
            .with_context(|| format!("mqtt publish to {topic}"))
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .context("mqtt disconnect request")?;
        self.wait_for(|ev| matches!(ev, Event::Outgoing(Outgoing::Disconnect)))
            .await
            .context("mqtt disconnect")
    }
}

/// Poll the event loop until the connection fails or a disconnect goes out,
/// forwarding every event to the session. The first error ends the task.
fn spawn_driver(
    mut eventloop: EventLoop,
    tx: mpsc::UnboundedSender<Result<Event>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(ev) => {
                    tracing::trace!(?ev, "mqtt event");
                    let last = matches!(ev, Event::Outgoing(Outgoing::Disconnect));
                    if tx.send(Ok(ev)).is_err() || last {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(anyhow!("mqtt connection: {e}")));
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_broker_fails_fast() {
        // Nothing listens on the discard port.
        let cfg = MqttConfig {
            host: "127.0.0.1".into(),
            port: 9,
            username: String::new(),
            password: String::new(),
            client_id: "webcad-mqtt-test".into(),
            topic: "t".into(),
        };
        let publisher = MqttPublisher::from_config(&cfg).with_timeout(2);
        assert!(publisher.connect().await.is_err());
    }
}
