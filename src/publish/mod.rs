// src/publish/mod.rs
pub mod mqtt;

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

/// A message bus the snapshot is pushed to. A connection is opened per cycle.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn BusSession>>;
}

/// An open connection to the bus.
#[async_trait::async_trait]
pub trait BusSession: Send {
    /// Publish `payload` as the retained message on `topic`.
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<()>;
    async fn disconnect(&mut self) -> Result<()>;
}

// --- Test helper ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Records publishes in memory; optionally refuses to connect.
#[derive(Default)]
pub struct MockPublisher {
    pub published: Arc<Mutex<Vec<Published>>>,
    pub refuse_connect: bool,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self {
            refuse_connect: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<Published> {
        self.published.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Publisher for MockPublisher {
    async fn connect(&self) -> Result<Box<dyn BusSession>> {
        if self.refuse_connect {
            return Err(anyhow!("connection refused"));
        }
        Ok(Box::new(MockSession {
            published: Arc::clone(&self.published),
        }))
    }
}

struct MockSession {
    published: Arc<Mutex<Vec<Published>>>,
}

#[async_trait::async_trait]
impl BusSession for MockSession {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.published
            .lock()
            .map_err(|_| anyhow!("mock publisher poisoned"))?
            .push(Published {
                topic: topic.to_string(),
                payload,
            });
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}
