// src/cad/fetch.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::cad::types::PageFetcher;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; ha-chescofire/1.0)";

/// Plain HTTP GET with a per-request timeout. Non-2xx responses are errors.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        resp.text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// In-memory pages keyed by URL; unknown URLs fail like a 404.
/// Records every requested URL so tests can assert on fetch order.
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(url.to_string());
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture page for {url}"))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
