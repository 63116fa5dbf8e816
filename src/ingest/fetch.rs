// src/ingest/fetch.rs
//! HTTP fetcher plus an in-memory fixture source used by tests and dry runs.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::{RunSettings, SourceDescriptor};
use crate::error::FetchError;
use crate::ingest::types::ContentSource;

pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Connection {
                url: String::new(),
                message: format!("building http client: {e}"),
            })?;
        Ok(Self { client, timeout })
    }

    pub fn from_settings(run: &RunSettings) -> Result<Self, FetchError> {
        Self::new(&run.user_agent, run.timeout_seconds)
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let t0 = std::time::Instant::now();
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("harvest_fetch_ms").record(ms);
        debug!(%url, bytes = body.len(), ms, "fetched");
        Ok(body)
    }
}

#[async_trait]
impl ContentSource for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(source = %source.id))]
    async fn fetch(&self, source: &SourceDescriptor) -> Result<String, FetchError> {
        match self.get_text(&source.url).await {
            Ok(body) => Ok(body),
            Err(e) => {
                warn!(error = %e, source = %source.id, "source fetch failed");
                Err(e)
            }
        }
    }

    async fn fetch_url(&self, url: &str) -> Result<String, FetchError> {
        self.get_text(url).await
    }
}

/// Canned payloads keyed by source id (and by URL for detail pages).
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    by_source: HashMap<String, Result<String, FetchError>>,
    by_url: HashMap<String, String>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(mut self, source_id: &str, body: &str) -> Self {
        self.by_source
            .insert(source_id.to_string(), Ok(body.to_string()));
        self
    }

    pub fn with_failure(mut self, source_id: &str, err: FetchError) -> Self {
        self.by_source.insert(source_id.to_string(), Err(err));
        self
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.by_url.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl ContentSource for FixtureSource {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<String, FetchError> {
        match self.by_source.get(&source.id) {
            Some(r) => r.clone(),
            None => Err(FetchError::Connection {
                url: source.url.clone(),
                message: "no fixture registered".into(),
            }),
        }
    }

    async fn fetch_url(&self, url: &str) -> Result<String, FetchError> {
        self.by_url.get(url).cloned().ok_or_else(|| FetchError::Http {
            url: url.to_string(),
            status: 404,
        })
    }
}
