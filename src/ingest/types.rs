// src/ingest/types.rs
use chrono::NaiveDate;

use crate::config::SourceDescriptor;
use crate::error::FetchError;

/// One item extracted from a source during a cycle. Discarded after merge.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CandidateRecord {
    pub source_id: String,
    pub title: String,
    pub link: String, // may be empty; identity then falls back to title+date
    pub published_date: Option<NaiveDate>,
    pub raw_description: String,
}

/// Item fields as located in the payload, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
}

/// Anything that can hand back a source's raw payload.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<String, FetchError>;

    /// Fetch an arbitrary page (item detail pages for `follow_links`).
    async fn fetch_url(&self, url: &str) -> Result<String, FetchError>;
}
