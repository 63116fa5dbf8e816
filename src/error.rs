// src/error.rs
//! Error taxonomy for a harvest run.
//!
//! Only [`ConfigError`] and store failures abort a run. Fetch and extraction
//! failures are per-source and end up in the run summary; notifier failures
//! are logged and reported but never fail the run.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed or missing configuration. Fatal, raised before any fetch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Per-source retrieval failure. Recoverable: the source is skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },
    #[error("connection error for {url}: {message}")]
    Connection { url: String, message: String },
    #[error("unreadable body from {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// Map a transport error into the taxonomy; never yields an unclassified error.
    pub fn from_reqwest(url: &str, e: &reqwest::Error) -> Self {
        let url = url.to_string();
        if e.is_timeout() {
            FetchError::Timeout { url }
        } else if let Some(status) = e.status() {
            FetchError::Http {
                url,
                status: status.as_u16(),
            }
        } else if e.is_body() || e.is_decode() {
            FetchError::Body {
                url,
                message: e.to_string(),
            }
        } else {
            FetchError::Connection {
                url,
                message: e.to_string(),
            }
        }
    }
}

/// Extraction failure, either for a whole payload or a single item.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("malformed {format} payload: {message}")]
    MalformedPayload {
        format: &'static str,
        message: String,
    },
    #[error("skipped item: {0}")]
    MalformedItem(String),
}

/// A source fetched fine but yielded zero usable items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("source `{source_id}` yielded no extractable items")]
pub struct EmptyExtractionWarning {
    pub source_id: String,
}

/// The persisted dataset could not be read.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// The merge batch could not be persisted; nothing was written.
#[derive(Debug, Error)]
#[error("store commit to {path} failed: {message}")]
pub struct StoreCommitError {
    pub path: PathBuf,
    pub message: String,
}

/// Digest delivery failure. Never fatal.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifier not configured: {0}")]
    NotConfigured(String),
    #[error("cannot build message: {0}")]
    Build(String),
    #[error("send failed: {0}")]
    Send(String),
}

/// Errors that abort a run with non-zero status.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    StoreLoad(#[from] StoreError),
    #[error(transparent)]
    StoreCommit(#[from] StoreCommitError),
}

impl PipelineError {
    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Config(_) => 2,
            PipelineError::StoreLoad(_) | PipelineError::StoreCommit(_) => 3,
        }
    }
}
