// src/config/settings.rs
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_TIMEOUT_SECS: &str = "CONVOCATORIAS_TIMEOUT_SECS";
pub const ENV_MAX_ITEMS: &str = "CONVOCATORIAS_MAX_ITEMS";

fn default_timeout() -> u64 {
    20
}
fn default_max_items() -> usize {
    30
}
fn default_user_agent() -> String {
    format!("convocatorias-monitor/{}", env!("CARGO_PKG_VERSION"))
}
fn default_concurrency() -> usize {
    4
}
fn default_store_path() -> PathBuf {
    PathBuf::from("data/calls.json")
}
fn default_csv_path() -> PathBuf {
    PathBuf::from("data/calls.csv")
}
fn default_digest_path() -> PathBuf {
    PathBuf::from("data/digest.md")
}
fn default_digest_title() -> String {
    "Resumen de convocatorias".to_string()
}
fn default_group_limit() -> usize {
    10
}
fn default_upcoming_limit() -> usize {
    15
}
fn default_subject() -> String {
    "Resumen semanal de convocatorias".to_string()
}

/// Parsed `settings.toml`. Every section and field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub digest: DigestSettings,
    #[serde(default)]
    pub notify: NotifySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunSettings {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_items")]
    pub max_items_per_source: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_concurrency")]
    pub max_concurrent_fetches: usize,
    /// Candidates scoring below this are dropped before merge. Off when unset.
    #[serde(default)]
    pub min_relevance_score: Option<f64>,
    /// Records not seen for this many days are pruned. Off when unset.
    #[serde(default)]
    pub retention_days: Option<u32>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_items_per_source: default_max_items(),
            user_agent: default_user_agent(),
            max_concurrent_fetches: default_concurrency(),
            min_relevance_score: None,
            retention_days: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
    #[serde(default = "default_digest_path")]
    pub digest_path: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            csv_path: default_csv_path(),
            digest_path: default_digest_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Division,
    Area,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigestSettings {
    #[serde(default = "default_digest_title")]
    pub title: String,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default = "default_group_limit")]
    pub max_items_per_group: usize,
    #[serde(default)]
    pub min_score: f64,
    /// Size of the "Próximos cierres" section; 0 hides it.
    #[serde(default = "default_upcoming_limit")]
    pub upcoming_deadlines: usize,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            title: default_digest_title(),
            group_by: GroupBy::default(),
            max_items_per_group: default_group_limit(),
            min_score: 0.0,
            upcoming_deadlines: default_upcoming_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            subject: default_subject(),
            recipients: Vec::new(),
        }
    }
}

// parse optional positive integer env
fn parse_positive_env<T: std::str::FromStr + PartialOrd + Default>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.trim().parse::<T>().ok())
        .filter(|v| *v > T::default())
}

impl Settings {
    /// Apply `CONVOCATORIAS_TIMEOUT_SECS` / `CONVOCATORIAS_MAX_ITEMS` overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_positive_env::<u64>(std::env::var(ENV_TIMEOUT_SECS).ok()) {
            self.run.timeout_seconds = t;
        }
        if let Some(n) = parse_positive_env::<usize>(std::env::var(ENV_MAX_ITEMS).ok()) {
            self.run.max_items_per_source = n;
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.run.timeout_seconds == 0 {
            return Err("run.timeout_seconds must be > 0".into());
        }
        if self.run.max_items_per_source == 0 {
            return Err("run.max_items_per_source must be > 0".into());
        }
        if let Some(min) = self.run.min_relevance_score {
            if !min.is_finite() {
                return Err("run.min_relevance_score must be finite".into());
            }
        }
        if !self.digest.min_score.is_finite() {
            return Err("digest.min_score must be finite".into());
        }
        Ok(())
    }
}
