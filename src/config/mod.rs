// src/config/mod.rs
//! Run configuration, loaded once at startup from a config directory:
//! `settings.toml`, `sources.toml`, `areas_estrategicas.toml`,
//! `divisiones_academicas.toml`.

pub mod areas;
pub mod settings;
pub mod sources;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub use areas::{Aggregation, DivisionMap, KeywordEntry, KeywordTable, MatchMode};
pub use settings::{DigestSettings, GroupBy, NotifySettings, OutputSettings, RunSettings, Settings};
pub use sources::{HtmlHints, ParsingHints, RssHints, SourceDescriptor, SourceFormat};

pub const ENV_CONFIG_DIR: &str = "CONVOCATORIAS_CONFIG_DIR";
pub const DEFAULT_CONFIG_DIR: &str = "config";

pub const SETTINGS_FILE: &str = "settings.toml";
pub const SOURCES_FILE: &str = "sources.toml";
pub const KEYWORDS_FILE: &str = "areas_estrategicas.toml";
pub const DIVISIONS_FILE: &str = "divisiones_academicas.toml";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: Settings,
    pub sources: Vec<SourceDescriptor>,
    pub keywords: KeywordTable,
    pub divisions: DivisionMap,
}

/// Resolve the config directory:
/// 1) explicit path (CLI flag)
/// 2) $CONVOCATORIAS_CONFIG_DIR
/// 3) ./config
pub fn resolve_config_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    std::env::var(ENV_CONFIG_DIR)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_err(path: &Path) -> impl FnOnce(String) -> ConfigError + '_ {
    move |message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    }
}

impl AppConfig {
    /// Load and validate all four files from `dir`. `settings.toml` may be
    /// absent (defaults apply); the other three are required.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let settings_path = dir.join(SETTINGS_FILE);
        let mut settings = if settings_path.exists() {
            let s = read(&settings_path)?;
            toml::from_str::<Settings>(&s).map_err(|e| parse_err(&settings_path)(e.to_string()))?
        } else {
            tracing::debug!(path = %settings_path.display(), "no settings file; using defaults");
            Settings::default()
        };
        settings.apply_env_overrides();
        settings.validate().map_err(ConfigError::Invalid)?;

        let sources_path = dir.join(SOURCES_FILE);
        let sources = sources::parse_sources(&read(&sources_path)?).map_err(parse_err(&sources_path))?;
        if sources.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{} declares no sources",
                sources_path.display()
            )));
        }

        let kw_path = dir.join(KEYWORDS_FILE);
        let keywords = areas::parse_keyword_table(&read(&kw_path)?).map_err(parse_err(&kw_path))?;

        let div_path = dir.join(DIVISIONS_FILE);
        let divisions = areas::parse_division_map(&read(&div_path)?).map_err(parse_err(&div_path))?;

        tracing::info!(
            dir = %dir.display(),
            sources = sources.len(),
            keywords = keywords.keywords.len(),
            areas_mapped = divisions.len(),
            "configuration loaded"
        );

        Ok(Self {
            settings,
            sources,
            keywords,
            divisions,
        })
    }
}
