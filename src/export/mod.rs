// src/export/mod.rs
//! Store snapshot → CSV table and Markdown digest.

pub mod csv;
pub mod digest;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{DigestSettings, OutputSettings};
use crate::store::CallRecord;

pub use csv::render_csv;
pub use digest::render_digest;

#[derive(Debug, Clone)]
pub struct Artifacts {
    pub csv_path: PathBuf,
    pub digest_path: PathBuf,
    /// Rendered digest, handed to the notifier.
    pub digest: String,
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => fs::create_dir_all(p),
        _ => Ok(()),
    }
}

/// Render both artifacts from `records` and write them to the configured paths.
pub fn write_artifacts(
    records: &[CallRecord],
    output: &OutputSettings,
    digest_settings: &DigestSettings,
    generated_at: DateTime<Utc>,
) -> io::Result<Artifacts> {
    let table = render_csv(records);
    let digest = render_digest(records, digest_settings, generated_at);

    ensure_parent(&output.csv_path)?;
    fs::write(&output.csv_path, &table)?;
    ensure_parent(&output.digest_path)?;
    fs::write(&output.digest_path, &digest)?;

    info!(
        csv = %output.csv_path.display(),
        digest = %output.digest_path.display(),
        rows = records.len(),
        "artifacts written"
    );
    Ok(Artifacts {
        csv_path: output.csv_path.clone(),
        digest_path: output.digest_path.clone(),
        digest,
    })
}
