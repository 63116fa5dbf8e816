// src/store.rs
//! Persisted call dataset with an explicit commit boundary.
//!
//! The store is a JSON document (schema version + records sorted by identity
//! key). A cycle opens a [`MergeBatch`] with [`CallStore::begin`], merges
//! scored calls one at a time, and either commits (temp file in the same
//! directory, then atomic rename) or drops the batch, which leaves both the
//! file and the in-memory store untouched.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreCommitError, StoreError};
use crate::identity::identity_key;

pub const SCHEMA_VERSION: u32 = 1;

/// A persisted call for proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub identity_key: String,
    pub source_id: String,
    pub title: String,
    pub link: String,
    pub published_date: Option<NaiveDate>,
    pub description: String,
    pub strategic_area_tags: BTreeSet<String>,
    pub division: BTreeSet<String>,
    pub relevance_score: f64,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    #[serde(default)]
    pub detected_deadline: Option<NaiveDate>,
    #[serde(default = "unknown")]
    pub detected_language: String,
    #[serde(default = "unknown")]
    pub detected_status: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

fn unknown() -> String {
    "unknown".to_string()
}

/// A candidate after scoring and enrichment, ready to merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCall {
    pub source_id: String,
    pub title: String,
    pub link: String,
    pub published_date: Option<NaiveDate>,
    pub description: String,
    pub areas: BTreeSet<String>,
    pub divisions: BTreeSet<String>,
    pub score: f64,
    pub matched_keywords: Vec<String>,
    pub detected_deadline: Option<NaiveDate>,
    pub detected_language: String,
    pub detected_status: String,
}

impl ScoredCall {
    pub fn identity_key(&self) -> String {
        identity_key(&self.source_id, &self.link, &self.title, self.published_date)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    schema_version: u32,
    #[serde(default)]
    records: Vec<CallRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    Updated,
    /// Existing record seen again with identical content.
    Unchanged,
    /// Same key as a call merged earlier in this batch.
    Collapsed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub collapsed: usize,
    pub pruned: usize,
}

#[derive(Debug, Clone)]
pub struct CallStore {
    path: PathBuf,
    records: BTreeMap<String, CallRecord>,
}

impl CallStore {
    /// Load the dataset; a missing file is an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let raw = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "store file absent; starting empty");
                return Ok(Self {
                    path,
                    records: BTreeMap::new(),
                });
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        let doc: StoreDocument = serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            message: e.to_string(),
        })?;
        if doc.schema_version > SCHEMA_VERSION {
            return Err(StoreError::Corrupt {
                path,
                message: format!("unsupported schema version {}", doc.schema_version),
            });
        }

        let mut records = BTreeMap::new();
        for r in doc.records {
            if records.insert(r.identity_key.clone(), r).is_some() {
                return Err(StoreError::Corrupt {
                    path,
                    message: "duplicate identity_key".into(),
                });
            }
        }
        info!(path = %path.display(), records = records.len(), "store loaded");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CallRecord> {
        self.records.get(key)
    }

    /// Records in identity-key order.
    pub fn records(&self) -> impl Iterator<Item = &CallRecord> {
        self.records.values()
    }

    /// Owned copy of the records, in identity-key order.
    pub fn snapshot(&self) -> Vec<CallRecord> {
        self.records.values().cloned().collect()
    }

    /// Open a merge batch for a cycle running at `now`.
    pub fn begin(&mut self, now: DateTime<Utc>) -> MergeBatch<'_> {
        let working = self.records.clone();
        MergeBatch {
            store: self,
            working,
            now,
            merged_keys: HashSet::new(),
            stats: MergeStats::default(),
            committed: false,
        }
    }
}

/// Working copy of the store for one cycle. Commit or drop; nothing reaches
/// disk or the parent store until [`MergeBatch::commit`] succeeds.
pub struct MergeBatch<'a> {
    store: &'a mut CallStore,
    working: BTreeMap<String, CallRecord>,
    now: DateTime<Utc>,
    /// Keys already merged in this batch.
    merged_keys: HashSet<String>,
    stats: MergeStats,
    committed: bool,
}

impl MergeBatch<'_> {
    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Upsert one scored call.
    pub fn merge(&mut self, call: ScoredCall) -> MergeOutcome {
        let key = call.identity_key();
        let now = self.now;
        let repeat = !self.merged_keys.insert(key.clone());

        let outcome = match self.working.get_mut(&key) {
            Some(existing) => {
                let changed = existing.description != call.description
                    || existing.relevance_score != call.score
                    || existing.strategic_area_tags != call.areas
                    || existing.division != call.divisions
                    || existing.matched_keywords != call.matched_keywords
                    || existing.detected_deadline != call.detected_deadline
                    || existing.detected_language != call.detected_language
                    || existing.detected_status != call.detected_status;

                existing.description = call.description;
                existing.relevance_score = call.score;
                existing.strategic_area_tags = call.areas;
                existing.division = call.divisions;
                existing.matched_keywords = call.matched_keywords;
                existing.detected_deadline = call.detected_deadline;
                existing.detected_language = call.detected_language;
                existing.detected_status = call.detected_status;
                if existing.published_date.is_none() {
                    existing.published_date = call.published_date;
                }
                existing.last_seen_at = existing.last_seen_at.max(now);

                if repeat {
                    MergeOutcome::Collapsed
                } else if changed {
                    MergeOutcome::Updated
                } else {
                    MergeOutcome::Unchanged
                }
            }
            None => {
                self.working.insert(
                    key.clone(),
                    CallRecord {
                        identity_key: key,
                        source_id: call.source_id,
                        title: call.title,
                        link: call.link,
                        published_date: call.published_date,
                        description: call.description,
                        strategic_area_tags: call.areas,
                        division: call.divisions,
                        relevance_score: call.score,
                        matched_keywords: call.matched_keywords,
                        detected_deadline: call.detected_deadline,
                        detected_language: call.detected_language,
                        detected_status: call.detected_status,
                        first_seen_at: now,
                        last_seen_at: now,
                    },
                );
                MergeOutcome::Added
            }
        };

        match outcome {
            MergeOutcome::Added => self.stats.added += 1,
            MergeOutcome::Updated => self.stats.updated += 1,
            MergeOutcome::Unchanged => self.stats.unchanged += 1,
            MergeOutcome::Collapsed => self.stats.collapsed += 1,
        }
        outcome
    }

    /// Drop records not seen within `retention_days` of the cycle time.
    pub fn prune(&mut self, retention_days: u32) -> usize {
        let cutoff = self.now - Duration::days(i64::from(retention_days));
        let before = self.working.len();
        self.working.retain(|_, r| r.last_seen_at >= cutoff);
        let pruned = before - self.working.len();
        self.stats.pruned += pruned;
        if pruned > 0 {
            info!(pruned, retention_days, "stale records pruned");
        }
        pruned
    }

    /// Persist the working copy atomically and publish it to the store.
    pub fn commit(mut self) -> Result<MergeStats, StoreCommitError> {
        let path = self.store.path.clone();
        let fail = |message: String| StoreCommitError {
            path: path.clone(),
            message,
        };

        let doc = StoreDocument {
            schema_version: SCHEMA_VERSION,
            records: self.working.values().cloned().collect(),
        };
        let mut body = serde_json::to_string_pretty(&doc).map_err(|e| fail(e.to_string()))?;
        body.push('\n');

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| fail(format!("create {}: {e}", dir.display())))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| fail(e.to_string()))?;
        tmp.write_all(body.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| fail(e.to_string()))?;
        tmp.persist(&path).map_err(|e| fail(e.error.to_string()))?;

        self.store.records = std::mem::take(&mut self.working);
        self.committed = true;
        info!(
            path = %path.display(),
            records = self.store.records.len(),
            added = self.stats.added,
            updated = self.stats.updated,
            "store committed"
        );
        Ok(self.stats)
    }
}

impl Drop for MergeBatch<'_> {
    fn drop(&mut self) {
        if !self.committed {
            warn!(
                path = %self.store.path.display(),
                discarded = self.stats.added + self.stats.updated,
                "merge batch dropped without commit; rolled back"
            );
        }
    }
}
