// src/pipeline.rs
//! One harvest cycle: fetch → extract → classify → merge → export → notify.
//!
//! Fetches (and detail-page follow-ups) run concurrently; classification and
//! the store merge only start once every fetch has finished and proceed one
//! record at a time inside a single [`MergeBatch`](crate::store::MergeBatch).

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Datelike, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::classify::Classifier;
use crate::config::{AppConfig, ParsingHints, SourceDescriptor};
use crate::error::{EmptyExtractionWarning, PipelineError};
use crate::export::{write_artifacts, Artifacts};
use crate::ingest::detect::{detect_status, extract_deadline, guess_language};
use crate::ingest::providers::{extract, html::page_text};
use crate::ingest::types::{CandidateRecord, ContentSource};
use crate::ingest::{truncate_chars, DESCRIPTION_MAX_CHARS};
use crate::notify::{deliver, DigestNotifier, NotifyStatus};
use crate::store::{CallStore, ScoredCall};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("harvest_sources_total", "Sources attempted.");
        describe_counter!(
            "harvest_source_failures_total",
            "Sources that failed to fetch or parse."
        );
        describe_counter!(
            "harvest_empty_extractions_total",
            "Sources that fetched fine but yielded no items."
        );
        describe_counter!("harvest_items_skipped_total", "Malformed items skipped.");
        describe_counter!("harvest_records_added_total", "New call records.");
        describe_counter!(
            "harvest_records_updated_total",
            "Existing call records whose content changed."
        );
        describe_histogram!("harvest_fetch_ms", "Source fetch time in milliseconds.");
        describe_histogram!("harvest_parse_ms", "Payload extraction time in milliseconds.");
        describe_gauge!("harvest_last_run_ts", "Unix ts of the last completed cycle.");
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source_id: String,
    pub reason: String,
}

/// End-of-run report.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
    pub failures: Vec<SourceFailure>,
    pub empty_extractions: Vec<EmptyExtractionWarning>,
    pub items_skipped: usize,
    pub below_min_score: usize,
    pub records_added: usize,
    pub records_updated: usize,
    pub records_unchanged: usize,
    pub records_pruned: usize,
    pub total_records: usize,
    pub artifacts: Option<Artifacts>,
    pub export_error: Option<String>,
    pub notify: NotifyStatus,
}

impl RunSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            sources_attempted: 0,
            sources_succeeded: 0,
            failures: Vec::new(),
            empty_extractions: Vec::new(),
            items_skipped: 0,
            below_min_score: 0,
            records_added: 0,
            records_updated: 0,
            records_unchanged: 0,
            records_pruned: 0,
            total_records: 0,
            artifacts: None,
            export_error: None,
            notify: NotifyStatus::Disabled,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "sources: attempted={} succeeded={} failed={} empty={}",
            self.sources_attempted,
            self.sources_succeeded,
            self.failures.len(),
            self.empty_extractions.len()
        )?;
        for fail in &self.failures {
            writeln!(f, "  failed {}: {}", fail.source_id, fail.reason)?;
        }
        for w in &self.empty_extractions {
            writeln!(f, "  empty {}", w.source_id)?;
        }
        writeln!(
            f,
            "records: added={} updated={} unchanged={} pruned={} total={} (items skipped={}, below min score={})",
            self.records_added,
            self.records_updated,
            self.records_unchanged,
            self.records_pruned,
            self.total_records,
            self.items_skipped,
            self.below_min_score
        )?;
        match (&self.artifacts, &self.export_error) {
            (Some(a), _) => writeln!(
                f,
                "artifacts: {} {}",
                a.csv_path.display(),
                a.digest_path.display()
            )?,
            (None, Some(e)) => writeln!(f, "artifacts: not written ({e})")?,
            (None, None) => {}
        }
        write!(f, "notifier: {}", self.notify)
    }
}

async fn follow_links(
    fetcher: &dyn ContentSource,
    mut candidates: Vec<CandidateRecord>,
    concurrency: usize,
) -> Vec<CandidateRecord> {
    let linked: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.link.is_empty())
        .map(|(i, _)| i)
        .collect();
    // Futures are built up front so the buffered stream holds no borrowing closure.
    let requests: Vec<_> = linked
        .iter()
        .map(|&i| fetcher.fetch_url(&candidates[i].link))
        .collect();
    let pages: Vec<_> = stream::iter(requests).buffered(concurrency).collect().await;

    for (i, page) in linked.into_iter().zip(pages) {
        let c = &mut candidates[i];
        match page {
            Ok(page) => {
                let text = page_text(&page);
                if !text.is_empty() {
                    let merged = format!("{} {}", c.raw_description, text);
                    c.raw_description = truncate_chars(merged.trim(), DESCRIPTION_MAX_CHARS);
                }
            }
            Err(e) => debug!(link = %c.link, error = %e, "detail page skipped"),
        }
    }
    candidates
}

fn record_failure(summary: &mut RunSummary, source: &SourceDescriptor, reason: String) {
    warn!(source = %source.id, %reason, "source failed");
    counter!("harvest_source_failures_total").increment(1);
    summary.failures.push(SourceFailure {
        source_id: source.id.clone(),
        reason,
    });
}

/// Fetch and extract every enabled source. Per-source problems are recorded
/// in `summary`; nothing here is fatal.
async fn harvest(
    config: &AppConfig,
    fetcher: &dyn ContentSource,
    summary: &mut RunSummary,
) -> Vec<CandidateRecord> {
    let run = &config.settings.run;
    let concurrency = run.max_concurrent_fetches.max(1);
    let sources: Vec<&SourceDescriptor> = config.sources.iter().filter(|s| s.enabled).collect();

    let requests: Vec<_> = sources.iter().map(|&s| fetcher.fetch(s)).collect();
    let results: Vec<_> = stream::iter(requests).buffered(concurrency).collect().await;
    let fetched = sources.into_iter().zip(results);

    let mut all = Vec::new();
    for (source, result) in fetched {
        summary.sources_attempted += 1;
        counter!("harvest_sources_total").increment(1);

        let payload = match result {
            Ok(p) => p,
            Err(e) => {
                record_failure(summary, source, e.to_string());
                continue;
            }
        };
        let t0 = Instant::now();
        let extraction = match extract(source, &payload, run.max_items_per_source) {
            Ok(x) => x,
            Err(e) => {
                record_failure(summary, source, e.to_string());
                continue;
            }
        };

        let mut candidates = Vec::new();
        let mut skipped = 0usize;
        for item in extraction {
            match item {
                Ok(c) => candidates.push(c),
                Err(e) => {
                    skipped += 1;
                    debug!(source = %source.id, error = %e, "item skipped");
                }
            }
        }
        histogram!("harvest_parse_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
        summary.items_skipped += skipped;
        counter!("harvest_items_skipped_total").increment(skipped as u64);

        if candidates.is_empty() {
            let w = EmptyExtractionWarning {
                source_id: source.id.clone(),
            };
            warn!(source = %source.id, skipped, "{w}");
            counter!("harvest_empty_extractions_total").increment(1);
            summary.empty_extractions.push(w);
            continue;
        }

        if matches!(&source.hints, ParsingHints::Html(h) if h.follow_links) {
            candidates = follow_links(fetcher, candidates, concurrency).await;
        }

        info!(source = %source.id, items = candidates.len(), skipped, "source harvested");
        summary.sources_succeeded += 1;
        all.extend(candidates);
    }
    all
}

fn score(
    classifier: &Classifier,
    c: CandidateRecord,
    now: DateTime<Utc>,
) -> ScoredCall {
    let cls = classifier.classify(&c.title, &c.raw_description);
    let text = format!("{}\n{}", c.title, c.raw_description);
    ScoredCall {
        detected_deadline: extract_deadline(&text, now.year()),
        detected_language: guess_language(&text).to_string(),
        detected_status: detect_status(&text).to_string(),
        source_id: c.source_id,
        title: c.title,
        link: c.link,
        published_date: c.published_date,
        description: c.raw_description,
        areas: cls.areas,
        divisions: cls.divisions,
        score: cls.score,
        matched_keywords: cls.matched_keywords,
    }
}

/// Run one full cycle at time `now`.
///
/// Only store load/commit failures are returned as errors; everything else
/// ends up in the [`RunSummary`].
pub async fn run_cycle(
    config: &AppConfig,
    fetcher: &dyn ContentSource,
    notifier: Option<&dyn DigestNotifier>,
    now: DateTime<Utc>,
) -> Result<RunSummary, PipelineError> {
    ensure_metrics_described();
    let settings = &config.settings;
    let mut summary = RunSummary::new(now);

    let mut store = CallStore::load(&settings.output.store_path)?;

    let candidates = harvest(config, fetcher, &mut summary).await;

    let classifier = Classifier::new(&config.keywords, &config.divisions);
    let mut batch = store.begin(now);
    for c in candidates {
        let call = score(&classifier, c, now);
        if let Some(min) = settings.run.min_relevance_score {
            if call.score < min {
                summary.below_min_score += 1;
                continue;
            }
        }
        batch.merge(call);
    }
    if let Some(days) = settings.run.retention_days {
        batch.prune(days);
    }
    let stats = batch.commit()?;

    summary.records_added = stats.added;
    summary.records_updated = stats.updated;
    summary.records_unchanged = stats.unchanged;
    summary.records_pruned = stats.pruned;
    summary.total_records = store.len();
    counter!("harvest_records_added_total").increment(stats.added as u64);
    counter!("harvest_records_updated_total").increment(stats.updated as u64);

    let snapshot = store.snapshot();
    match write_artifacts(&snapshot, &settings.output, &settings.digest, now) {
        Ok(a) => {
            summary.notify = deliver(notifier, &settings.notify, &a.digest).await;
            summary.artifacts = Some(a);
        }
        Err(e) => {
            error!(error = %e, "artifacts not written");
            summary.export_error = Some(e.to_string());
            if notifier.is_some() {
                summary.notify = NotifyStatus::Failed("digest not written".into());
            }
        }
    }

    gauge!("harvest_last_run_ts").set(now.timestamp() as f64);
    info!(
        attempted = summary.sources_attempted,
        succeeded = summary.sources_succeeded,
        failed = summary.failures.len(),
        empty = summary.empty_extractions.len(),
        added = summary.records_added,
        updated = summary.records_updated,
        notify = %summary.notify,
        "cycle finished"
    );
    Ok(summary)
}
