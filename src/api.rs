// src/api.rs
//! Read-only dashboard API over the persisted store.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::classify::fold;
use crate::export::digest::digest_order;
use crate::metrics::Metrics;
use crate::store::{CallRecord, CallStore};

pub const CLOSING_SOON_DAYS: i64 = 14;

#[derive(Clone)]
pub struct AppState {
    store_path: Arc<PathBuf>,
    /// Fixed "today" for deterministic responses; wall clock when unset.
    today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: Arc::new(store_path.into()),
            today: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn load(&self) -> Result<Vec<CallRecord>, ApiError> {
        let store = CallStore::load(self.store_path.as_path()).context("load call store")?;
        Ok(store.snapshot())
    }
}

/// Dashboard router. `/artifacts` serves `artifacts_dir` when given;
/// `/metrics` is mounted when a recorder handle is given.
pub fn router(state: AppState, artifacts_dir: Option<PathBuf>, metrics: Option<&Metrics>) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/calls", get(list_calls))
        .route("/stats", get(stats))
        .with_state(state);
    if let Some(dir) = artifacts_dir {
        app = app.nest_service("/artifacts", ServeDir::new(dir));
    }
    if let Some(m) = metrics {
        app = app.merge(m.router());
    }
    app.layer(CorsLayer::very_permissive())
}

pub struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "dashboard request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", self.0)).into_response()
    }
}

/// Dashboard status label for a record as of `today`.
pub fn status_label(r: &CallRecord, today: NaiveDate) -> (&'static str, Option<i64>) {
    let days = r.detected_deadline.map(|d| (d - today).num_days());
    let label = match (r.detected_status.as_str(), days) {
        ("closed", _) => "closed",
        (_, Some(d)) if d < 0 => "closed",
        ("open", Some(d)) if d <= CLOSING_SOON_DAYS => "closing_soon",
        ("open", _) => "open",
        (_, None) => "no_deadline",
        (_, Some(d)) if d <= CLOSING_SOON_DAYS => "closing_soon",
        _ => "ongoing",
    };
    (label, days)
}

#[derive(Debug, Default, Deserialize)]
pub struct CallsQuery {
    pub q: Option<String>,
    pub source: Option<String>,
    pub lang: Option<String>,
    pub status: Option<String>,
    pub division: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallView {
    #[serde(flatten)]
    pub record: CallRecord,
    pub status_label: &'static str,
    pub days_remaining: Option<i64>,
}

fn matches_opt(want: &Option<String>, have: &str) -> bool {
    match want.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(w) => w.eq_ignore_ascii_case(have),
    }
}

async fn list_calls(
    State(state): State<AppState>,
    Query(q): Query<CallsQuery>,
) -> Result<Json<Vec<CallView>>, ApiError> {
    let today = state.today();
    let needle = q
        .q
        .as_deref()
        .map(|s| fold(s.trim()))
        .filter(|s| !s.is_empty());

    let mut records: Vec<CallRecord> = state
        .load()?
        .into_iter()
        .filter(|r| matches_opt(&q.source, &r.source_id))
        .filter(|r| matches_opt(&q.lang, &r.detected_language))
        .filter(|r| match q.division.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(d) => r.division.iter().any(|x| x.eq_ignore_ascii_case(d)),
        })
        .filter(|r| match &needle {
            None => true,
            Some(n) => fold(&format!("{} {}", r.title, r.description)).contains(n.as_str()),
        })
        .collect();
    records.sort_by(digest_order);

    let out = records
        .into_iter()
        .filter_map(|record| {
            let (label, days) = status_label(&record, today);
            matches_opt(&q.status, label).then_some(CallView {
                record,
                status_label: label,
                days_remaining: days,
            })
        })
        .collect();
    Ok(Json(out))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub without_deadline: usize,
    pub by_source: BTreeMap<String, usize>,
}

async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    let today = state.today();
    let records = state.load()?;
    let mut s = Stats {
        total: records.len(),
        active: 0,
        without_deadline: 0,
        by_source: BTreeMap::new(),
    };
    for r in &records {
        *s.by_source.entry(r.source_id.clone()).or_default() += 1;
        if status_label(r, today).0 != "closed" {
            s.active += 1;
            if r.detected_deadline.is_none() {
                s.without_deadline += 1;
            }
        }
    }
    Ok(Json(s))
}
