// src/ingest/detect.rs
//! Date parsing and the light text heuristics attached to every call:
//! deadline, language, open/closed status.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

static RE_ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(20\d{2})[-/](0?[1-9]|1[0-2])[-/](0?[1-9]|[12]\d|3[01])\b").unwrap());
static RE_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(0?[1-9]|[12]\d|3[01])[/.-](0?[1-9]|1[0-2])[/.-](20\d{2})\b").unwrap());
static RE_ES_LONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+de\s+([a-záéíóú]+)\s+(?:de|del)\s+(\d{4})\b").unwrap()
});
static RE_EN_MDY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b").unwrap());
static RE_EN_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]{3,9})\.?,?\s+(\d{4})\b").unwrap());
static RE_DEADLINE_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(fecha\s*l[ií]mite|cierre|hasta|deadline|due\s*date)\s*[:\-]?\s*").unwrap()
});

fn month_from_name(name: &str) -> Option<u32> {
    let n = name.to_lowercase();
    let m = match n.as_str() {
        "enero" | "january" | "jan" => 1,
        "febrero" | "february" | "feb" => 2,
        "marzo" | "march" | "mar" => 3,
        "abril" | "april" | "apr" => 4,
        "mayo" | "may" => 5,
        "junio" | "june" | "jun" => 6,
        "julio" | "july" | "jul" => 7,
        "agosto" | "august" | "aug" => 8,
        "septiembre" | "setiembre" | "september" | "sep" | "sept" => 9,
        "octubre" | "october" | "oct" => 10,
        "noviembre" | "november" | "nov" => 11,
        "diciembre" | "december" | "dec" => 12,
        _ => return None,
    };
    Some(m)
}

fn ymd(y: &str, m: u32, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m, d.parse().ok()?)
}

fn from_offset(dt: OffsetDateTime) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(dt.year(), u8::from(dt.month()) as u32, dt.day() as u32)
}

/// All dates mentioned in `text`, in order of appearance.
pub fn find_dates(text: &str) -> Vec<NaiveDate> {
    let mut hits: Vec<(usize, NaiveDate)> = Vec::new();

    for c in RE_ISO.captures_iter(text) {
        if let Some(d) = c[2].parse().ok().and_then(|m| ymd(&c[1], m, &c[3])) {
            hits.push((c.get(0).map_or(0, |m| m.start()), d));
        }
    }
    for c in RE_DMY.captures_iter(text) {
        if let Some(d) = c[2].parse().ok().and_then(|m| ymd(&c[3], m, &c[1])) {
            hits.push((c.get(0).map_or(0, |m| m.start()), d));
        }
    }
    for c in RE_ES_LONG.captures_iter(text) {
        if let Some(d) = month_from_name(&c[2]).and_then(|m| ymd(&c[3], m, &c[1])) {
            hits.push((c.get(0).map_or(0, |m| m.start()), d));
        }
    }
    for c in RE_EN_MDY.captures_iter(text) {
        if let Some(d) = month_from_name(&c[1]).and_then(|m| ymd(&c[3], m, &c[2])) {
            hits.push((c.get(0).map_or(0, |m| m.start()), d));
        }
    }
    for c in RE_EN_DMY.captures_iter(text) {
        if let Some(d) = month_from_name(&c[2]).and_then(|m| ymd(&c[3], m, &c[1])) {
            hits.push((c.get(0).map_or(0, |m| m.start()), d));
        }
    }

    hits.sort_by_key(|(pos, _)| *pos);
    hits.into_iter().map(|(_, d)| d).collect()
}

/// Parse a date field as found in feeds and pages.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        return from_offset(dt);
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return from_offset(dt);
    }
    find_dates(s).into_iter().next()
}

/// Best-effort deadline: first date after a deadline cue, else the first date
/// anywhere. Only dates in `current_year` or later count.
pub fn extract_deadline(text: &str, current_year: i32) -> Option<NaiveDate> {
    let mut chunks: Vec<&str> = RE_DEADLINE_CUE
        .find_iter(text)
        .map(|m| &text[m.end()..])
        .collect();
    chunks.push(text);

    for chunk in chunks {
        let head: String = chunk.chars().take(2_000).collect();
        if let Some(d) = find_dates(&head)
            .into_iter()
            .find(|d| d.year() >= current_year)
        {
            return Some(d);
        }
    }
    None
}

const ES_CUES: &[&str] = &[
    "convocatoria",
    "beca",
    "financiamiento",
    "apoyo",
    "proyecto",
    "cierre",
    "fecha límite",
];
const EN_CUES: &[&str] = &[
    "call for proposals",
    "grant",
    "funding",
    "deadline",
    "solicitation",
    "fellowship",
];

/// "es" | "en" | "mixed" | "unknown"
pub fn guess_language(text: &str) -> &'static str {
    let t = text.to_lowercase();
    let es = ES_CUES.iter().any(|w| t.contains(w));
    let en = EN_CUES.iter().any(|w| t.contains(w));
    match (es, en) {
        (true, true) => "mixed",
        (true, false) => "es",
        (false, true) => "en",
        _ => "unknown",
    }
}

const OPEN_CUES: &[&str] = &["abierta", "abierto", "open", "vigente", "en curso"];
const CLOSED_CUES: &[&str] = &[
    "cerrada",
    "cerrado",
    "closed",
    "concluida",
    "finalizada",
    "terminada",
];

/// "open" | "closed" | "unknown"
pub fn detect_status(text: &str) -> &'static str {
    let t = text.to_lowercase();
    if OPEN_CUES.iter().any(|w| t.contains(w)) {
        "open"
    } else if CLOSED_CUES.iter().any(|w| t.contains(w)) {
        "closed"
    } else {
        "unknown"
    }
}
