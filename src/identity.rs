// src/identity.rs
//! Stable identity for call records.
//!
//! `identity_key = sha256(source_id | normalized link)`, or
//! `sha256(source_id | normalized title | date)` when the link is empty.
//! All normalizers are idempotent.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use url::Url;

const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid", "_ga", "ref"];

fn is_tracking_param(name: &str) -> bool {
    let n = name.to_ascii_lowercase();
    n.starts_with("utm_") || TRACKING_PARAMS.contains(&n.as_str())
}

/// Lowercase, trim, collapse internal whitespace.
pub fn normalize_text_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize a link for identity purposes: text-normalized, fragment dropped,
/// tracking query parameters removed. Non-URL input is only text-normalized.
pub fn normalize_url(link: &str) -> String {
    let base = normalize_text_key(link);
    let Ok(mut url) = Url::parse(&base) else {
        return base;
    };
    url.set_fragment(None);
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    // Serialization may reintroduce uppercase percent-escapes.
    url.to_string().to_lowercase()
}

fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\x1f");
        }
        hasher.update(p.as_bytes());
    }
    let out = hasher.finalize();
    let mut hex = String::with_capacity(32);
    for b in out.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut hex, "{:02x}", b);
    }
    hex
}

pub fn identity_key(
    source_id: &str,
    link: &str,
    title: &str,
    published_date: Option<NaiveDate>,
) -> String {
    let source = normalize_text_key(source_id);
    let link = normalize_url(link);
    if !link.is_empty() {
        return digest(&["link", &source, &link]);
    }
    let date = published_date.map(|d| d.to_string()).unwrap_or_default();
    digest(&["title", &source, &normalize_text_key(title), &date])
}
