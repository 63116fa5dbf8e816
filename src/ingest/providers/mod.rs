// src/ingest/providers/mod.rs
//! Payload → candidate records. Format dispatch happens on the source's
//! [`ParsingHints`]; both formats first locate [`RawItem`]s, then share the
//! validation in [`Extraction`].

pub mod html;
pub mod rss;

use std::collections::HashSet;

use url::Url;

use crate::config::{ParsingHints, SourceDescriptor};
use crate::error::ExtractionError;
use crate::ingest::detect::parse_date;
use crate::ingest::types::{CandidateRecord, RawItem};
use crate::ingest::{
    matches_url_filter, normalize_text, truncate_chars, DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS,
};

/// Single-pass sequence of candidates for one source. Items that fail
/// validation come out as `Err` and do not count towards the cap; filtered
/// items (URL filter, duplicate link, non-web link) are dropped silently.
pub struct Extraction {
    source_id: String,
    base: Option<Url>,
    raw: std::vec::IntoIter<RawItem>,
    remaining: usize,
    include: Vec<String>,
    seen_links: HashSet<String>,
}

impl Extraction {
    fn new(
        source: &SourceDescriptor,
        items: Vec<RawItem>,
        max_items: usize,
        include: Vec<String>,
    ) -> Self {
        Self {
            source_id: source.id.clone(),
            base: Url::parse(&source.url).ok(),
            raw: items.into_iter(),
            remaining: max_items,
            include,
            seen_links: HashSet::new(),
        }
    }

    fn resolve(&self, href: &str) -> Result<Option<String>, ExtractionError> {
        let joined = match &self.base {
            Some(b) => b.join(href),
            None => Url::parse(href),
        }
        .map_err(|e| ExtractionError::MalformedItem(format!("bad link `{href}`: {e}")))?;
        if !matches!(joined.scheme(), "http" | "https") {
            return Ok(None);
        }
        Ok(Some(joined.to_string()))
    }

    fn build(&mut self, raw: RawItem) -> Result<Option<CandidateRecord>, ExtractionError> {
        let title = normalize_text(raw.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            return Err(ExtractionError::MalformedItem("missing title".into()));
        }

        let href = raw.link.as_deref().map(str::trim).unwrap_or_default();
        let link = if href.is_empty() || href.starts_with('#') {
            String::new()
        } else {
            match self.resolve(href)? {
                Some(l) => l,
                None => return Ok(None),
            }
        };

        if !self.include.is_empty() && !matches_url_filter(&link, &self.include) {
            return Ok(None);
        }
        if !link.is_empty() && !self.seen_links.insert(link.clone()) {
            return Ok(None);
        }

        let description = normalize_text(raw.description.as_deref().unwrap_or_default());

        Ok(Some(CandidateRecord {
            source_id: self.source_id.clone(),
            title: truncate_chars(&title, TITLE_MAX_CHARS),
            link,
            published_date: raw.date.as_deref().and_then(parse_date),
            raw_description: truncate_chars(&description, DESCRIPTION_MAX_CHARS),
        }))
    }
}

impl Iterator for Extraction {
    type Item = Result<CandidateRecord, ExtractionError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == 0 {
                return None;
            }
            let raw = self.raw.next()?;
            match self.build(raw) {
                Ok(Some(c)) => {
                    self.remaining -= 1;
                    return Some(Ok(c));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Parse `payload` according to the source's declared format. A payload that
/// cannot be parsed at all is an error; per-item problems surface through the
/// returned iterator.
pub fn extract(
    source: &SourceDescriptor,
    payload: &str,
    max_items: usize,
) -> Result<Extraction, ExtractionError> {
    match &source.hints {
        ParsingHints::Rss(h) => {
            let items = rss::locate_items(payload)?;
            Ok(Extraction::new(
                source,
                items,
                max_items,
                h.include_if_url_contains.clone(),
            ))
        }
        ParsingHints::Html(h) => {
            let items = html::locate_items(payload, h)?;
            Ok(Extraction::new(
                source,
                items,
                max_items,
                h.include_if_url_contains.clone(),
            ))
        }
    }
}
