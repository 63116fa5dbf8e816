// src/ingest/providers/html.rs
//! HTML listing pages, located with CSS selectors from the source's hints.

use scraper::{ElementRef, Html, Selector};

use crate::config::HtmlHints;
use crate::error::ExtractionError;
use crate::ingest::types::RawItem;
use crate::ingest::{normalize_text, truncate_chars, DESCRIPTION_MAX_CHARS};

fn selector(s: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(s).map_err(|e| ExtractionError::MalformedPayload {
        format: "html",
        message: format!("selector `{s}`: {e}"),
    })
}

fn text_of(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Locate items on a page. Container mode when `hints.item` is set, anchor
/// mode otherwise.
pub fn locate_items(payload: &str, hints: &HtmlHints) -> Result<Vec<RawItem>, ExtractionError> {
    let document = Html::parse_document(payload);
    match hints.item.as_deref() {
        Some(item) => containers(&document, item, hints),
        None => anchors(&document, hints),
    }
}

fn containers(
    document: &Html,
    item: &str,
    hints: &HtmlHints,
) -> Result<Vec<RawItem>, ExtractionError> {
    let item_sel = selector(item)?;
    let title_sel = selector(hints.title.as_deref().unwrap_or("a"))?;
    let link_sel = selector(hints.link.as_deref().unwrap_or("a[href]"))?;
    let date_sel = hints.date.as_deref().map(selector).transpose()?;
    let desc_sel = hints.description.as_deref().map(selector).transpose()?;

    let mut out = Vec::new();
    for el in document.select(&item_sel) {
        let title = el.select(&title_sel).next().map(text_of);
        let link = el
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .or_else(|| el.value().attr("href"))
            .map(str::to_string);
        let date = date_sel.as_ref().and_then(|s| {
            el.select(s).next().map(|d| {
                d.value()
                    .attr("datetime")
                    .map(str::to_string)
                    .unwrap_or_else(|| text_of(d))
            })
        });
        let description = match &desc_sel {
            Some(s) => el.select(s).next().map(text_of),
            None => Some(text_of(el)),
        };
        out.push(RawItem {
            title,
            link,
            date,
            description,
        });
    }
    Ok(out)
}

fn anchors(document: &Html, hints: &HtmlHints) -> Result<Vec<RawItem>, ExtractionError> {
    let a_sel = selector("a[href]")?;
    let mut out = Vec::new();
    for a in document.select(&a_sel) {
        let title = text_of(a);
        if title.chars().count() < hints.min_title_len {
            continue;
        }
        let context = a
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| matches!(e.value().name(), "article" | "li" | "div"))
            .map(text_of)
            .unwrap_or_else(|| title.clone());
        out.push(RawItem {
            title: Some(title),
            link: a.value().attr("href").map(str::to_string),
            date: None,
            description: Some(truncate_chars(&context, DESCRIPTION_MAX_CHARS)),
        });
    }
    Ok(out)
}

/// Visible text of a detail page, used to enrich `follow_links` items.
pub fn page_text(payload: &str) -> String {
    let document = Html::parse_document(payload);
    let body = Selector::parse("body").ok();
    let root = body
        .as_ref()
        .and_then(|s| document.select(s).next())
        .unwrap_or_else(|| document.root_element());
    let skip = ["script", "style", "noscript"];
    let mut parts = Vec::new();
    for node in root.descendants() {
        if let Some(t) = node.value().as_text() {
            let inside_skipped = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|e| skip.contains(&e.value().name()));
            if !inside_skipped {
                parts.push(t.to_string());
            }
        }
    }
    normalize_text(&parts.join(" "))
}
