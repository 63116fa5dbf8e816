// src/ingest/providers/rss.rs
//! RSS 2.0, RSS 1.0 (RDF) and Atom feeds via quick-xml's serde support.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::error::ExtractionError;
use crate::ingest::types::RawItem;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

// Repeated child elements are tolerated; the first non-empty one wins.
#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    link: Vec<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Vec<String>,
    #[serde(default)]
    description: Vec<String>,
}

fn first_text(values: Vec<String>) -> Option<String> {
    values.into_iter().find(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    title: Vec<AtomText>,
    #[serde(default)]
    link: Vec<AtomLink>,
    #[serde(default)]
    published: Vec<String>,
    #[serde(default)]
    updated: Vec<String>,
    #[serde(default)]
    summary: Vec<AtomText>,
    #[serde(default)]
    content: Vec<AtomText>,
}

fn first_atom_text(values: Vec<AtomText>) -> Option<String> {
    first_text(values.into_iter().map(|t| t.value).collect())
}

impl From<Item> for RawItem {
    fn from(it: Item) -> Self {
        RawItem {
            title: first_text(it.title),
            link: first_text(it.link),
            date: first_text(it.pub_date),
            description: first_text(it.description),
        }
    }
}

impl From<Entry> for RawItem {
    fn from(e: Entry) -> Self {
        let link = e
            .link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| e.link.first())
            .and_then(|l| l.href.clone());
        RawItem {
            title: first_atom_text(e.title),
            link,
            date: first_text(e.published).or_else(|| first_text(e.updated)),
            description: first_atom_text(e.summary).or_else(|| first_atom_text(e.content)),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flavor {
    Rss,
    Rdf,
    Atom,
}

fn sniff(xml: &str) -> Option<Flavor> {
    let pos = |needle: &str| xml.find(needle);
    [
        (pos("<rss"), Flavor::Rss),
        (pos("<rdf:RDF"), Flavor::Rdf),
        (pos("<feed"), Flavor::Atom),
    ]
    .into_iter()
    .filter_map(|(p, f)| p.map(|p| (p, f)))
    .min_by_key(|(p, _)| *p)
    .map(|(_, f)| f)
}

fn malformed(message: String) -> ExtractionError {
    ExtractionError::MalformedPayload {
        format: "rss",
        message,
    }
}

/// Locate feed items. Item order follows the document.
pub fn locate_items(payload: &str) -> Result<Vec<RawItem>, ExtractionError> {
    let xml = decode_html_entities_for_xml(payload);

    let items: Vec<RawItem> = match sniff(&xml) {
        Some(Flavor::Rss) => from_str::<Rss>(&xml)
            .map_err(|e| malformed(e.to_string()))?
            .channel
            .item
            .into_iter()
            .map(RawItem::from)
            .collect(),
        Some(Flavor::Rdf) => from_str::<Rdf>(&xml)
            .map_err(|e| malformed(e.to_string()))?
            .item
            .into_iter()
            .map(RawItem::from)
            .collect(),
        Some(Flavor::Atom) => from_str::<Feed>(&xml)
            .map_err(|e| malformed(e.to_string()))?
            .entry
            .into_iter()
            .map(RawItem::from)
            .collect(),
        None => return Err(malformed("no <rss>, <rdf:RDF> or <feed> root".into())),
    };

    Ok(items)
}

static RE_NAMED_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());

const XML_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

/// XML only knows five named entities; feeds routinely use HTML ones.
/// Known HTML entities are decoded (and re-escaped for XML), unknown ones
/// become literal text.
fn decode_html_entities_for_xml(s: &str) -> Cow<'_, str> {
    RE_NAMED_ENTITY.replace_all(s, |c: &Captures<'_>| {
        let name = &c[1];
        if XML_ENTITIES.contains(&name) {
            return c[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&c[0]);
        if decoded == c[0] {
            format!("&amp;{name};")
        } else {
            html_escape::encode_text(&decoded).into_owned()
        }
    })
}
