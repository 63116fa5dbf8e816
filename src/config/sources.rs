// src/config/sources.rs
//! Source registry: the list of places calls are harvested from.

use scraper::Selector;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Html,
    Rss,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Html => "html",
            SourceFormat::Rss => "rss",
        }
    }
}

fn default_min_title_len() -> usize {
    10
}

/// Locators for HTML pages. With `item` set, the other selectors are applied
/// inside each matched container; without it, every `a[href]` is a candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct HtmlHints {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub include_if_url_contains: Vec<String>,
    #[serde(default = "default_min_title_len")]
    pub min_title_len: usize,
    /// Fetch each item's page to enrich description and deadline.
    #[serde(default)]
    pub follow_links: bool,
}

impl Default for HtmlHints {
    fn default() -> Self {
        Self {
            item: None,
            title: None,
            link: None,
            date: None,
            description: None,
            include_if_url_contains: Vec::new(),
            min_title_len: default_min_title_len(),
            follow_links: false,
        }
    }
}

impl HtmlHints {
    fn selectors(&self) -> Vec<(&'static str, &str)> {
        [
            ("item", self.item.as_deref()),
            ("title", self.title.as_deref()),
            ("link", self.link.as_deref()),
            ("date", self.date.as_deref()),
            ("description", self.description.as_deref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RssHints {
    #[serde(default)]
    pub include_if_url_contains: Vec<String>,
}

/// Per-format parsing hints, dispatched on the declared format.
#[derive(Debug, Clone)]
pub enum ParsingHints {
    Html(HtmlHints),
    Rss(RssHints),
}

#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub hints: ParsingHints,
}

impl SourceDescriptor {
    pub fn format(&self) -> SourceFormat {
        match self.hints {
            ParsingHints::Html(_) => SourceFormat::Html,
            ParsingHints::Rss(_) => SourceFormat::Rss,
        }
    }

    /// Convenience constructor for RSS sources with default hints.
    pub fn rss(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            url: url.to_string(),
            enabled: true,
            hints: ParsingHints::Rss(RssHints::default()),
        }
    }

    /// Convenience constructor for HTML sources.
    pub fn html(id: &str, url: &str, hints: HtmlHints) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            url: url.to_string(),
            enabled: true,
            hints: ParsingHints::Html(hints),
        }
    }
}

/* ----------------------------
TOML schema
---------------------------- */

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawSource {
    id: String,
    #[serde(default)]
    name: Option<String>,
    url: String,
    format: SourceFormat,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    html: Option<HtmlHints>,
    #[serde(default)]
    rss: Option<RssHints>,
}

#[derive(Debug, Deserialize)]
struct RawRegistry {
    #[serde(default)]
    sources: Vec<RawSource>,
}

impl RawSource {
    fn into_descriptor(self) -> Result<SourceDescriptor, String> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err("source with empty id".into());
        }
        url::Url::parse(self.url.trim())
            .map_err(|e| format!("source `{id}`: invalid url `{}`: {e}", self.url))?;

        let hints = match (self.format, self.html, self.rss) {
            (SourceFormat::Html, html, None) => {
                let h = html.unwrap_or_default();
                for (field, sel) in h.selectors() {
                    Selector::parse(sel).map_err(|e| {
                        format!("source `{id}`: html.{field} selector `{sel}` is invalid: {e}")
                    })?;
                }
                ParsingHints::Html(h)
            }
            (SourceFormat::Rss, None, rss) => ParsingHints::Rss(rss.unwrap_or_default()),
            (fmt, _, _) => {
                return Err(format!(
                    "source `{id}`: hints table does not match format `{}`",
                    fmt.as_str()
                ))
            }
        };

        Ok(SourceDescriptor {
            name: self
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| id.clone()),
            id,
            url: self.url.trim().to_string(),
            enabled: self.enabled,
            hints,
        })
    }
}

/// Parse and validate a `sources.toml` document.
pub(crate) fn parse_sources(s: &str) -> Result<Vec<SourceDescriptor>, String> {
    let raw: RawRegistry = toml::from_str(s).map_err(|e| e.to_string())?;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.sources.len());
    for r in raw.sources {
        let d = r.into_descriptor()?;
        if !seen.insert(d.id.to_ascii_lowercase()) {
            return Err(format!("duplicate source id `{}`", d.id));
        }
        out.push(d);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_formats_with_hints() {
        let doc = r#"
[[sources]]
id = "portal"
name = "Portal de convocatorias"
url = "https://example.org/convocatorias"
format = "html"
[sources.html]
item = "article.call"
title = "h2"
include_if_url_contains = ["convocatoria"]

[[sources]]
id = "feed"
url = "https://example.org/feed.xml"
format = "rss"
"#;
        let v = parse_sources(doc).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].format(), SourceFormat::Html);
        assert_eq!(v[1].format(), SourceFormat::Rss);
        assert_eq!(v[1].name, "feed");
        match &v[0].hints {
            ParsingHints::Html(h) => {
                assert_eq!(h.item.as_deref(), Some("article.call"));
                assert_eq!(h.min_title_len, 10);
            }
            other => panic!("unexpected hints {other:?}"),
        }
    }

    #[test]
    fn mismatched_hints_are_rejected() {
        let doc = r#"
[[sources]]
id = "feed"
url = "https://example.org/feed.xml"
format = "rss"
[sources.html]
item = "li"
"#;
        let err = parse_sources(doc).unwrap_err();
        assert!(err.contains("does not match"), "{err}");
    }

    #[test]
    fn invalid_selector_and_duplicate_ids_are_rejected() {
        let bad_sel = r#"
[[sources]]
id = "p"
url = "https://example.org/"
format = "html"
[sources.html]
item = "li[["
"#;
        assert!(parse_sources(bad_sel).unwrap_err().contains("selector"));

        let dup = r#"
[[sources]]
id = "a"
url = "https://example.org/1"
format = "rss"
[[sources]]
id = "A"
url = "https://example.org/2"
format = "rss"
"#;
        assert!(parse_sources(dup).unwrap_err().contains("duplicate"));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let doc = r#"
[[sources]]
id = "x"
url = "not a url"
format = "rss"
"#;
        assert!(parse_sources(doc).unwrap_err().contains("invalid url"));
    }
}
