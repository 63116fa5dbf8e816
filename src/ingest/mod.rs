// src/ingest/mod.rs
pub mod detect;
pub mod fetch;
pub mod providers;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

pub const TITLE_MAX_CHARS: usize = 160;
pub const DESCRIPTION_MAX_CHARS: usize = 1_200;

/// Normalize text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. nbsp)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Cap to `max` chars on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>().trim_end().to_string()
    }
}

pub fn matches_url_filter<S: AsRef<str>>(url: &str, include_if_contains: &[S]) -> bool {
    if include_if_contains.is_empty() {
        return true;
    }
    let u = url.to_lowercase();
    include_if_contains
        .iter()
        .any(|tok| u.contains(&tok.as_ref().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_entities() {
        let s = "  Convocatoria&nbsp;&nbsp; <b>abierta</b>\n\t2026 ";
        assert_eq!(normalize_text(s), "Convocatoria abierta 2026");
    }

    #[test]
    fn normalize_text_folds_quotes() {
        assert_eq!(normalize_text("«Premio» “Ciencia”"), r#""Premio" "Ciencia""#);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("investigación", 11), "investigaci");
        assert_eq!(truncate_chars("beca", 10), "beca");
    }

    #[test]
    fn url_filter_is_case_insensitive_and_open_when_empty() {
        let none: [&str; 0] = [];
        assert!(matches_url_filter("https://x.org/a", &none));
        assert!(matches_url_filter(
            "https://x.org/Convocatorias/2026",
            &["convocatoria"]
        ));
        assert!(!matches_url_filter("https://x.org/noticias", &["convocatoria"]));
    }
}
