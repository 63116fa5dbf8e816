// src/classify.rs
//! Keyword scoring against the strategic-area table, plus area → division
//! mapping. Pure and deterministic: the same text and tables always give the
//! same [`Classification`].

use regex::Regex;
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use tracing::info;

use crate::config::{Aggregation, DivisionMap, KeywordTable, MatchMode};

// Dev logging gate: CLASSIFY_DEV_LOG=1 in debug builds only.
pub(crate) fn dev_logging_enabled() -> bool {
    cfg!(debug_assertions) && std::env::var("CLASSIFY_DEV_LOG").ok().as_deref() == Some("1")
}

/// Short, non-reversible id for a piece of text (first 6 bytes of SHA-256).
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn dev_log(text: &str, c: &Classification) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    let matched: Vec<&str> = c.matched_keywords.iter().take(5).map(String::as_str).collect();
    // Never log raw text.
    info!(target: "classify", %id, score = c.score, ?matched, areas = c.areas.len());
}

/// Lowercase and strip Spanish/French/Portuguese diacritics. `ñ` is kept.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\b\w+\b").unwrap());

/// Unicode word tokens.
pub fn tokenize(input: &str) -> Vec<&str> {
    TOKEN_RE.find_iter(input).map(|m| m.as_str()).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub score: f64,
    pub areas: BTreeSet<String>,
    pub divisions: BTreeSet<String>,
    /// Keywords that contributed, in table order, without repeats.
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone)]
struct CompiledKeyword {
    keyword: String,
    folded: String,
    tokens: Vec<String>,
    area: String,
    weight: f64,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    match_mode: MatchMode,
    aggregation: Aggregation,
    keywords: Vec<CompiledKeyword>,
    divisions: DivisionMap,
}

impl Classifier {
    pub fn new(table: &KeywordTable, divisions: &DivisionMap) -> Self {
        let keywords = table
            .keywords
            .iter()
            .map(|k| {
                let folded = fold(k.keyword.trim());
                let tokens = tokenize(&folded).into_iter().map(str::to_string).collect();
                CompiledKeyword {
                    keyword: k.keyword.trim().to_string(),
                    folded,
                    tokens,
                    area: k.area.trim().to_string(),
                    weight: k.weight,
                }
            })
            .collect();
        Self {
            match_mode: table.match_mode,
            aggregation: table.aggregation,
            keywords,
            divisions: divisions.clone(),
        }
    }

    fn matches(&self, kw: &CompiledKeyword, folded: &str, tokens: &[&str]) -> bool {
        match self.match_mode {
            MatchMode::Substring => !kw.folded.is_empty() && folded.contains(&kw.folded),
            MatchMode::Token => {
                let n = kw.tokens.len();
                n > 0
                    && tokens.len() >= n
                    && tokens
                        .windows(n)
                        .any(|w| w.iter().zip(&kw.tokens).all(|(a, b)| *a == b.as_str()))
            }
        }
    }

    /// Score title + description. A keyword contributes at most once.
    pub fn classify(&self, title: &str, description: &str) -> Classification {
        let text = format!("{title}\n{description}");
        let folded = fold(&text);
        let tokens = match self.match_mode {
            MatchMode::Token => tokenize(&folded),
            MatchMode::Substring => Vec::new(),
        };

        let mut out = Classification::default();
        for kw in &self.keywords {
            if !self.matches(kw, &folded, &tokens) {
                continue;
            }
            out.score = match self.aggregation {
                Aggregation::Sum => out.score + kw.weight,
                Aggregation::Max => out.score.max(kw.weight),
            };
            out.areas.insert(kw.area.clone());
            if !out.matched_keywords.contains(&kw.keyword) {
                out.matched_keywords.push(kw.keyword.clone());
            }
        }
        for area in &out.areas {
            if let Some(divs) = self.divisions.divisions_for(area) {
                out.divisions.extend(divs.iter().cloned());
            }
        }

        dev_log(&text, &out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordEntry;

    fn kw(k: &str, area: &str, w: f64) -> KeywordEntry {
        KeywordEntry {
            keyword: k.into(),
            area: area.into(),
            weight: w,
        }
    }

    #[test]
    fn fold_strips_accents_keeps_enye() {
        assert_eq!(fold("Investigación ENERGÍA Niño"), "investigacion energia niño");
    }

    #[test]
    fn additive_example() {
        let table = KeywordTable::new(vec![
            kw("energía", "Energía", 2.0),
            kw("investigación", "Ciencia", 1.0),
            kw("salud", "Salud", 5.0),
        ]);
        let divs = DivisionMap::from_pairs([("Energía", "Ingeniería"), ("Ciencia", "Ciencias Básicas")]);
        let c = Classifier::new(&table, &divs).classify(
            "Convocatoria de investigación en energías renovables",
            "",
        );
        assert_eq!(c.score, 3.0);
        assert_eq!(c.matched_keywords, vec!["energía", "investigación"]);
        assert!(c.divisions.contains("Ingeniería"));
        assert!(c.divisions.contains("Ciencias Básicas"));
    }

    #[test]
    fn keyword_counts_once_and_max_aggregation() {
        let mut table = KeywordTable::new(vec![kw("beca", "Formación", 1.5), kw("posgrado", "Formación", 4.0)]);
        let c = Classifier::new(&table, &DivisionMap::default())
            .classify("Beca beca BECA de posgrado", "beca");
        assert_eq!(c.score, 5.5);

        table.aggregation = Aggregation::Max;
        let c = Classifier::new(&table, &DivisionMap::default())
            .classify("Beca beca BECA de posgrado", "beca");
        assert_eq!(c.score, 4.0);
        assert_eq!(c.areas.len(), 1);
    }

    #[test]
    fn token_mode_requires_whole_words() {
        let mut table = KeywordTable::new(vec![kw("agua", "Medio ambiente", 1.0), kw("cambio climático", "Medio ambiente", 2.0)]);
        table.match_mode = MatchMode::Token;
        let cls = Classifier::new(&table, &DivisionMap::default());
        assert_eq!(cls.classify("Paraguayos en el extranjero", "").score, 0.0);
        assert_eq!(cls.classify("Estudios sobre el Cambio Climatico y el agua", "").score, 3.0);
    }

    #[test]
    fn no_match_scores_zero_with_empty_sets() {
        let table = KeywordTable::new(vec![kw("energía", "Energía", 2.0)]);
        let c = Classifier::new(&table, &DivisionMap::default()).classify("Premio literario", "");
        assert_eq!(c, Classification::default());
    }

    #[test]
    fn anon_hash_is_short_hex() {
        let h = anon_hash("texto");
        assert_eq!(h.len(), 12);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
