// src/config/areas.rs
//! Keyword weight table (`areas_estrategicas`) and area → division map
//! (`divisiones_academicas`).

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Keyword found anywhere in the folded text.
    #[default]
    Substring,
    /// Keyword must match a whole token sequence.
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    Max,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub area: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordTable {
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub keywords: Vec<KeywordEntry>,
}

impl KeywordTable {
    pub fn new(entries: Vec<KeywordEntry>) -> Self {
        Self {
            keywords: entries,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        for k in &self.keywords {
            if k.keyword.trim().is_empty() {
                return Err("keyword entry with empty keyword".into());
            }
            if k.area.trim().is_empty() {
                return Err(format!("keyword `{}` has empty area", k.keyword));
            }
            if !k.weight.is_finite() || k.weight < 0.0 {
                return Err(format!(
                    "keyword `{}` has invalid weight {}",
                    k.keyword, k.weight
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MappingRow {
    area: String,
    division: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDivisionMap {
    #[serde(default)]
    mappings: Vec<MappingRow>,
}

/// Strategic area → organizational divisions. An area may feed several divisions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DivisionMap {
    by_area: BTreeMap<String, BTreeSet<String>>,
}

impl DivisionMap {
    pub fn from_pairs<I, A, D>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, D)>,
        A: Into<String>,
        D: Into<String>,
    {
        let mut by_area: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (a, d) in pairs {
            let a = a.into().trim().to_string();
            let d = d.into().trim().to_string();
            if a.is_empty() || d.is_empty() {
                continue;
            }
            by_area.entry(a).or_default().insert(d);
        }
        Self { by_area }
    }

    pub fn divisions_for(&self, area: &str) -> Option<&BTreeSet<String>> {
        self.by_area.get(area.trim())
    }

    pub fn len(&self) -> usize {
        self.by_area.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_area.is_empty()
    }
}

pub(crate) fn parse_keyword_table(s: &str) -> Result<KeywordTable, String> {
    let t: KeywordTable = toml::from_str(s).map_err(|e| e.to_string())?;
    t.validate()?;
    Ok(t)
}

pub(crate) fn parse_division_map(s: &str) -> Result<DivisionMap, String> {
    let raw: RawDivisionMap = toml::from_str(s).map_err(|e| e.to_string())?;
    Ok(DivisionMap::from_pairs(
        raw.mappings.into_iter().map(|m| (m.area, m.division)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_defaults_to_sum_substring() {
        let t = parse_keyword_table(
            r#"
[[keywords]]
keyword = "energía"
area = "Energía"
weight = 2
"#,
        )
        .unwrap();
        assert_eq!(t.match_mode, MatchMode::Substring);
        assert_eq!(t.aggregation, Aggregation::Sum);
        assert_eq!(t.keywords[0].weight, 2.0);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = parse_keyword_table(
            r#"
[[keywords]]
keyword = "beca"
area = "Formación"
weight = -1
"#,
        )
        .unwrap_err();
        assert!(err.contains("invalid weight"));
    }

    #[test]
    fn division_map_collects_many_to_many_and_trims() {
        let m = parse_division_map(
            r#"
[[mappings]]
area = " Energía "
division = "Ingeniería"
[[mappings]]
area = "Energía"
division = "Ciencias"
[[mappings]]
area = ""
division = "Nada"
"#,
        )
        .unwrap();
        assert_eq!(m.len(), 1);
        let d: Vec<_> = m.divisions_for("Energía").unwrap().iter().cloned().collect();
        assert_eq!(d, vec!["Ciencias".to_string(), "Ingeniería".to_string()]);
    }
}
