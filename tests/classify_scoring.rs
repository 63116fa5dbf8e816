// tests/classify_scoring.rs
use convocatorias_monitor::classify::Classifier;
use convocatorias_monitor::config::{Aggregation, DivisionMap, KeywordEntry, KeywordTable};

fn table() -> KeywordTable {
    KeywordTable::new(vec![
        KeywordEntry {
            keyword: "energía".into(),
            area: "Energía y sustentabilidad".into(),
            weight: 2.0,
        },
        KeywordEntry {
            keyword: "investigación".into(),
            area: "Ciencia básica".into(),
            weight: 1.0,
        },
        KeywordEntry {
            keyword: "salud".into(),
            area: "Salud".into(),
            weight: 3.0,
        },
    ])
}

fn divisions() -> DivisionMap {
    DivisionMap::from_pairs([
        ("Energía y sustentabilidad", "Ingeniería"),
        ("Ciencia básica", "Ciencias Básicas"),
        ("Ciencia básica", "Posgrado"),
        ("Salud", "Ciencias de la Salud"),
    ])
}

#[test]
fn additive_score_and_mapped_divisions() {
    let c = Classifier::new(&table(), &divisions())
        .classify("Convocatoria de investigación en energías renovables", "");
    assert_eq!(c.score, 3.0);
    let areas: Vec<_> = c.areas.iter().map(String::as_str).collect();
    assert_eq!(areas, ["Ciencia básica", "Energía y sustentabilidad"]);
    let divs: Vec<_> = c.divisions.iter().map(String::as_str).collect();
    assert_eq!(divs, ["Ciencias Básicas", "Ingeniería", "Posgrado"]);
}

#[test]
fn accents_and_case_do_not_matter() {
    let cls = Classifier::new(&table(), &divisions());
    let a = cls.classify("INVESTIGACION EN ENERGIA", "");
    let b = cls.classify("investigación en energía", "");
    assert_eq!(a, b);
    assert_eq!(a.score, 3.0);
}

#[test]
fn description_counts_too() {
    let c = Classifier::new(&table(), &divisions()).classify("Convocatoria 2026", "Proyectos de salud pública");
    assert_eq!(c.score, 3.0);
    assert!(c.divisions.contains("Ciencias de la Salud"));
}

#[test]
fn scoring_is_deterministic() {
    let cls = Classifier::new(&table(), &divisions());
    let first = cls.classify("Salud, energía e investigación", "energía de nuevo");
    for _ in 0..20 {
        assert_eq!(cls.classify("Salud, energía e investigación", "energía de nuevo"), first);
    }
    let rebuilt = Classifier::new(&table(), &divisions());
    assert_eq!(rebuilt.classify("Salud, energía e investigación", "energía de nuevo"), first);
}

#[test]
fn max_aggregation_takes_heaviest_keyword() {
    let mut t = table();
    t.aggregation = Aggregation::Max;
    let c = Classifier::new(&t, &divisions()).classify("Salud, energía e investigación", "");
    assert_eq!(c.score, 3.0);
    assert_eq!(c.areas.len(), 3);
}

#[test]
fn unmatched_area_has_no_division() {
    let c = Classifier::new(&table(), &DivisionMap::default())
        .classify("investigación", "");
    assert_eq!(c.score, 1.0);
    assert!(c.divisions.is_empty());
    assert_eq!(c.matched_keywords, vec!["investigación"]);
}
