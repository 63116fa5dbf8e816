// tests/store_merge.rs
use std::collections::BTreeSet;
use std::fs;

use chrono::{DateTime, TimeZone, Utc};
use convocatorias_monitor::error::StoreError;
use convocatorias_monitor::store::{CallStore, MergeOutcome, ScoredCall, SCHEMA_VERSION};

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, day, 6, 0, 0).unwrap()
}

fn call(source: &str, title: &str, link: &str, score: f64) -> ScoredCall {
    ScoredCall {
        source_id: source.into(),
        title: title.into(),
        link: link.into(),
        published_date: None,
        description: format!("{title} (descripción)"),
        areas: BTreeSet::from(["Ciencia básica".to_string()]),
        divisions: BTreeSet::from(["Ciencias Básicas".to_string()]),
        score,
        matched_keywords: vec!["investigación".into()],
        detected_deadline: None,
        detected_language: "es".into(),
        detected_status: "open".into(),
    }
}

#[test]
fn links_differing_in_case_and_whitespace_merge_into_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CallStore::load(dir.path().join("calls.json")).unwrap();

    let mut batch = store.begin(at(1));
    assert_eq!(
        batch.merge(call("portal", "Beca A", "https://portal.example.org/Becas/A", 1.0)),
        MergeOutcome::Added
    );
    assert_eq!(
        batch.merge(call("portal", "Beca A", "  https://PORTAL.example.org/becas/a ", 1.0)),
        MergeOutcome::Collapsed
    );
    let stats = batch.commit().unwrap();
    assert_eq!(stats.added, 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn existing_record_seen_twice_in_one_cycle_counts_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CallStore::load(dir.path().join("calls.json")).unwrap();

    let mut b = store.begin(at(1));
    b.merge(call("portal", "Beca A", "https://portal.example.org/becas/a", 1.0));
    b.merge(call("portal", "Beca B", "https://portal.example.org/becas/b", 1.0));
    b.commit().unwrap();

    let mut b = store.begin(at(2));
    assert_eq!(
        b.merge(call("portal", "Beca A", "https://portal.example.org/becas/a", 2.0)),
        MergeOutcome::Updated
    );
    assert_eq!(
        b.merge(call("portal", "Beca A", "https://portal.example.org/becas/a#info", 2.0)),
        MergeOutcome::Collapsed
    );
    assert_eq!(
        b.merge(call("portal", "Beca B", "https://portal.example.org/becas/b", 1.0)),
        MergeOutcome::Unchanged
    );
    assert_eq!(
        b.merge(call("portal", "Beca B", "https://portal.example.org/becas/b", 1.0)),
        MergeOutcome::Collapsed
    );
    let stats = b.commit().unwrap();
    assert_eq!((stats.added, stats.updated, stats.unchanged, stats.collapsed), (0, 1, 1, 2));
    assert_eq!(store.len(), 2);
}

#[test]
fn persisted_document_is_versioned_and_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("calls.json");
    let mut store = CallStore::load(&path).unwrap();
    let mut batch = store.begin(at(1));
    for i in 0..5 {
        batch.merge(call("s", &format!("Convocatoria {i}"), &format!("https://x.org/{i}"), i as f64));
    }
    batch.commit().unwrap();

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["schema_version"], SCHEMA_VERSION);
    let keys: Vec<&str> = doc["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["identity_key"].as_str().unwrap())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.len(), 5);

    // No temp files left behind.
    let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name() != "calls.json")
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn update_touches_mutable_fields_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.json");
    let mut store = CallStore::load(&path).unwrap();

    let mut b = store.begin(at(1));
    b.merge(call("s", "Título original", "https://x.org/1", 1.0));
    b.commit().unwrap();

    let mut changed = call("s", "Título nuevo", "https://x.org/1", 4.0);
    changed.description = "Descripción actualizada".into();
    changed.areas = BTreeSet::from(["Salud".to_string()]);
    changed.divisions = BTreeSet::new();
    let mut b = store.begin(at(8));
    assert_eq!(b.merge(changed), MergeOutcome::Updated);
    b.commit().unwrap();

    let reloaded = CallStore::load(&path).unwrap();
    let r = reloaded.records().next().unwrap();
    assert_eq!(r.title, "Título original");
    assert_eq!(r.description, "Descripción actualizada");
    assert_eq!(r.relevance_score, 4.0);
    assert!(r.strategic_area_tags.contains("Salud"));
    assert!(r.division.is_empty());
    assert_eq!(r.first_seen_at, at(1));
    assert_eq!(r.last_seen_at, at(8));
}

#[test]
fn uncommitted_batch_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.json");
    let mut store = CallStore::load(&path).unwrap();
    let mut b = store.begin(at(1));
    b.merge(call("s", "Uno", "https://x.org/1", 1.0));
    b.commit().unwrap();
    let before = fs::read_to_string(&path).unwrap();

    {
        let mut b = store.begin(at(2));
        b.merge(call("s", "Dos", "https://x.org/2", 1.0));
        b.merge(call("s", "Uno", "https://x.org/1", 9.0));
        // dropped here
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
    assert_eq!(store.len(), 1);
    assert_eq!(store.records().next().unwrap().relevance_score, 1.0);
}

#[test]
fn corrupt_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(CallStore::load(&path), Err(StoreError::Corrupt { .. })));

    fs::write(&path, r#"{"schema_version": 99, "records": []}"#).unwrap();
    assert!(matches!(CallStore::load(&path), Err(StoreError::Corrupt { .. })));
}
