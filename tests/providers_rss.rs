// tests/providers_rss.rs
use chrono::NaiveDate;
use convocatorias_monitor::config::{ParsingHints, RssHints, SourceDescriptor};
use convocatorias_monitor::error::ExtractionError;
use convocatorias_monitor::ingest::providers::extract;

const RSS: &str = include_str!("fixtures/convocatorias_rss.xml");
const ATOM: &str = include_str!("fixtures/grants_atom.xml");

fn feed(id: &str) -> SourceDescriptor {
    SourceDescriptor::rss(id, "https://fondos.example.org/feed.xml")
}

#[test]
fn rss_items_are_normalized_and_malformed_ones_skipped() {
    let out: Vec<_> = extract(&feed("fondos"), RSS, 30).unwrap().collect();
    assert_eq!(out.len(), 4);
    assert!(matches!(out[2], Err(ExtractionError::MalformedItem(_))));

    let first = out[0].as_ref().unwrap();
    assert_eq!(first.source_id, "fondos");
    assert_eq!(first.title, "Convocatoria de investigación en energías renovables");
    assert_eq!(
        first.published_date,
        NaiveDate::from_ymd_opt(2026, 3, 2)
    );
    assert_eq!(
        first.raw_description,
        "Apoyo a proyectos de investigación. Fecha límite: 30 de abril de 2026."
    );
}

#[test]
fn max_items_counts_valid_items_only() {
    let ok: Vec<_> = extract(&feed("fondos"), RSS, 3)
        .unwrap()
        .filter_map(Result::ok)
        .collect();
    assert_eq!(ok.len(), 3);

    let capped: Vec<_> = extract(&feed("fondos"), RSS, 1).unwrap().collect();
    assert_eq!(capped.len(), 1);
}

#[test]
fn url_filter_from_rss_hints() {
    let mut src = feed("fondos");
    src.hints = ParsingHints::Rss(RssHints {
        include_if_url_contains: vec!["becas".into()],
    });
    let ok: Vec<_> = extract(&src, RSS, 30).unwrap().filter_map(Result::ok).collect();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].title, "Becas de posgrado en el extranjero");
}

#[test]
fn atom_entries_use_alternate_link_and_fallback_dates() {
    let ok: Vec<_> = extract(&feed("grants"), ATOM, 30)
        .unwrap()
        .filter_map(Result::ok)
        .collect();
    assert_eq!(ok.len(), 2);
    assert_eq!(ok[0].link, "https://grants.example.com/calls/77");
    assert_eq!(ok[0].published_date, NaiveDate::from_ymd_opt(2026, 2, 10));
    assert_eq!(ok[1].published_date, NaiveDate::from_ymd_opt(2026, 2, 12));
    assert_eq!(ok[1].raw_description, "Open call. Due date: 2026-07-15.");
}

#[test]
fn html_payload_on_rss_source_is_a_payload_error() {
    let err = extract(&feed("x"), include_str!("fixtures/portal.html"), 30)
        .err()
        .expect("payload error");
    assert!(matches!(err, ExtractionError::MalformedPayload { format: "rss", .. }));
}

#[test]
fn one_unusual_item_does_not_sink_the_feed() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Fondos</title>
<item>
  <title>Convocatoria &laquo;Ciencia abierta&raquo; 2026</title>
  <link>https://fondos.example.org/ciencia-abierta</link>
  <link>https://fondos.example.org/ciencia-abierta?utm_source=rss</link>
  <description>Consulta los requisitos&hellip; Monto: 50 000 &euro;. &copy; Fondos &marca;</description>
</item>
<item>
  <title>Becas de movilidad</title>
  <link>https://fondos.example.org/movilidad</link>
</item>
</channel></rss>"#;

    let out: Vec<_> = extract(&feed("fondos"), xml, 30).unwrap().collect();
    assert_eq!(out.len(), 2);

    let first = out[0].as_ref().unwrap();
    assert_eq!(first.title, r#"Convocatoria "Ciencia abierta" 2026"#);
    assert_eq!(first.link, "https://fondos.example.org/ciencia-abierta");
    assert!(first.raw_description.contains("requisitos…"));
    assert!(first.raw_description.contains("50 000 €"));
    assert!(first.raw_description.ends_with("Fondos &marca;"));

    let second = out[1].as_ref().unwrap();
    assert_eq!(second.title, "Becas de movilidad");
}
