// tests/providers_html.rs
use chrono::NaiveDate;
use convocatorias_monitor::config::{HtmlHints, SourceDescriptor};
use convocatorias_monitor::ingest::providers::extract;

const PORTAL: &str = include_str!("fixtures/portal.html");
const EMPTY: &str = include_str!("fixtures/empty_page.html");

fn container_hints() -> HtmlHints {
    HtmlHints {
        item: Some("article.convocatoria".into()),
        title: Some("h2".into()),
        date: Some("time".into()),
        description: Some("p".into()),
        ..HtmlHints::default()
    }
}

#[test]
fn container_mode_extracts_and_resolves_links() {
    let src = SourceDescriptor::html("portal", "https://portal.example.org/convocatorias/", container_hints());
    let ok: Vec<_> = extract(&src, PORTAL, 30).unwrap().filter_map(Result::ok).collect();

    assert_eq!(ok.len(), 2, "mailto item is dropped");
    assert_eq!(ok[0].title, "Convocatoria salud digital e inteligencia artificial");
    assert_eq!(ok[0].link, "https://portal.example.org/convocatorias/salud-digital");
    assert_eq!(ok[0].published_date, NaiveDate::from_ymd_opt(2026, 2, 15));
    assert!(ok[0].raw_description.starts_with("Financiamiento para proyectos biomédicos"));

    assert_eq!(
        ok[1].link,
        "https://portal.example.org/convocatorias/convocatorias/ciencia-frontera?fbclid=abc"
    );
    assert_eq!(ok[1].published_date, NaiveDate::from_ymd_opt(2026, 3, 1));
}

#[test]
fn anchor_mode_skips_navigation_and_filters_urls() {
    let hints = HtmlHints {
        include_if_url_contains: vec!["convocatoria".into()],
        ..HtmlHints::default()
    };
    let src = SourceDescriptor::html("portal", "https://portal.example.org/", hints);
    let ok: Vec<_> = extract(&src, PORTAL, 30).unwrap().filter_map(Result::ok).collect();
    let titles: Vec<_> = ok.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        [
            "Convocatoria salud digital e inteligencia artificial",
            "Ciencia de frontera 2026"
        ]
    );
    // Context comes from the enclosing <article>.
    assert!(ok[0].raw_description.contains("Fecha límite: 31 de mayo de 2026"));
}

#[test]
fn anchor_mode_without_filter_keeps_long_nav_links() {
    let src = SourceDescriptor::html("portal", "https://portal.example.org/", HtmlHints::default());
    let ok: Vec<_> = extract(&src, PORTAL, 30).unwrap().filter_map(Result::ok).collect();
    assert_eq!(ok.len(), 3);
    assert!(ok.iter().any(|c| c.title == "Informe anual de actividades 2025"));
}

#[test]
fn page_without_calls_yields_nothing() {
    let src = SourceDescriptor::html("vacio", "https://portal.example.org/", HtmlHints::default());
    assert_eq!(extract(&src, EMPTY, 30).unwrap().count(), 0);
}
