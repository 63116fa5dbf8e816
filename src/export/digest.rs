// src/export/digest.rs
//! Markdown digest grouped by division (or strategic area).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::{DigestSettings, GroupBy};
use crate::store::CallRecord;

/// The only line that differs between renders of an unchanged store.
pub const GENERATED_PREFIX: &str = "Generated: ";
pub const UNASSIGNED_GROUP: &str = "Sin asignar";
pub const UPCOMING_HEADING: &str = "## Próximos cierres";
pub const EMPTY_NOTICE: &str = "_No hay convocatorias que cumplan los criterios._";

/// Score desc, then published date desc (undated last), then key.
pub fn digest_order(a: &CallRecord, b: &CallRecord) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| match (a.published_date, b.published_date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.identity_key.cmp(&b.identity_key))
}

fn md_escape(s: &str) -> String {
    s.replace('[', "\\[").replace(']', "\\]")
}

fn item_line(r: &CallRecord) -> String {
    let title = md_escape(&r.title);
    let mut line = if r.link.is_empty() {
        format!("- **{title}**")
    } else {
        format!("- **[{title}]({})**", r.link)
    };
    let _ = write!(line, " | score {}", r.relevance_score);
    if let Some(d) = r.published_date {
        let _ = write!(line, " | publicada {d}");
    }
    if let Some(d) = r.detected_deadline {
        let _ = write!(line, " | cierre {d}");
    }
    let _ = write!(line, " | fuente {}", r.source_id);
    line
}

/// Deadline asc, ties in digest order.
fn upcoming<'a>(records: &[&'a CallRecord], limit: usize) -> Vec<&'a CallRecord> {
    let mut dated: Vec<&CallRecord> = records
        .iter()
        .copied()
        .filter(|r| r.detected_deadline.is_some())
        .collect();
    dated.sort_by(|a, b| {
        a.detected_deadline
            .cmp(&b.detected_deadline)
            .then_with(|| digest_order(a, b))
    });
    dated.truncate(limit);
    dated
}

fn upcoming_line(r: &CallRecord) -> String {
    let deadline = r.detected_deadline.map(|d| d.to_string()).unwrap_or_default();
    let title = md_escape(&r.title);
    let title = if r.link.is_empty() {
        title
    } else {
        format!("[{title}]({})", r.link)
    };
    format!(
        "- **{deadline}** ({}) {title} | fuente {}",
        r.detected_status, r.source_id
    )
}

fn groups_of<'a>(r: &'a CallRecord, by: GroupBy) -> Vec<&'a str> {
    let set = match by {
        GroupBy::Division => &r.division,
        GroupBy::Area => &r.strategic_area_tags,
    };
    if set.is_empty() {
        vec![UNASSIGNED_GROUP]
    } else {
        set.iter().map(String::as_str).collect()
    }
}

/// Render the digest. Pure; output depends only on the records, the
/// settings and `generated_at`.
pub fn render_digest(
    records: &[CallRecord],
    settings: &DigestSettings,
    generated_at: DateTime<Utc>,
) -> String {
    let eligible: Vec<&CallRecord> = records
        .iter()
        .filter(|r| r.relevance_score >= settings.min_score)
        .collect();
    let mut groups: BTreeMap<&str, Vec<&CallRecord>> = BTreeMap::new();
    for &r in &eligible {
        for g in groups_of(r, settings.group_by) {
            groups.entry(g).or_default().push(r);
        }
    }
    // Unassigned goes last.
    let unassigned = groups.remove(UNASSIGNED_GROUP);

    let mut out = String::new();
    let _ = writeln!(out, "# {}", settings.title);
    out.push('\n');
    let _ = writeln!(
        out,
        "{GENERATED_PREFIX}{}",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    if groups.is_empty() && unassigned.is_none() {
        out.push('\n');
        let _ = writeln!(out, "{EMPTY_NOTICE}");
        return out;
    }

    let soon = upcoming(&eligible, settings.upcoming_deadlines);
    if !soon.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{UPCOMING_HEADING}");
        out.push('\n');
        for r in soon {
            let _ = writeln!(out, "{}", upcoming_line(r));
        }
    }

    let ordered = groups
        .into_iter()
        .chain(unassigned.map(|v| (UNASSIGNED_GROUP, v)));
    for (name, mut items) in ordered {
        items.sort_by(|a, b| digest_order(a, b));
        let shown = items.len().min(settings.max_items_per_group);
        out.push('\n');
        let _ = writeln!(out, "## {name}");
        out.push('\n');
        for r in &items[..shown] {
            let _ = writeln!(out, "{}", item_line(r));
        }
        if items.len() > shown {
            let _ = writeln!(out, "\n_{} más sin mostrar._", items.len() - shown);
        }
    }
    out
}
