// src/export/csv.rs
use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::store::CallRecord;

pub const COLUMNS: [&str; 14] = [
    "identity_key",
    "title",
    "link",
    "published_date",
    "description",
    "strategic_area_tags",
    "division",
    "relevance_score",
    "first_seen_at",
    "last_seen_at",
    "source_id",
    "detected_deadline",
    "detected_language",
    "detected_status",
];

pub const SET_SEPARATOR: &str = "; ";

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single row with RFC 4180 quoting.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    writeln!(w)
}

fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn joined<'a, I: IntoIterator<Item = &'a String>>(it: I) -> String {
    it.into_iter().map(String::as_str).collect::<Vec<_>>().join(SET_SEPARATOR)
}

fn row(r: &CallRecord) -> [String; 14] {
    [
        r.identity_key.clone(),
        r.title.clone(),
        r.link.clone(),
        r.published_date.map(|d| d.to_string()).unwrap_or_default(),
        r.description.clone(),
        joined(&r.strategic_area_tags),
        joined(&r.division),
        r.relevance_score.to_string(),
        ts(&r.first_seen_at),
        ts(&r.last_seen_at),
        r.source_id.clone(),
        r.detected_deadline.map(|d| d.to_string()).unwrap_or_default(),
        r.detected_language.clone(),
        r.detected_status.clone(),
    ]
}

/// Header plus one row per record, ordered by identity key.
pub fn render_csv(records: &[CallRecord]) -> String {
    let mut sorted: Vec<&CallRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.identity_key.cmp(&b.identity_key));

    let mut buf: Vec<u8> = Vec::new();
    let _ = write_row(&mut buf, &COLUMNS);
    for r in sorted {
        let _ = write_row(&mut buf, &row(r));
    }
    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        let mut buf = Vec::new();
        write_row(&mut buf, &["plain", "a,b", "say \"hi\"", "two\nlines"]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "plain,\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\"\n"
        );
    }

    #[test]
    fn empty_dataset_is_header_only() {
        let out = render_csv(&[]);
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("identity_key,title,link,published_date,description,"));
        assert!(out.trim_end().ends_with("detected_status"));
    }
}
