//! Line format for persisted feedback: one `word:score` record per line.
//!
//! An empty store is written as a single blank line. Readers ignore any line
//! without a separator or with a score that does not parse into range.

use crate::types::{ScoreRecord, SourceId};

/// Contents written for a store with no records.
pub const EMPTY_STORE: &str = "\n";

/// Parse one line. The word is everything before the last `:`.
pub fn parse_line(line: &str, source: SourceId) -> Option<ScoreRecord> {
    let line = line.trim();
    let (word, score) = line.rsplit_once(':')?;
    let score: f64 = score.trim().parse().ok()?;
    ScoreRecord::new(word, score, source)
}

/// Parse a whole store, skipping malformed lines.
pub fn parse_records(text: &str, source: SourceId) -> Vec<ScoreRecord> {
    text.lines().filter_map(|l| parse_line(l, source)).collect()
}

pub fn render_records(records: &[ScoreRecord]) -> String {
    if records.is_empty() {
        return EMPTY_STORE.to_string();
    }
    let mut out = String::new();
    for r in records {
        out.push_str(&format!("{}:{}\n", r.word, r.score));
    }
    out
}
