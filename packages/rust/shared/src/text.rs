//! Small text helpers shared by connectors and the pipeline.

use std::sync::LazyLock;

use regex::Regex;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Trim and collapse every whitespace run to a single space.
pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strict `YYYY-MM-DD` check. No calendar validation.
pub fn is_iso_date(text: &str) -> bool {
    ISO_DATE.is_match(text)
}

/// Cut `text` to at most `max_chars` characters. When anything was cut,
/// trailing whitespace is dropped and `marker` appended.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let mut out = text[..byte_idx].trim_end().to_string();
            out.push_str(marker);
            out
        }
    }
}
