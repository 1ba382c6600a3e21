//! Field-level helpers shared by the line and block grammars.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize one extracted segment: decode entities, drop markdown emphasis, trim.
pub fn clean_field(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    decoded
        .replace("**", "")
        .trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '`')
        .to_string()
}

/// Cleaned segment, or `default` when the segment is absent or blank.
pub fn field_or(segment: Option<&str>, default: &str) -> String {
    match segment.map(clean_field) {
        Some(s) if !s.is_empty() => s,
        _ => default.to_string(),
    }
}

/// Remove a leading list marker (`- `, `* `, `• `, `1. `, `2) `).
pub fn strip_bullet(line: &str) -> &str {
    static RE_BULLET: OnceCell<Regex> = OnceCell::new();
    let re = RE_BULLET.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*•]|\d{1,2}[.)])\s+").expect("bullet regex")
    });
    match re.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// Case-insensitive literal marker, e.g. `TITLE:`.
pub fn marker(literal: &str) -> Regex {
    Regex::new(&format!("(?i){}", regex::escape(literal))).expect("escaped marker regex")
}
