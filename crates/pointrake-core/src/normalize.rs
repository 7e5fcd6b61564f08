//! Text and value normalization shared by the extractors and the
//! reconciliation engine.
//!
//! Descriptions are canonicalized at extraction time; signature values are
//! canonicalized again at ingestion time so that records written by older
//! runs (or by hand) still compare equal.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

fn open_paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([^\s])\(").expect("invalid open paren regex"))
}

fn close_paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+\)").expect("invalid close paren regex"))
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("invalid iso date regex"))
}

/// Fold full-width Latin/punctuation (U+FF01..=U+FF5E) and the ideographic
/// space to their half-width forms.
#[must_use]
pub fn fold_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '！'..='～' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '　' => ' ',
            _ => c,
        })
        .collect()
}

/// Canonical description text: width folding, whitespace collapse, and
/// bracket spacing (space before an opening parenthesis that follows a
/// non-space, no space before a closing parenthesis).
#[must_use]
pub fn description(text: &str) -> String {
    let folded = fold_width(text);
    let collapsed = ws_re().replace_all(folded.trim(), " ").into_owned();
    let spaced = open_paren_re().replace_all(&collapsed, "${1} (").into_owned();
    let tightened = close_paren_re().replace_all(&spaced, ")").into_owned();
    tightened.trim().to_string()
}

/// Signature form of a stored cell or string value. A string that is exactly
/// `YYYY-MM-DD` is rewritten to `YYYY/MM/DD`; everything else is trimmed
/// as-is.
#[must_use]
pub fn signature_text(raw: &str) -> String {
    if iso_date_re().is_match(raw) {
        raw.replace('-', "/")
    } else {
        raw.trim().to_string()
    }
}

/// Signature form of an arbitrary record value: strings via
/// [`signature_text`], numbers and booleans stringified, everything else
/// coerced to its JSON string form.
#[must_use]
pub fn signature_value(value: &Value) -> String {
    match value {
        Value::String(s) => signature_text(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
