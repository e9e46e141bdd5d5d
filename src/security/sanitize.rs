//! Best-effort scrubbing of untrusted request input.
//!
//! This is a denylist filter, not an HTML parser: it removes angle brackets,
//! `javascript:` and inline event-handler assignments (`onclick=`) from every
//! string it sees. It is a mitigation layer, not a security boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

// Case folding and `\w` are ASCII-only, as in browser regexes without the
// `u` flag; `\s` still matches Unicode whitespace.
static SCRIPT_SCHEME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i-u)javascript:").ok());
static EVENT_HANDLER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i-u:on\w+)\s*=").ok());

/// Recursively sanitize a JSON value, preserving its shape.
///
/// Object keys are sanitized too; if two keys collapse to the same string the
/// one visited last wins.
#[must_use]
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(sanitize_str(&text)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (sanitize_str(&key), sanitize(value)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

#[must_use]
pub fn sanitize_str(input: &str) -> String {
    let mut text: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();

    for pattern in [&*SCRIPT_SCHEME, &*EVENT_HANDLER].into_iter().flatten() {
        if pattern.is_match(&text) {
            text = pattern.replace_all(&text, "").into_owned();
        }
    }

    text.trim().to_string()
}

/// Sanitize both sides of every pair in a URL-encoded query string.
#[must_use]
pub fn sanitize_query(query: &str) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        serializer.append_pair(&sanitize_str(&key), &sanitize_str(&value));
    }
    serializer.finish()
}

/// Like [`sanitize_query`], but `None` when no decoded pair would change, so
/// a clean query keeps its encoding as sent.
#[must_use]
pub fn sanitize_query_if_needed(query: &str) -> Option<String> {
    let dirty = url::form_urlencoded::parse(query.as_bytes())
        .any(|(key, value)| sanitize_str(&key) != key || sanitize_str(&value) != value);
    dirty.then(|| sanitize_query(query))
}
