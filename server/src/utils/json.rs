//! Lenient JSON accessors
//!
//! Session files come from many SDK versions and providers, so every read
//! goes through these helpers. None of them fail: a missing or mistyped
//! field reads as `None` (or 0 for counters) and the caller picks a default.

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Shared null for accessors that must hand out a reference.
pub static NULL: JsonValue = JsonValue::Null;

/// Parse a JSON document with no nesting limit.
///
/// Trace trees nest two JSON levels per span, so serde_json's default limit
/// of 128 rejects real sessions. `serde_stacker` grows the stack while
/// parsing instead.
pub fn parse_unbounded(bytes: &[u8]) -> serde_json::Result<JsonValue> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    deserializer.disable_recursion_limit();
    let value = JsonValue::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

/// Walk a chain of object keys.
pub fn get_path<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Non-null string field.
pub fn get_str<'a>(value: &'a JsonValue, key: &str) -> Option<&'a str> {
    value.get(key).and_then(JsonValue::as_str)
}

/// Numeric field as f64. Numeric strings are accepted since some exporters
/// stringify numbers.
pub fn get_f64(value: &JsonValue, key: &str) -> Option<f64> {
    value.get(key).and_then(as_f64)
}

pub fn as_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Read a token counter. Negative, fractional-negative and non-numeric
/// values read as `None`; fractional positives are truncated.
pub fn as_count(value: &JsonValue) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    as_f64(value).filter(|v| *v >= 0.0).map(|v| v.trunc() as u64)
}

/// First key present (and readable as a counter) wins.
pub fn first_count(value: &JsonValue, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(as_count))
}

/// Flag that is only set when literally `true`.
pub fn is_true(value: &JsonValue, key: &str) -> bool {
    value.get(key).and_then(JsonValue::as_bool).unwrap_or(false)
}

/// Array field, empty when absent or not an array.
pub fn get_array<'a>(value: &'a JsonValue, key: &str) -> &'a [JsonValue] {
    value
        .get(key)
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Render a value as display text: strings verbatim, null as empty,
/// everything else as compact JSON.
pub fn value_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}
