//! Upload validation.
//!
//! The only hard gate of the pipeline. Everything after this point reads
//! the document leniently, so only the minimum needed to identify a session
//! is checked here.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Outcome of validating one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn fail(file_name: &str, reason: &str) -> Self {
        Self {
            valid: false,
            error: Some(format!("Invalid session file '{}': {}", file_name, reason)),
        }
    }
}

/// Check that a parsed document carries a non-empty `sessions` array whose
/// first element has an `id`.
///
/// `events` / `trace_tree` are deliberately not inspected.
pub fn validate(data: &JsonValue, file_name: &str) -> Validation {
    let Some(sessions) = data.get("sessions") else {
        return Validation::fail(file_name, "missing 'sessions' array");
    };
    let Some(sessions) = sessions.as_array() else {
        return Validation::fail(file_name, "'sessions' must be an array");
    };
    let Some(first) = sessions.first() else {
        return Validation::fail(file_name, "'sessions' array is empty");
    };
    if first.get("id").is_none_or(JsonValue::is_null) {
        return Validation::fail(file_name, "first session is missing 'id'");
    }
    Validation::ok()
}
