//! Uploaded session files.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::domain::traces::{NormalizedEvent, session_events, walk_nodes};
use crate::utils::json::{NULL, get_array, get_f64, get_str, parse_unbounded, value_to_text};

use super::filter::session_timestamp_ms;
use super::validate::validate;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0}")]
    Invalid(String),
    #[error("Failed to parse '{file_name}': {source}")]
    Parse {
        file_name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One uploaded observability file. Owns its raw document and never
/// changes after import.
#[derive(Debug, Clone)]
pub struct Session {
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub data: JsonValue,
    /// `sessions[0].labels`, values coerced to strings.
    pub labels: BTreeMap<String, String>,
    /// Epoch seconds.
    pub started_at: Option<f64>,
    /// Epoch seconds.
    pub ended_at: Option<f64>,
}

impl AsRef<Session> for Session {
    fn as_ref(&self) -> &Session {
        self
    }
}

impl Session {
    /// Validate and import a parsed document.
    pub fn from_upload(
        file_name: impl Into<String>,
        data: JsonValue,
        uploaded_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let file_name = file_name.into();
        let validation = validate(&data, &file_name);
        if !validation.valid {
            let reason = validation
                .error
                .unwrap_or_else(|| format!("Invalid session file '{}'", file_name));
            return Err(SessionError::Invalid(reason));
        }

        let info = data
            .get("sessions")
            .and_then(|s| s.get(0))
            .cloned()
            .unwrap_or(JsonValue::Null);

        let labels = info
            .get("labels")
            .and_then(JsonValue::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), value_to_text(v)))
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(file = %file_name, "Imported session file");

        Ok(Self {
            started_at: get_f64(&info, "started_at"),
            ended_at: get_f64(&info, "ended_at"),
            file_name,
            uploaded_at,
            data,
            labels,
        })
    }

    /// Parse raw bytes, then validate and import.
    pub fn from_slice(
        file_name: impl Into<String>,
        bytes: &[u8],
        uploaded_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let file_name = file_name.into();
        let data = parse_unbounded(bytes).map_err(|source| SessionError::Parse {
            file_name: file_name.clone(),
            source,
        })?;
        Self::from_upload(file_name, data, uploaded_at)
    }

    /// `sessions[0]`, the session header.
    pub fn info(&self) -> &JsonValue {
        get_array(&self.data, "sessions").first().unwrap_or(&NULL)
    }

    /// Session id, rendered as text when the file stores a number.
    pub fn id(&self) -> String {
        self.info().get("id").map(value_to_text).unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        get_str(self.info(), "name")
    }

    /// Label value, empty string when the session does not carry the key.
    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map(String::as_str).unwrap_or("")
    }

    /// Normalized LLM events tagged with this file's name.
    pub fn events(&self) -> Vec<NormalizedEvent> {
        session_events(&self.data, Some(&self.file_name))
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            file_name: self.file_name.clone(),
            session_id: self.id(),
            name: self.name().map(str::to_string),
            labels: self.labels.clone(),
            uploaded_at: self.uploaded_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
            timestamp_ms: session_timestamp_ms(self),
            event_count: self.events().len(),
            span_count: walk_nodes(get_array(&self.data, "trace_tree")).len(),
        }
    }
}

/// Listing entry for the session picker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub file_name: String,
    pub session_id: String,
    pub name: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub uploaded_at: DateTime<Utc>,
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
    /// Effective timestamp used by time filters, epoch ms.
    pub timestamp_ms: i64,
    pub event_count: usize,
    pub span_count: usize,
}
