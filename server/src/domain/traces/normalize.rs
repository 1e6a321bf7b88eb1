//! Canonical event model.
//!
//! Turns one raw trace node (or flat `events[]` entry) into a
//! [`NormalizedEvent`]. Token usage is read from whichever naming the
//! provider used; every missing field degrades to a default.

use std::ops::AddAssign;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::utils::json::{NULL, first_count, get_array, get_f64, get_path, get_str};

use super::shape::{RequestShape, system_prompt};

/// API name of embedding calls. These never produce output tokens.
pub const EMBEDDINGS_API: &str = "embeddings.create";

/// Placeholder for a provider or model the node does not name.
pub const UNKNOWN: &str = "unknown";

// ============================================================================
// USAGE KEYS
// ============================================================================

mod usage_keys {
    pub const TOTAL: &[&str] = &["total_tokens", "total_token_count"];
    pub const INPUT: &[&str] = &["prompt_tokens", "prompt_token_count", "input_tokens"];
    pub const OUTPUT: &[&str] = &[
        "completion_tokens",
        "candidates_token_count",
        "output_tokens",
    ];
    pub const CACHED: &[&str] = &["cached_content_token_count", "cached_tokens"];
    pub const REASONING: &[&str] = &["thoughts_token_count", "reasoning_tokens"];
    pub const TOOL_USE: &[&str] = &["tool_use_prompt_token_count"];
}

// ============================================================================
// TYPES
// ============================================================================

/// Token counters of one call. All counters are non-negative and default
/// to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(rename = "tokens")]
    pub total: u64,
    #[serde(rename = "inputTokens")]
    pub input: u64,
    #[serde(rename = "outputTokens")]
    pub output: u64,
    #[serde(rename = "cachedTokens")]
    pub cached: u64,
    #[serde(rename = "reasoningTokens")]
    pub reasoning: u64,
    #[serde(rename = "toolUseTokens")]
    pub tool_use: u64,
}

impl TokenUsage {
    /// Read a `usage` object in either OpenAI or Gemini naming.
    ///
    /// OpenAI nests cached and reasoning counts under
    /// `prompt_tokens_details` / `completion_tokens_details`; those are used
    /// when the flat keys are absent.
    pub fn from_usage(usage: &JsonValue) -> Self {
        let cached = first_count(usage, usage_keys::CACHED).or_else(|| {
            get_path(usage, &["prompt_tokens_details"])
                .and_then(|d| first_count(d, &["cached_tokens"]))
        });
        let reasoning = first_count(usage, usage_keys::REASONING).or_else(|| {
            get_path(usage, &["completion_tokens_details"])
                .and_then(|d| first_count(d, &["reasoning_tokens"]))
        });

        Self {
            total: first_count(usage, usage_keys::TOTAL).unwrap_or(0),
            input: first_count(usage, usage_keys::INPUT).unwrap_or(0),
            output: first_count(usage, usage_keys::OUTPUT).unwrap_or(0),
            cached: cached.unwrap_or(0),
            reasoning: reasoning.unwrap_or(0),
            tool_use: first_count(usage, usage_keys::TOOL_USE).unwrap_or(0),
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.input += other.input;
        self.output += other.output;
        self.cached += other.cached;
        self.reasoning += other.reasoning;
        self.tool_use += other.tool_use;
    }
}

/// Provider-independent view of one LLM call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub api: String,
    pub provider: String,
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(flatten)]
    pub usage: TokenUsage,
    pub embedding_dimensions: Option<u64>,
    #[serde(rename = "duration_ms")]
    pub duration_ms: f64,
    #[serde(rename = "started_at")]
    pub started_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

impl NormalizedEvent {
    pub fn is_embedding(&self) -> bool {
        self.api == EMBEDDINGS_API
    }

    /// Tag the event with the session it came from (aggregated views).
    pub fn with_session(mut self, session_name: Option<&str>) -> Self {
        self.session_name = session_name.map(str::to_string);
        self
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Project a raw node onto the canonical event model.
///
/// Pure and infallible: a node with no usable fields still yields an event
/// with `"unknown"` provider/model, `"N/A"` prompt and zero tokens.
pub fn normalize(node: &JsonValue) -> NormalizedEvent {
    let request = node.get("request").unwrap_or(&NULL);
    let response = node.get("response").unwrap_or(&NULL);

    let api = get_str(node, "api").unwrap_or_default().to_string();
    let is_embedding = api == EMBEDDINGS_API;

    let mut usage = response
        .get("usage")
        .map(TokenUsage::from_usage)
        .unwrap_or_default();
    if is_embedding {
        usage.output = 0;
    }

    NormalizedEvent {
        provider: get_str(node, "provider").unwrap_or(UNKNOWN).to_string(),
        model: model_name(request, response),
        prompt: RequestShape::classify(request).prompt(),
        system_prompt: system_prompt(request),
        usage,
        embedding_dimensions: if is_embedding {
            embedding_dimensions(response)
        } else {
            None
        },
        duration_ms: get_f64(node, "duration_ms").unwrap_or(0.0).max(0.0),
        started_at: get_f64(node, "started_at"),
        span_id: get_str(node, "span_id").map(str::to_string),
        error: error_text(node),
        session_name: None,
        api,
    }
}

fn model_name(request: &JsonValue, response: &JsonValue) -> String {
    get_str(request, "model")
        .or_else(|| get_str(response, "model"))
        .filter(|m| !m.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// `response.embedding_dimensions`, else the length of the first returned
/// vector.
fn embedding_dimensions(response: &JsonValue) -> Option<u64> {
    first_count(response, &["embedding_dimensions"]).or_else(|| {
        get_array(response, "data")
            .first()
            .and_then(|d| d.get("embedding"))
            .and_then(JsonValue::as_array)
            .map(|v| v.len() as u64)
    })
}

fn error_text(node: &JsonValue) -> Option<String> {
    match node.get("error")? {
        JsonValue::Null => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        other => get_str(other, "message")
            .map(str::to_string)
            .or_else(|| Some(other.to_string())),
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
