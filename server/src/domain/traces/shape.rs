//! Request shape classification.
//!
//! Provider SDKs record their request payloads verbatim, so the same field
//! ("what did the user ask") lives in `messages`, `contents` or `input`
//! depending on who made the call. The classifier looks at which fields are
//! present once, and every extractor dispatches on the resulting variant.

use serde_json::Value as JsonValue;

use crate::utils::json::{get_path, get_str, value_to_text};

/// Sentinel prompt for requests with nothing recognizable.
pub const PROMPT_NOT_AVAILABLE: &str = "N/A";

/// Separator used when an embeddings request carries several inputs.
const EMBEDDING_INPUT_SEPARATOR: &str = " | ";

/// Request payload, classified by the fields it carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestShape<'a> {
    /// `messages: [{role, content}]` (OpenAI / Anthropic chat style)
    OpenAiChat(&'a [JsonValue]),
    /// `input: string | [string]` (embeddings endpoints)
    OpenAiEmbedding(&'a JsonValue),
    /// `contents: ...` (Gemini generate_content)
    GeminiGenerate(&'a JsonValue),
    Unknown,
}

impl<'a> RequestShape<'a> {
    /// Classify a request payload. `messages` must be an array to count as
    /// chat; `contents` and `input` count whenever they are non-null.
    pub fn classify(request: &'a JsonValue) -> Self {
        if let Some(messages) = request.get("messages").and_then(JsonValue::as_array) {
            return Self::OpenAiChat(messages);
        }
        if let Some(contents) = request.get("contents").filter(|v| !v.is_null()) {
            return Self::GeminiGenerate(contents);
        }
        if let Some(input) = request.get("input").filter(|v| !v.is_null()) {
            return Self::OpenAiEmbedding(input);
        }
        Self::Unknown
    }

    /// User-facing prompt text.
    ///
    /// - chat: last `user` message, else the first message
    /// - Gemini: `contents` verbatim
    /// - embeddings: inputs joined with `" | "`
    pub fn prompt(&self) -> String {
        match self {
            Self::OpenAiChat(messages) => messages
                .iter()
                .rev()
                .find(|m| get_str(m, "role") == Some("user"))
                .or_else(|| messages.first())
                .and_then(|m| m.get("content"))
                .map(message_content_text)
                .unwrap_or_else(|| PROMPT_NOT_AVAILABLE.to_string()),
            Self::GeminiGenerate(contents) => value_to_text(contents),
            Self::OpenAiEmbedding(input) => match input {
                JsonValue::Array(items) => items
                    .iter()
                    .map(value_to_text)
                    .collect::<Vec<_>>()
                    .join(EMBEDDING_INPUT_SEPARATOR),
                other => value_to_text(other),
            },
            Self::Unknown => PROMPT_NOT_AVAILABLE.to_string(),
        }
    }
}

/// System prompt of a request: the first `system` message, or Gemini's
/// `config.system_instruction`.
pub fn system_prompt(request: &JsonValue) -> Option<String> {
    if let RequestShape::OpenAiChat(messages) = RequestShape::classify(request)
        && let Some(system) = messages
            .iter()
            .find(|m| get_str(m, "role") == Some("system"))
    {
        return system.get("content").map(message_content_text);
    }

    get_path(request, &["config", "system_instruction"])
        .filter(|v| !v.is_null())
        .map(value_to_text)
}

/// Flatten message content. Multi-part content (`[{type: "text", text}]`)
/// keeps only its text parts, one per line; anything else renders as text.
fn message_content_text(content: &JsonValue) -> String {
    match content {
        JsonValue::Array(parts) => {
            let texts: Vec<&str> = parts.iter().filter_map(|p| get_str(p, "text")).collect();
            if texts.is_empty() {
                value_to_text(content)
            } else {
                texts.join("\n")
            }
        }
        other => value_to_text(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_chat_requires_array() {
        let req = json!({"messages": [{"role": "user", "content": "hi"}]});
        assert!(matches!(
            RequestShape::classify(&req),
            RequestShape::OpenAiChat(_)
        ));

        let req = json!({"messages": "not-an-array", "input": "x"});
        assert!(matches!(
            RequestShape::classify(&req),
            RequestShape::OpenAiEmbedding(_)
        ));
    }

    #[test]
    fn test_classify_priority_contents_before_input() {
        let req = json!({"contents": "hello", "input": "ignored"});
        assert!(matches!(
            RequestShape::classify(&req),
            RequestShape::GeminiGenerate(_)
        ));
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(RequestShape::classify(&json!({})), RequestShape::Unknown);
        assert_eq!(RequestShape::classify(&json!(null)), RequestShape::Unknown);
        assert_eq!(
            RequestShape::classify(&json!({"contents": null})),
            RequestShape::Unknown
        );
    }

    #[test]
    fn test_chat_prompt_takes_last_user_message() {
        let req = json!({"messages": [
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": "first"},
            {"role": "assistant", "content": "ok"},
            {"role": "user", "content": "second"}
        ]});
        assert_eq!(RequestShape::classify(&req).prompt(), "second");
    }

    #[test]
    fn test_chat_prompt_falls_back_to_first_message() {
        let req = json!({"messages": [
            {"role": "system", "content": "only system"},
            {"role": "assistant", "content": "reply"}
        ]});
        assert_eq!(RequestShape::classify(&req).prompt(), "only system");
    }

    #[test]
    fn test_chat_prompt_empty_messages() {
        let req = json!({"messages": []});
        assert_eq!(RequestShape::classify(&req).prompt(), PROMPT_NOT_AVAILABLE);
    }

    #[test]
    fn test_chat_prompt_multipart_content() {
        let req = json!({"messages": [{"role": "user", "content": [
            {"type": "text", "text": "describe"},
            {"type": "image_url", "image_url": {"url": "x"}},
            {"type": "text", "text": "this image"}
        ]}]});
        assert_eq!(RequestShape::classify(&req).prompt(), "describe\nthis image");
    }

    #[test]
    fn test_gemini_prompt_verbatim() {
        let req = json!({"contents": "Summarize the report"});
        assert_eq!(RequestShape::classify(&req).prompt(), "Summarize the report");

        let req = json!({"contents": [{"parts": [{"text": "hi"}]}]});
        assert_eq!(
            RequestShape::classify(&req).prompt(),
            r#"[{"parts":[{"text":"hi"}]}]"#
        );
    }

    #[test]
    fn test_embedding_prompt_joins_inputs() {
        let req = json!({"input": ["alpha", "beta", "gamma"]});
        assert_eq!(RequestShape::classify(&req).prompt(), "alpha | beta | gamma");

        let req = json!({"input": "single"});
        assert_eq!(RequestShape::classify(&req).prompt(), "single");
    }

    #[test]
    fn test_system_prompt_from_messages() {
        let req = json!({"messages": [
            {"role": "user", "content": "q"},
            {"role": "system", "content": "You are terse."},
            {"role": "system", "content": "second system"}
        ]});
        assert_eq!(system_prompt(&req), Some("You are terse.".to_string()));
    }

    #[test]
    fn test_system_prompt_from_gemini_config() {
        let req = json!({
            "contents": "q",
            "config": {"system_instruction": "Answer in French."}
        });
        assert_eq!(system_prompt(&req), Some("Answer in French.".to_string()));
    }

    #[test]
    fn test_system_prompt_absent() {
        let req = json!({"messages": [{"role": "user", "content": "q"}]});
        assert_eq!(system_prompt(&req), None);
        assert_eq!(system_prompt(&json!({})), None);
    }
}
