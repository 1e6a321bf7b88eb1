//! API-key payloads of the account service.
//!
//! Backend versions wrap key lists differently; [`parse_api_key_list`] tries
//! the known shapes in order and degrades to an empty list.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    #[serde(alias = "key_id", alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Leading characters of the key, for display.
    #[serde(default, alias = "key_prefix", skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,
    #[serde(default)]
    pub revoked: bool,
}

/// Result of creating a key. `secret` is only ever returned once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedApiKey {
    pub key: ApiKey,
    pub secret: Option<String>,
}

/// Wrappers seen in list responses, tried in order.
const LIST_PATHS: &[&[&str]] = &[&[], &["api_keys"], &["keys"], &["data"], &["data", "api_keys"]];

/// Parse a key-list response body. Entries that do not parse are skipped.
pub fn parse_api_key_list(body: &JsonValue) -> Vec<ApiKey> {
    let list = LIST_PATHS.iter().find_map(|path| {
        path.iter()
            .try_fold(body, |v, key| v.get(*key))
            .and_then(JsonValue::as_array)
    });

    let Some(list) = list else {
        tracing::warn!(
            body = %truncate(body),
            "Unrecognized API key list response, treating as empty"
        );
        return Vec::new();
    };

    list.iter()
        .filter_map(|entry| match serde_json::from_value::<ApiKey>(entry.clone()) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed API key entry");
                None
            }
        })
        .collect()
}

/// Parse a create response: either `{api_key: {..}, key: "sk-.."}`, the
/// same under `data`, or a flat key object carrying `key`.
pub fn parse_created_key(body: &JsonValue) -> Option<CreatedApiKey> {
    let body = body.get("data").filter(|d| d.is_object()).unwrap_or(body);
    let info = body.get("api_key").filter(|k| k.is_object()).unwrap_or(body);
    let key = serde_json::from_value::<ApiKey>(info.clone()).ok()?;
    let secret = body
        .get("key")
        .or_else(|| body.get("secret"))
        .or_else(|| info.get("key"))
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    Some(CreatedApiKey { key, secret })
}

fn truncate(body: &JsonValue) -> String {
    const MAX: usize = 200;
    let text = body.to_string();
    match text.char_indices().nth(MAX) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(id: &str) -> JsonValue {
        json!({"id": id, "name": format!("key {}", id), "key_prefix": "sk_live_ab"})
    }

    #[test]
    fn test_parse_known_shapes() {
        let shapes = [
            json!([key("1")]),
            json!({"api_keys": [key("1")]}),
            json!({"keys": [key("1")]}),
            json!({"data": [key("1")]}),
            json!({"data": {"api_keys": [key("1")]}}),
        ];
        for body in shapes {
            let keys = parse_api_key_list(&body);
            assert_eq!(keys.len(), 1, "shape {}", body);
            assert_eq!(keys[0].id, "1");
            assert_eq!(keys[0].prefix.as_deref(), Some("sk_live_ab"));
        }
    }

    #[test]
    fn test_unknown_shape_is_empty() {
        assert!(parse_api_key_list(&json!({"items": [key("1")]})).is_empty());
        assert!(parse_api_key_list(&json!("nope")).is_empty());
        assert!(parse_api_key_list(&json!({"data": {"other": []}})).is_empty());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let body = json!([key("1"), {"name": "no id"}, key("2")]);
        let ids: Vec<_> = parse_api_key_list(&body).into_iter().map(|k| k.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_id_aliases() {
        let body = json!([{"key_id": "a"}, {"_id": "b", "revoked": true}]);
        let keys = parse_api_key_list(&body);
        assert_eq!(keys[0].id, "a");
        assert!(keys[1].revoked);
        assert_eq!(keys[1].name, "");
    }

    #[test]
    fn test_parse_created_key() {
        let body = json!({"api_key": key("9"), "key": "sk_live_full"});
        let created = parse_created_key(&body).unwrap();
        assert_eq!(created.key.id, "9");
        assert_eq!(created.secret.as_deref(), Some("sk_live_full"));

        let flat = parse_created_key(&json!({"data": {"id": "3", "name": "ci", "key": "sk_x"}}))
            .unwrap();
        assert_eq!(flat.key.name, "ci");
        assert_eq!(flat.secret.as_deref(), Some("sk_x"));

        assert!(parse_created_key(&json!({"error": "nope"})).is_none());
    }

    #[test]
    fn test_truncate() {
        let long = JsonValue::String("x".repeat(500));
        assert!(truncate(&long).ends_with("..."));
        assert_eq!(truncate(&json!(1)), "1");
    }
}
