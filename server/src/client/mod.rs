//! Account service client
//!
//! Thin HTTP client for the remote API-key service. Credentials come from an
//! injected [`SessionStore`]; the trace core never depends on this module.

mod api_keys;
mod store;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub use api_keys::{ApiKey, CreatedApiKey, parse_api_key_list, parse_created_key};
pub use store::{AuthSession, FileSessionStore, MemorySessionStore, SessionStore, StoreError};

const CLIENT_TIMEOUT_SECS: u64 = 30;
const API_KEYS_PATH: &str = "/api-keys";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Not logged in. Run `shepherd login --token <TOKEN>` first")]
    NotAuthenticated,

    #[error("{method} {url} returned {status}: {message}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        message: String,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Client configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct AccountClient {
    client: reqwest::Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl AccountClient {
    pub fn new(base_url: &str, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .user_agent(concat!("shepherd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Config("account API URL is empty".to_string()));
        }

        tracing::debug!(base_url = %base_url, store = store.name(), "Account client initialized");
        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn list_api_keys(&self) -> Result<Vec<ApiKey>, ClientError> {
        let body = self.send(Method::GET, API_KEYS_PATH, None).await?;
        Ok(parse_api_key_list(&body))
    }

    pub async fn create_api_key(&self, name: &str) -> Result<CreatedApiKey, ClientError> {
        let payload = serde_json::json!({ "name": name });
        let body = self.send(Method::POST, API_KEYS_PATH, Some(payload)).await?;
        parse_created_key(&body).ok_or_else(|| {
            ClientError::Decode("create response did not contain an API key".to_string())
        })
    }

    pub async fn revoke_api_key(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("{}/{}", API_KEYS_PATH, id);
        self.send(Method::DELETE, &path, None).await?;
        Ok(())
    }

    fn authorized(&self, method: Method, url: &str) -> Result<RequestBuilder, ClientError> {
        let session = self.store.get()?.ok_or(ClientError::NotAuthenticated)?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(session.token))
    }

    /// Send an authorized request and return its JSON body (`null` when the
    /// body is empty).
    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<JsonValue>,
    ) -> Result<JsonValue, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.authorized(method.clone(), &url)?;
        if let Some(payload) = payload {
            request = request.json(&payload);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<JsonValue>(&text)
                .ok()
                .and_then(|v| {
                    ["message", "error", "detail"]
                        .iter()
                        .find_map(|k| v.get(*k).and_then(JsonValue::as_str).map(str::to_string))
                })
                .unwrap_or(text);
            tracing::debug!(%method, %url, %status, "Account request failed");
            return Err(ClientError::Status {
                method,
                url,
                status,
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(url: &str, token: Option<&str>) -> AccountClient {
        let store: Arc<dyn SessionStore> = match token {
            Some(t) => Arc::new(MemorySessionStore::with_token(t)),
            None => Arc::new(MemorySessionStore::new()),
        };
        AccountClient::new(url, store).unwrap()
    }

    #[tokio::test]
    async fn test_list_api_keys_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api-keys")
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"api_keys": [{"id": "k1", "name": "ci"}]}}"#)
            .create_async()
            .await;

        let keys = client(&server.url(), Some("tok-1"))
            .list_api_keys()
            .await
            .unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "ci");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_list_shape_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api-keys")
            .with_status(200)
            .with_body(r#"{"unexpected": true}"#)
            .create_async()
            .await;

        let keys = client(&server.url(), Some("t")).list_api_keys().await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_is_not_authenticated() {
        let server = mockito::Server::new_async().await;
        let err = client(&server.url(), None).list_api_keys().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_create_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api-keys")
            .match_body(Matcher::Json(serde_json::json!({"name": "laptop"})))
            .with_status(201)
            .with_body(r#"{"api_key": {"id": "k2", "name": "laptop"}, "key": "sk_full"}"#)
            .create_async()
            .await;

        let created = client(&server.url(), Some("t"))
            .create_api_key("laptop")
            .await
            .unwrap();
        assert_eq!(created.key.id, "k2");
        assert_eq!(created.secret.as_deref(), Some("sk_full"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_revoke_api_key_with_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api-keys/k3")
            .with_status(204)
            .create_async()
            .await;

        client(&server.url(), Some("t"))
            .revoke_api_key("k3")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_carries_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api-keys/nope")
            .with_status(404)
            .with_body(r#"{"error": "API key not found"}"#)
            .create_async()
            .await;

        let err = client(&server.url(), Some("t"))
            .revoke_api_key("nope")
            .await
            .unwrap_err();
        match err {
            ClientError::Status {
                status, message, ..
            } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "API key not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        assert!(matches!(
            AccountClient::new("/", store),
            Err(ClientError::Config(_))
        ));
    }
}
