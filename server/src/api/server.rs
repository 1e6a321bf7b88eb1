//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes::{analytics, evaluations, health, sessions};
use crate::core::config::ServerConfig;
use crate::core::constants::API_PREFIX;
use crate::core::{AppConfig, ShutdownService};
use crate::domain::pricing::PricingTable;
use crate::domain::sessions::SessionSet;

/// State shared by every route
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionSet>,
    pub pricing: Arc<PricingTable>,
}

impl AppState {
    pub fn new(sessions: SessionSet, pricing: PricingTable) -> Self {
        Self {
            sessions: Arc::new(sessions),
            pricing: Arc::new(pricing),
        }
    }
}

/// Build the full router. Split out of [`ApiServer::start`] so tests can
/// drive it without binding a socket.
pub fn router(state: AppState, server: &ServerConfig, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .merge(health::routes())
        .merge(sessions::routes(state.clone()))
        .merge(analytics::routes(state.clone()))
        .merge(evaluations::routes(state));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(cors(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Empty origin list allows any origin
fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(values))
}

pub struct ApiServer {
    state: AppState,
    config: AppConfig,
    shutdown: ShutdownService,
}

impl ApiServer {
    pub fn new(state: AppState, config: AppConfig, shutdown: ShutdownService) -> Self {
        Self {
            state,
            config,
            shutdown,
        }
    }

    /// Serve until the shutdown service fires
    pub async fn start(self) -> Result<()> {
        let Self {
            state,
            config,
            shutdown,
        } = self;

        let host = config.server.host.as_str();
        let port = config.server.port;

        let router = router(state, &config.server, config.sessions.max_upload_bytes);

        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", host, port))?;
        let addr: SocketAddr = listener.local_addr()?;
        tracing::info!(url = %format!("http://{}{}", addr, API_PREFIX), "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::debug!("Server stopped");
        Ok(())
    }
}
