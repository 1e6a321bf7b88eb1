//! Aggregated analytics over the filtered session set

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::server::AppState;
use crate::api::types::ApiError;
use crate::domain::analytics::{AnalyticsSummary, aggregate_sessions};
use crate::domain::pricing::ProviderClass;
use crate::domain::sessions::{FilterSpec, filter_sessions};

pub fn routes(state: AppState) -> Router<()> {
    Router::new()
        .route("/analytics", post(analytics))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsRequest {
    pub filter: FilterSpec,
    pub provider: Option<ProviderClass>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub session_count: usize,
    #[serde(flatten)]
    pub summary: AnalyticsSummary,
}

async fn analytics(
    State(state): State<AppState>,
    Json(request): Json<AnalyticsRequest>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let snapshot = state.sessions.snapshot();
    let pricing = state.pricing.clone();
    let now_ms = Utc::now().timestamp_millis();

    let response = tokio::task::spawn_blocking(move || {
        let sessions = filter_sessions(&snapshot, &request.filter, now_ms);
        AnalyticsResponse {
            session_count: sessions.len(),
            summary: aggregate_sessions(&sessions, request.provider, &pricing),
        }
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Analytics task failed");
        ApiError::internal("Analytics computation failed")
    })?;

    Ok(Json(response))
}
