//! Evaluation report over the filtered session set

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::api::server::AppState;
use crate::api::types::ApiError;
use crate::domain::evals::{EvaluationReport, IssueFilter, build_report, extract_all_evaluations};
use crate::domain::sessions::{FilterSpec, filter_sessions};

pub fn routes(state: AppState) -> Router<()> {
    Router::new()
        .route("/evaluations", post(evaluations))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EvaluationsRequest {
    pub filter: FilterSpec,
    #[serde(flatten)]
    pub issues: IssueFilter,
}

async fn evaluations(
    State(state): State<AppState>,
    Json(request): Json<EvaluationsRequest>,
) -> Result<Json<EvaluationReport>, ApiError> {
    let snapshot = state.sessions.snapshot();
    let now_ms = Utc::now().timestamp_millis();

    let report = tokio::task::spawn_blocking(move || {
        let sessions = filter_sessions(&snapshot, &request.filter, now_ms);
        let records = extract_all_evaluations(&sessions);
        build_report(&records, &request.issues)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Evaluation task failed");
        ApiError::internal("Evaluation computation failed")
    })?;

    Ok(Json(report))
}
