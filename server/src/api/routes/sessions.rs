//! Session set endpoints: upload, list, remove and per-session views

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::server::AppState;
use crate::api::types::ApiError;
use crate::domain::sessions::{LabelCatalog, Session, SessionSummary, discover_labels};
use crate::domain::traces::{
    EnhancementGroup, NormalizedEvent, SystemPromptGroup, group_by_system_prompt,
    group_enhancements,
};

pub fn routes(state: AppState) -> Router<()> {
    Router::new()
        .route("/sessions", get(list_sessions).post(upload_session))
        .route("/sessions/{file_name}", delete(remove_session))
        .route("/sessions/{file_name}/events", get(session_events))
        .route("/sessions/{file_name}/enhancements", get(session_enhancements))
        .route("/sessions/{file_name}/system-prompts", get(session_system_prompts))
        .route("/labels", get(labels))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(flatten)]
    pub session: SessionSummary,
    /// An earlier upload with the same file name was replaced
    pub replaced: bool,
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    let summaries = state
        .sessions
        .snapshot()
        .iter()
        .map(|s| s.summary())
        .collect();
    Json(summaries)
}

async fn upload_session(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let body = body?;
    let file_name = params
        .file_name
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| {
            ApiError::bad_request("MISSING_FILE_NAME", "Query parameter 'file_name' is required")
        })?;

    let session = Session::from_slice(file_name, &body, Utc::now())?;
    let summary = session.summary();
    let replaced = state.sessions.insert(session);

    tracing::debug!(
        file = %summary.file_name,
        events = summary.event_count,
        replaced,
        "Session uploaded"
    );

    let status = if replaced {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(UploadResponse {
            session: summary,
            replaced,
        }),
    ))
}

async fn remove_session(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(&file_name)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ApiError::session_not_found(&file_name))
}

fn loaded(state: &AppState, file_name: &str) -> Result<std::sync::Arc<Session>, ApiError> {
    state
        .sessions
        .get(file_name)
        .ok_or_else(|| ApiError::session_not_found(file_name))
}

async fn session_events(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Json<Vec<NormalizedEvent>>, ApiError> {
    Ok(Json(loaded(&state, &file_name)?.events()))
}

async fn session_enhancements(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Json<Vec<EnhancementGroup>>, ApiError> {
    let session = loaded(&state, &file_name)?;
    Ok(Json(group_enhancements(
        &session.data,
        Some(&session.file_name),
    )))
}

async fn session_system_prompts(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Json<Vec<SystemPromptGroup>>, ApiError> {
    let session = loaded(&state, &file_name)?;
    Ok(Json(group_by_system_prompt(&session.events())))
}

async fn labels(State(state): State<AppState>) -> Json<LabelCatalog> {
    Json(discover_labels(&state.sessions.snapshot()))
}
