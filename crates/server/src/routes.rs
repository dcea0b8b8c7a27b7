use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use intake_agent::{ChatMessage, IntakeRuntime};
use intake_core::config::AppConfig;
use intake_core::domain::session::{SessionId, SessionSummary};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::health;

pub const SERVICE_NAME: &str = "Data Platform Intake Bot";

#[derive(Clone)]
pub struct AppState {
    runtime: Arc<IntakeRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    #[serde(flatten)]
    pub summary: SessionSummary,
}

type ErrorResponse = (StatusCode, Json<Value>);

pub fn router(runtime: Arc<IntakeRuntime>, config: &AppConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/chat", post(chat))
        .route("/reset", post(reset))
        .route("/session/{session_id}", get(session))
        .with_state(AppState { runtime })
        .merge(health::router(config))
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "online",
        "version": env!("CARGO_PKG_VERSION"),
        "service": SERVICE_NAME,
    }))
}

/// Always answers 200; failures inside the turn come back as reply text.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let session_id = session_id(request.session_id);
    let response = state.runtime.handle_chat(&session_id, &request.messages).await;
    Json(ChatResponse { response })
}

async fn reset(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, ErrorResponse> {
    let session_id = session_id(query.session_id);
    state.runtime.reset(&session_id).await.map_err(internal_error)?;
    Ok(Json(json!({ "status": "reset", "message": "Session cleared successfully" })))
}

async fn session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<SessionView>, ErrorResponse> {
    let session_id = session_id(Some(raw_id));
    let summary = state.runtime.session_summary(&session_id).await.map_err(internal_error)?;
    Ok(Json(SessionView { session_id: session_id.0, summary }))
}

fn session_id(raw: Option<String>) -> SessionId {
    raw.map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(SessionId)
        .unwrap_or_default()
}

fn internal_error(error: impl std::fmt::Display) -> ErrorResponse {
    error!(event_name = "http.request.failed", error = %error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "message": error.to_string() })),
    )
}
