//! Route handler functions for all API endpoints.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ana_chat::{ChatReply, SessionLedger};
use ana_core::types::{ChatMessage, ChatSession};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<ChatSession>,
}

/// Response for POST /sessions.
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session: ChatSession,
    pub greeting: String,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub session_id: Uuid,
    pub messages: Vec<ChatMessage>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        model: state.config.llm.model.clone(),
    })
}

/// POST /chat - send one message, optionally continuing a session.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(req) = body?;
    let reply = state
        .orchestrator
        .handle_message(&req.message, req.session_id)
        .await?;
    Ok(Json(reply))
}

/// GET /sessions
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let sessions = state.orchestrator.list_sessions()?;
    Ok(Json(SessionsResponse { sessions }))
}

/// POST /sessions - start a session and return its greeting.
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<NewSessionResponse>), ApiError> {
    let session = state.orchestrator.create_session()?;
    let greeting = state
        .orchestrator
        .messages(session.id)?
        .into_iter()
        .next()
        .map(|m| m.content)
        .unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        Json(NewSessionResponse { session, greeting }),
    ))
}

/// GET /sessions/{id}/messages
pub async fn session_messages(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let Path(id) = path?;
    let messages = state.orchestrator.messages(id)?;
    Ok(Json(MessagesResponse {
        session_id: id,
        messages,
    }))
}

/// GET /sessions/{id}/ledger
pub async fn session_ledger(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionLedger>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.orchestrator.ledger(id)?))
}

/// DELETE /sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.orchestrator.delete_session(id)?;
    Ok(StatusCode::NO_CONTENT)
}
