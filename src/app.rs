//! HTTP API
//!
//! JSON endpoints for the chat, the diagram and the stored API key:
//! - POST   /api/chat                              - Run one chat turn
//! - GET    /api/chat                              - Transcript
//! - GET    /api/diagram                           - Render records
//! - DELETE /api/diagram                           - Clear diagram and chat
//! - POST   /api/diagram/arrange                   - Re-place every table
//! - POST   /api/diagram/nodes/changes             - Fold renderer node changes
//! - POST   /api/diagram/edges/changes             - Fold renderer edge changes
//! - POST   /api/diagram/connect                   - Add a user-drawn edge
//! - DELETE /api/diagram/edges/{id}                - Remove an edge
//! - POST   /api/diagram/edges/{id}/cardinality    - Toggle one end of an edge
//! - GET    /api/credentials, PUT /api/credentials - API key status / update
//! - GET    /api/help                              - Command reference

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::core::{
    API_KEY_CREDENTIAL, Cardinality, Connection, Conversation, CredentialStore, EdgeChange,
    EdgeEnd, HELP_TEXT, NodeChange, TurnError,
};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<Conversation>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl AppState {
    pub fn new(conversation: Arc<Conversation>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            conversation,
            credentials,
        }
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsStatus {
    pub configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct CardinalityRequest {
    pub end: EdgeEnd,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CardinalityResponse {
    pub end: EdgeEnd,
    pub cardinality: Cardinality,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppliedResponse {
    pub applied: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HelpResponse {
    pub help: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub code: u16,
}

// ============================================================================
// Router
// ============================================================================

/// Create the application router
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler).get(transcript_handler))
        .route(
            "/api/diagram",
            get(diagram_handler).delete(clear_handler),
        )
        .route("/api/diagram/arrange", post(arrange_handler))
        .route("/api/diagram/nodes/changes", post(node_changes_handler))
        .route("/api/diagram/edges/changes", post(edge_changes_handler))
        .route("/api/diagram/connect", post(connect_handler))
        .route("/api/diagram/edges/{id}", delete(remove_edge_handler))
        .route(
            "/api/diagram/edges/{id}/cardinality",
            post(cardinality_handler),
        )
        .route(
            "/api/credentials",
            get(credentials_status_handler).put(set_credentials_handler),
        )
        .route("/api/help", get(help_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

// ============================================================================
// Handlers
// ============================================================================

/// Run one chat turn.
///
/// The turn runs in its own task so it completes even if the client goes away.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatMessageRequest>,
) -> Response {
    let conversation = state.conversation.clone();
    let turn = tokio::spawn(async move { conversation.submit(&request.message).await });

    match turn.await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(err @ TurnError::Busy)) => error_response(StatusCode::CONFLICT, &err.to_string()),
        Ok(Err(err @ TurnError::EmptyInput)) => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(e) => {
            tracing::error!("Chat turn task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Chat turn failed")
        }
    }
}

async fn transcript_handler(State(state): State<AppState>) -> Response {
    Json(state.conversation.transcript()).into_response()
}

async fn diagram_handler(State(state): State<AppState>) -> Response {
    Json(state.conversation.snapshot()).into_response()
}

async fn clear_handler(State(state): State<AppState>) -> Response {
    state.conversation.clear();
    StatusCode::NO_CONTENT.into_response()
}

async fn arrange_handler(State(state): State<AppState>) -> Response {
    let diagram = state.conversation.with_store(|store| {
        store.arrange();
        store.to_diagram()
    });
    Json(diagram).into_response()
}

async fn node_changes_handler(
    State(state): State<AppState>,
    Json(changes): Json<Vec<NodeChange>>,
) -> Response {
    let applied = state
        .conversation
        .with_store(|store| store.apply_node_changes(&changes));
    Json(AppliedResponse { applied }).into_response()
}

async fn edge_changes_handler(
    State(state): State<AppState>,
    Json(changes): Json<Vec<EdgeChange>>,
) -> Response {
    let applied = state
        .conversation
        .with_store(|store| store.apply_edge_changes(&changes));
    Json(AppliedResponse { applied }).into_response()
}

async fn connect_handler(
    State(state): State<AppState>,
    Json(connection): Json<Connection>,
) -> Response {
    match state.conversation.with_store(|store| store.connect(connection)) {
        Some(id) => (StatusCode::CREATED, Json(ConnectResponse { id })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Both tables must exist"),
    }
}

async fn remove_edge_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    if state
        .conversation
        .with_store(|store| store.remove_relationship(&id))
    {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Relationship not found")
    }
}

async fn cardinality_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CardinalityRequest>,
) -> Response {
    match state
        .conversation
        .with_store(|store| store.toggle_cardinality(&id, request.end))
    {
        Some(cardinality) => Json(CardinalityResponse {
            end: request.end,
            cardinality,
        })
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Relationship not found"),
    }
}

async fn credentials_status_handler(State(state): State<AppState>) -> Response {
    Json(CredentialsStatus {
        configured: state.credentials.contains(API_KEY_CREDENTIAL),
    })
    .into_response()
}

/// Store (or, for a blank key, remove) the API key and drop the cached client
async fn set_credentials_handler(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Response {
    let api_key = request.api_key.trim();
    let result = if api_key.is_empty() {
        state.credentials.remove(API_KEY_CREDENTIAL)
    } else {
        state.credentials.set(API_KEY_CREDENTIAL, api_key)
    };

    if let Err(e) = result {
        tracing::error!("Failed to store API key: {}", e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
    }

    state.conversation.reconfigure();
    Json(CredentialsStatus {
        configured: !api_key.is_empty(),
    })
    .into_response()
}

async fn help_handler() -> Response {
    Json(HelpResponse {
        help: HELP_TEXT.to_string(),
    })
    .into_response()
}

/// Create an error response
fn error_response(status: StatusCode, message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            message: message.to_string(),
            code: status.as_u16(),
        },
    };

    (status, Json(error)).into_response()
}

// ============================================================================
// Tests
// ============================================================================
