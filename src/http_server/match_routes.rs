//! Match Request HTTP Routes
//!
//! Request lifecycle, per-request chat and the manager dashboard.

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::teams::{ChatMessage, Dashboard, MatchRequest, MatchStatus, NewMatchRequest, RequestView};

use super::errors::{api_error, ApiError, ApiResult};
use super::state::AppState;

/// Match request routes, nested under `/api`
pub fn match_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/match-requests",
            get(list_requests_handler).post(create_request_handler),
        )
        .route("/match-requests/:id", get(get_request_handler))
        .route("/match-requests/:id/accept", post(accept_handler))
        .route("/match-requests/:id/reject", post(reject_handler))
        .route("/match-requests/:id/cancel", post(cancel_handler))
        .route(
            "/match-requests/:id/messages",
            get(list_messages_handler).post(post_message_handler),
        )
        .route(
            "/match-requests/:id/messages/:message_id",
            get(get_message_handler)
                .put(immutable_message_handler)
                .patch(immutable_message_handler)
                .delete(immutable_message_handler),
        )
        .route("/dashboard", get(dashboard_handler))
        .with_state(state)
}

// ==================
// Request Types
// ==================

#[derive(Debug, Default, Deserialize)]
pub struct StatusParams {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

// ==================
// Lifecycle Handlers
// ==================

async fn list_requests_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<StatusParams>,
) -> ApiResult<Json<Vec<RequestView>>> {
    let user_id = state.require_user(&headers)?;
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<MatchStatus>)
        .transpose()?;
    Ok(Json(state.roster.list_requests(user_id, status)?))
}

async fn create_request_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<NewMatchRequest>,
) -> ApiResult<(StatusCode, Json<MatchRequest>)> {
    let user_id = state.require_user(&headers)?;
    let created = state.roster.create_request(user_id, request)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_request_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<RequestView>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.get_request(user_id, request_id)?))
}

async fn accept_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<MatchRequest>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.accept_request(user_id, request_id)?))
}

async fn reject_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<MatchRequest>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.reject_request(user_id, request_id)?))
}

async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<MatchRequest>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.cancel_request(user_id, request_id)?))
}

async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Dashboard>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.dashboard(user_id)?))
}

// ==================
// Chat Handlers
// ==================

async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.list_messages(user_id, request_id)?))
}

async fn post_message_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
    Json(request): Json<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let user_id = state.require_user(&headers)?;
    let message = state.roster.post_message(user_id, request_id, &request.content)?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn get_message_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((request_id, message_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ChatMessage>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.get_message(user_id, request_id, message_id)?))
}

/// Messages are append-only
async fn immutable_message_handler() -> ApiError {
    api_error(
        StatusCode::METHOD_NOT_ALLOWED,
        "Chat messages cannot be edited or deleted",
    )
}
