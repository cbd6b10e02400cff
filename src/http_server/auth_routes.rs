//! Auth HTTP Routes
//!
//! Registration, login, token refresh, logout, profile and password change.

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::user::{LoginRequest, RegisterRequest};
use crate::auth::{TokenResponse, User};

use super::errors::ApiResult;
use super::state::AppState;

/// Auth routes with shared state
pub fn auth_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/refresh", post(refresh_handler))
        .route("/logout", post(logout_handler))
        .route("/profile", get(profile_handler))
        .route("/password", post(change_password_handler))
        .with_state(state)
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ==================
// Handlers
// ==================

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let (user, tokens) = state.auth.register(request)?;
    state.metrics.increment_users_registered();
    Ok((StatusCode::CREATED, Json(AuthResponse { user, tokens })))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (user, tokens) = state.auth.login(request)?;
    Ok(Json(AuthResponse { user, tokens }))
}

async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(state.auth.refresh(&request.refresh_token)?))
}

async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<StatusCode> {
    state.auth.logout(&request.refresh_token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current user (requires Authorization header)
async fn profile_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<User>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.auth.profile(user_id)?))
}

/// Change password; the caller must log in again afterwards
async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = state.require_user(&headers)?;
    state
        .auth
        .change_password(user_id, &request.current_password, &request.new_password)?;

    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}
