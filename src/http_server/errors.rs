//! JSON error bodies and the conversions from domain errors.

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::auth::AuthError;
use crate::teams::TeamError;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(code: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.as_u16(),
        }
    }
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<T, ApiError>;

/// Build an error response with an explicit status
pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(status, message)))
}

fn respond(code: u16, message: String) -> ApiError {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(status = code, error = %message, "request failed");
    } else {
        tracing::warn!(status = code, error = %message, "request rejected");
    }
    (status, Json(ErrorResponse::new(status, message)))
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        Self {
            error: err.to_string(),
            code: err.status_code(),
        }
    }
}

impl From<TeamError> for ErrorResponse {
    fn from(err: TeamError) -> Self {
        Self {
            error: err.to_string(),
            code: err.status_code(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        respond(err.status_code(), err.to_string())
    }
}

impl From<TeamError> for ApiError {
    fn from(err: TeamError) -> Self {
        respond(err.status_code(), err.to_string())
    }
}
