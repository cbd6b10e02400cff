//! Shared state handed to every handler.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use uuid::Uuid;

use crate::auth::{
    AuthService, InMemorySessionRepository, JwtConfig, PasswordPolicy, SessionConfig,
};
use crate::observability::MetricsRegistry;
use crate::storage::Store;
use crate::teams::RosterService;

use super::errors::{api_error, ApiResult};

pub struct AppState {
    pub auth: AuthService<InMemorySessionRepository>,
    pub roster: RosterService,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        jwt_config: JwtConfig,
        session_config: SessionConfig,
        password_policy: PasswordPolicy,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        Self {
            auth: AuthService::new(
                store.clone(),
                InMemorySessionRepository::new(),
                jwt_config,
                session_config,
                password_policy,
            ),
            roster: RosterService::new(store, metrics.clone()),
            metrics,
        }
    }

    /// In-memory state with default token settings and the given signing secret
    pub fn in_memory(secret: &str) -> Self {
        Self::new(
            Arc::new(Store::in_memory()),
            JwtConfig {
                secret: secret.to_string(),
                ..Default::default()
            },
            SessionConfig::default(),
            PasswordPolicy::default(),
        )
    }

    /// The caller's user ID from `Authorization: Bearer <token>`
    pub fn require_user(&self, headers: &HeaderMap) -> ApiResult<Uuid> {
        let token = extract_bearer_token(headers)
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Missing authorization header"))?;

        let ctx = self.auth.authenticate(token)?;
        Ok(ctx.require_user_id()?)
    }
}

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn test_require_user_rejects_garbage() {
        let state = AppState::in_memory("a-test-secret-of-decent-length");
        let mut headers = HeaderMap::new();
        let (status, _) = state.require_user(&headers).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        headers.insert("authorization", HeaderValue::from_static("Bearer not-a-jwt"));
        let (status, _) = state.require_user(&headers).unwrap_err();
        assert!(status.is_client_error());
    }
}
