//! # Request Context
//!
//! Identity carried with each request once its bearer token is validated.

use uuid::Uuid;

use super::errors::{AuthError, AuthResult};

/// Who is making the request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// The authenticated user's ID (None if anonymous)
    pub user_id: Option<Uuid>,
}

impl AuthContext {
    pub fn authenticated(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The user ID, or `AuthenticationRequired`
    pub fn require_user_id(&self) -> AuthResult<Uuid> {
        self.user_id.ok_or(AuthError::AuthenticationRequired)
    }
}
