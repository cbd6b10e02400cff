//! Errors raised while registering, logging in and checking tokens.

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // --- account ---
    /// Same message for an unknown username and a wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("A user with that username already exists")]
    UsernameTaken,

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("The two password fields didn't match")]
    PasswordMismatch,

    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    // --- refresh sessions ---
    #[error("Session expired or invalid")]
    SessionInvalid,

    /// Unknown, expired or already rotated
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Session has been revoked")]
    SessionRevoked,

    // --- access tokens ---
    #[error("Malformed token")]
    MalformedToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Authentication required")]
    AuthenticationRequired,

    // --- internal ---
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    #[error("Internal error: token generation failed")]
    TokenGenerationFailed,

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl AuthError {
    /// HTTP status for this error
    pub fn status_code(&self) -> u16 {
        use AuthError::*;
        match self {
            InvalidUsername(_)
            | InvalidEmail(_)
            | PasswordMismatch
            | WeakPassword(_)
            | MalformedToken => 400,

            InvalidCredentials
            | SessionInvalid
            | InvalidRefreshToken
            | SessionRevoked
            | TokenExpired
            | InvalidSignature
            | AuthenticationRequired => 401,

            UsernameTaken => 409,

            HashingFailed | TokenGenerationFailed | StorageError(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
