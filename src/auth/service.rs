//! # Auth Service
//!
//! Registration, login, token refresh and logout for team managers.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::context::AuthContext;
use super::crypto::PasswordPolicy;
use super::errors::{AuthError, AuthResult};
use super::jwt::{JwtConfig, JwtManager, TokenResponse};
use super::session::{SessionConfig, SessionManager, SessionRepository};
use super::user::{LoginRequest, RegisterRequest, User, UserRepository};

/// Auth service combining users, sessions and access tokens
pub struct AuthService<S: SessionRepository> {
    users: Arc<dyn UserRepository>,
    sessions: SessionManager<S>,
    jwt: JwtManager,
    password_policy: PasswordPolicy,
}

impl<S: SessionRepository> AuthService<S> {
    pub fn new(
        users: Arc<dyn UserRepository>,
        session_repo: S,
        jwt_config: JwtConfig,
        session_config: SessionConfig,
        password_policy: PasswordPolicy,
    ) -> Self {
        Self {
            users,
            sessions: SessionManager::new(session_config, session_repo),
            jwt: JwtManager::new(jwt_config),
            password_policy,
        }
    }

    fn open_session(&self, user: &User) -> AuthResult<TokenResponse> {
        let (_, refresh_token) = self.sessions.create_session(user.id)?;
        let (access_token, expires_at) = self.jwt.issue(user)?;
        Ok(TokenResponse::new(access_token, refresh_token, expires_at))
    }

    /// Register a new manager account
    pub fn register(&self, request: RegisterRequest) -> AuthResult<(User, TokenResponse)> {
        if request.password != request.password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        let user = User::new(
            &request.username,
            &request.password,
            request.email,
            &self.password_policy,
        )?;

        if self.users.find_by_username(&user.username)?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        self.users.create(&user)?;

        info!(user_id = %user.id, username = %user.username, "user registered");

        let tokens = self.open_session(&user)?;
        Ok((user, tokens))
    }

    /// Authenticate with username and password
    pub fn login(&self, request: LoginRequest) -> AuthResult<(User, TokenResponse)> {
        let user = self
            .users
            .find_by_username(request.username.trim())?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.verify_password(&request.password)? {
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");

        let tokens = self.open_session(&user)?;
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a fresh token pair
    pub fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        let (session, new_refresh_token) = self.sessions.rotate(refresh_token)?;

        let user = self
            .users
            .find_by_id(session.user_id)?
            .ok_or(AuthError::InvalidCredentials)?;

        let (access_token, expires_at) = self.jwt.issue(&user)?;
        Ok(TokenResponse::new(access_token, new_refresh_token, expires_at))
    }

    /// Revoke the session behind a refresh token
    pub fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        let session = self.sessions.validate_refresh_token(refresh_token)?;
        self.sessions.revoke_session(session.id)?;
        info!(user_id = %session.user_id, "user logged out");
        Ok(())
    }

    /// Current user's profile
    pub fn profile(&self, user_id: Uuid) -> AuthResult<User> {
        self.users
            .find_by_id(user_id)?
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Change password; every open session is revoked afterwards
    pub fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let mut user = self.profile(user_id)?;

        if !user.verify_password(current_password)? {
            return Err(AuthError::InvalidCredentials);
        }

        user.set_password(new_password, &self.password_policy)?;
        user.updated_at = Utc::now();
        self.users.update(&user)?;
        self.sessions.revoke_all_user_sessions(user_id)?;

        info!(user_id = %user_id, "password changed");
        Ok(())
    }

    /// Validate a bearer token and build the request context
    pub fn authenticate(&self, access_token: &str) -> AuthResult<AuthContext> {
        let claims = self.jwt.validate_token(access_token)?;
        let user_id = JwtManager::user_id(&claims)?;
        Ok(AuthContext::authenticated(user_id))
    }

    /// Drop expired sessions
    pub fn purge_expired_sessions(&self) -> AuthResult<usize> {
        self.sessions.purge_expired()
    }
}
