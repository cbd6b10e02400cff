//! # Users
//!
//! A user is a team manager. Users log in by username; the email address is
//! optional and only used for match reminders.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use lettre::Address;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::crypto::{hash_password, verify_password, PasswordPolicy};
use super::errors::{AuthError, AuthResult};

/// Longest accepted username
pub const MAX_USERNAME_LEN: usize = 150;

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    /// Login name (unique)
    pub username: String,

    /// Reminder address, if the user gave one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Argon2id password hash (never plaintext, never serialized)
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user, validating username and password
    pub fn new(
        username: &str,
        password: &str,
        email: Option<String>,
        policy: &PasswordPolicy,
    ) -> AuthResult<Self> {
        let username = validate_username(username)?;
        let email = validate_email(email)?;
        policy.validate(password)?;
        let password_hash = hash_password(password)?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        })
    }

    /// Verify a password against this user's stored hash
    pub fn verify_password(&self, password: &str) -> AuthResult<bool> {
        verify_password(password, &self.password_hash)
    }

    /// Replace the password, enforcing the policy
    pub fn set_password(&mut self, password: &str, policy: &PasswordPolicy) -> AuthResult<()> {
        policy.validate(password)?;
        self.password_hash = hash_password(password)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn username_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w.@+-]+$").ok()).as_ref()
}

/// Trim an optional email; blank means none, anything else must parse as an address
pub fn validate_email(email: Option<String>) -> AuthResult<Option<String>> {
    let Some(email) = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    email
        .parse::<Address>()
        .map_err(|e| AuthError::InvalidEmail(format!("'{}': {}", email, e)))?;
    Ok(Some(email))
}

/// Trim and check a username: letters, digits and `@ . + - _` only
pub fn validate_username(username: &str) -> AuthResult<String> {
    let username = username.trim();

    if username.is_empty() {
        return Err(AuthError::InvalidUsername("username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AuthError::InvalidUsername(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username_pattern().is_some_and(|re| re.is_match(username)) {
        return Err(AuthError::InvalidUsername(
            "only letters, digits and @/./+/-/_ are allowed".to_string(),
        ));
    }

    Ok(username.to_string())
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// User repository
pub trait UserRepository: Send + Sync {
    fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Insert a user; fails with `UsernameTaken` on a duplicate username
    fn create(&self, user: &User) -> AuthResult<()>;

    fn update(&self, user: &User) -> AuthResult<()>;
}
