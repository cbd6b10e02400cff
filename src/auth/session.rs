//! # Sessions
//!
//! Refresh-token sessions. Refresh tokens are single-use: every refresh
//! revokes the old session and opens a new one. Sessions live in memory only,
//! so a restart logs everybody out.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::crypto::{constant_time_str_eq, generate_token, hash_token};
use super::errors::{AuthError, AuthResult};

/// Session model
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Hashed refresh token (raw token only goes to the client)
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl Session {
    fn check_usable(&self, now: DateTime<Utc>) -> AuthResult<()> {
        if self.revoked {
            return Err(AuthError::SessionRevoked);
        }
        if self.expires_at < now {
            return Err(AuthError::SessionInvalid);
        }
        Ok(())
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub refresh_token_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_token_ttl: Duration::days(30),
        }
    }
}

/// Creates, rotates and revokes sessions
pub struct SessionManager<R: SessionRepository> {
    config: SessionConfig,
    repository: R,
}

impl<R: SessionRepository> SessionManager<R> {
    pub fn new(config: SessionConfig, repository: R) -> Self {
        Self { config, repository }
    }

    /// Open a session; returns the raw refresh token for the client
    pub fn create_session(&self, user_id: Uuid) -> AuthResult<(Session, String)> {
        let refresh_token = generate_token();
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_hash: hash_token(&refresh_token),
            created_at: now,
            expires_at: now + self.config.refresh_token_ttl,
            revoked: false,
        };

        self.repository.create(&session)?;

        Ok((session, refresh_token))
    }

    /// Exchange a refresh token for a new session, revoking the old one
    pub fn rotate(&self, refresh_token: &str) -> AuthResult<(Session, String)> {
        let old = self.validate_refresh_token(refresh_token)?;
        self.repository.claim(old.id)?;
        self.create_session(old.user_id)
    }

    /// Look up a live session by its raw refresh token
    pub fn validate_refresh_token(&self, refresh_token: &str) -> AuthResult<Session> {
        let session = self
            .repository
            .find_by_refresh_token_hash(&hash_token(refresh_token))?
            .ok_or(AuthError::InvalidRefreshToken)?;

        session.check_usable(Utc::now())?;
        Ok(session)
    }

    /// Revoke a single session (logout)
    pub fn revoke_session(&self, session_id: Uuid) -> AuthResult<()> {
        self.repository.revoke(session_id)
    }

    /// Revoke every session of a user (password change)
    pub fn revoke_all_user_sessions(&self, user_id: Uuid) -> AuthResult<()> {
        self.repository.revoke_all_for_user(user_id)
    }

    /// Drop expired sessions, returning how many went
    pub fn purge_expired(&self) -> AuthResult<usize> {
        self.repository.delete_expired(Utc::now())
    }
}

/// Session storage
pub trait SessionRepository: Send + Sync {
    fn create(&self, session: &Session) -> AuthResult<()>;

    fn find_by_refresh_token_hash(&self, hash: &str) -> AuthResult<Option<Session>>;

    fn revoke(&self, id: Uuid) -> AuthResult<()>;

    /// Revoke a live session; `SessionRevoked` if it already was
    fn claim(&self, id: Uuid) -> AuthResult<()>;

    fn revoke_all_for_user(&self, user_id: Uuid) -> AuthResult<()>;

    fn delete_expired(&self, now: DateTime<Utc>) -> AuthResult<usize>;
}

/// In-memory session storage
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: std::sync::RwLock<Vec<Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AuthError {
    AuthError::StorageError("Lock poisoned".to_string())
}

impl SessionRepository for InMemorySessionRepository {
    fn create(&self, session: &Session) -> AuthResult<()> {
        self.sessions.write().map_err(poisoned)?.push(session.clone());
        Ok(())
    }

    fn find_by_refresh_token_hash(&self, hash: &str) -> AuthResult<Option<Session>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions
            .iter()
            .find(|s| constant_time_str_eq(&s.refresh_token_hash, hash))
            .cloned())
    }

    fn revoke(&self, id: Uuid) -> AuthResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        match sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.revoked = true;
                Ok(())
            }
            None => Err(AuthError::SessionInvalid),
        }
    }

    fn claim(&self, id: Uuid) -> AuthResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AuthError::SessionInvalid)?;
        if session.revoked {
            return Err(AuthError::SessionRevoked);
        }
        session.revoked = true;
        Ok(())
    }

    fn revoke_all_for_user(&self, user_id: Uuid) -> AuthResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        for session in sessions.iter_mut().filter(|s| s.user_id == user_id) {
            session.revoked = true;
        }
        Ok(())
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> AuthResult<usize> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let before = sessions.len();
        sessions.retain(|s| s.expires_at > now);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager<InMemorySessionRepository> {
        SessionManager::new(SessionConfig::default(), InMemorySessionRepository::new())
    }

    #[test]
    fn test_refresh_token_validation() {
        let manager = manager();
        let user_id = Uuid::new_v4();
        let (_, token) = manager.create_session(user_id).unwrap();

        assert_eq!(manager.validate_refresh_token(&token).unwrap().user_id, user_id);
        assert!(matches!(
            manager.validate_refresh_token("nope"),
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[test]
    fn test_rotation_is_single_use() {
        let manager = manager();
        let user_id = Uuid::new_v4();
        let (_, token) = manager.create_session(user_id).unwrap();

        let (rotated, new_token) = manager.rotate(&token).unwrap();
        assert_eq!(rotated.user_id, user_id);

        assert!(matches!(manager.rotate(&token), Err(AuthError::SessionRevoked)));
        assert!(manager.rotate(&new_token).is_ok());
    }

    #[test]
    fn test_concurrent_refresh_redeems_once() {
        use std::sync::Barrier;

        for _ in 0..200 {
            let manager = manager();
            let (_, token) = manager.create_session(Uuid::new_v4()).unwrap();
            let barrier = Barrier::new(2);

            let successes = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..2)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            manager.rotate(&token).is_ok()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .filter(|ok| *ok)
                    .count()
            });
            assert_eq!(successes, 1);
        }
    }

    #[test]
    fn test_revoke_all() {
        let manager = manager();
        let user_id = Uuid::new_v4();
        let (_, t1) = manager.create_session(user_id).unwrap();
        let (_, t2) = manager.create_session(user_id).unwrap();

        manager.revoke_all_user_sessions(user_id).unwrap();

        assert!(matches!(manager.validate_refresh_token(&t1), Err(AuthError::SessionRevoked)));
        assert!(matches!(manager.validate_refresh_token(&t2), Err(AuthError::SessionRevoked)));
    }

    #[test]
    fn test_expired_sessions() {
        let manager = SessionManager::new(
            SessionConfig {
                refresh_token_ttl: Duration::seconds(-1),
            },
            InMemorySessionRepository::new(),
        );
        let (_, token) = manager.create_session(Uuid::new_v4()).unwrap();

        assert!(matches!(
            manager.validate_refresh_token(&token),
            Err(AuthError::SessionInvalid)
        ));
        assert_eq!(manager.purge_expired().unwrap(), 1);
    }
}
