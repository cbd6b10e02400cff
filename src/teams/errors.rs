//! # Team Errors
//!
//! Errors for team, availability, match-request and chat operations.

use thiserror::Error;

use crate::auth::AuthError;

use super::models::MatchStatus;

/// Result type for team operations
pub type TeamResult<T> = Result<T, TeamError>;

#[derive(Debug, Clone, Error)]
pub enum TeamError {
    /// Input failed a field-level check
    #[error("{0}")]
    Validation(String),

    /// The caller manages no team but the operation needs one
    #[error("You must manage a team to find matches.")]
    NoManagedTeam,

    /// Caller is not the manager the operation requires
    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("A team named '{0}' already exists")]
    TeamNameTaken(String),

    /// Same team on both sides of a request
    #[error("A team cannot request a match against itself")]
    SelfMatch,

    #[error("This availability slot already exists")]
    DuplicateSlot,

    #[error("A team can have at most {0} availability slots")]
    TooManySlots(usize),

    #[error("A pending request between these teams already exists")]
    DuplicateRequest,

    /// State machine violation
    #[error("Cannot {action} a request that is {from}")]
    InvalidTransition { from: MatchStatus, action: &'static str },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl TeamError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        TeamError::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TeamError::Validation(message.into())
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            TeamError::Validation(_) => 400,
            TeamError::SelfMatch => 400,
            TeamError::TooManySlots(_) => 400,

            TeamError::NoManagedTeam => 403,
            TeamError::Forbidden(_) => 403,

            TeamError::NotFound(_) => 404,

            TeamError::TeamNameTaken(_) => 409,
            TeamError::DuplicateSlot => 409,
            TeamError::DuplicateRequest => 409,
            TeamError::InvalidTransition { .. } => 409,

            TeamError::Auth(inner) => inner.status_code(),
            TeamError::StorageError(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TeamError::SelfMatch.status_code(), 400);
        assert_eq!(TeamError::NoManagedTeam.status_code(), 403);
        assert_eq!(TeamError::NotFound("Team").status_code(), 404);
        assert_eq!(
            TeamError::InvalidTransition {
                from: MatchStatus::Rejected,
                action: "accept"
            }
            .status_code(),
            409
        );
        assert_eq!(TeamError::from(AuthError::AuthenticationRequired).status_code(), 401);
        assert_eq!(TeamError::StorageError("x".into()).status_code(), 500);
    }

    #[test]
    fn test_messages() {
        assert_eq!(TeamError::NotFound("Match request").to_string(), "Match request not found");
        let err = TeamError::InvalidTransition {
            from: MatchStatus::Accepted,
            action: "reject",
        };
        assert_eq!(err.to_string(), "Cannot reject a request that is accepted");
    }
}
