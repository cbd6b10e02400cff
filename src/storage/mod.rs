//! # Storage
//!
//! One in-memory table set behind a `RwLock`, implementing every repository
//! trait of the crate. When opened on a file, each successful mutation is
//! followed by a full JSON snapshot write; if that write fails the mutation
//! is rolled back in memory and the error is returned.

mod snapshot;

pub use snapshot::{DataSnapshot, SnapshotFile, UserRecord, SNAPSHOT_VERSION};

use std::path::Path;
use std::sync::RwLock;

use thiserror::Error;
use uuid::Uuid;

use crate::auth::{AuthError, AuthResult, User, UserRepository};
use crate::teams::errors::{TeamError, TeamResult};
use crate::teams::models::{
    Availability, ChatMessage, MatchRequest, MatchStatus, Team, MAX_SLOTS_PER_TEAM,
};
use crate::teams::schedule::Weekday;
use crate::teams::store::{
    AvailabilityRepository, ChatRepository, MatchRequestRepository, TeamRepository,
};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("snapshot is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("snapshot layout {0} is newer than this build understands")]
    UnsupportedVersion(u32),

    #[error("Lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::StorageError(err.to_string())
    }
}

impl From<StorageError> for TeamError {
    fn from(err: StorageError) -> Self {
        TeamError::StorageError(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    teams: Vec<Team>,
    slots: Vec<Availability>,
    requests: Vec<MatchRequest>,
    messages: Vec<ChatMessage>,
}

impl Tables {
    fn from_snapshot(snapshot: DataSnapshot) -> Self {
        Self {
            users: snapshot.users.into_iter().map(User::from).collect(),
            teams: snapshot.teams,
            slots: snapshot.availabilities,
            requests: snapshot.match_requests,
            messages: snapshot.chat_messages,
        }
    }

    fn to_snapshot(&self) -> DataSnapshot {
        DataSnapshot {
            version: SNAPSHOT_VERSION,
            users: self.users.iter().map(UserRecord::from).collect(),
            teams: self.teams.clone(),
            availabilities: self.slots.clone(),
            match_requests: self.requests.clone(),
            chat_messages: self.messages.clone(),
        }
    }
}

/// The data store
#[derive(Debug, Default)]
pub struct Store {
    tables: RwLock<Tables>,
    file: Option<SnapshotFile>,
}

impl Store {
    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load a store from `path`, persisting every later change back to it
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let file = SnapshotFile::new(path);
        let tables = Tables::from_snapshot(file.load()?);

        tracing::info!(
            path = %file.path().display(),
            users = tables.users.len(),
            teams = tables.teams.len(),
            requests = tables.requests.len(),
            "data file loaded"
        );

        Ok(Self {
            tables: RwLock::new(tables),
            file: Some(file),
        })
    }

    /// Current contents as a snapshot
    pub fn snapshot(&self) -> StorageResult<DataSnapshot> {
        self.read(|t| t.to_snapshot())
    }

    fn read<T, E>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(f(&tables))
    }

    fn mutate<T, E>(&self, f: impl FnOnce(&mut Tables) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;

        let Some(file) = &self.file else {
            return f(&mut tables);
        };

        let before = tables.clone();
        let value = f(&mut tables)?;
        if let Err(e) = file.save(&tables.to_snapshot()) {
            tracing::error!(error = %e, "snapshot write failed, change rolled back");
            *tables = before;
            return Err(e.into());
        }
        Ok(value)
    }
}

// ==================
// Users
// ==================

impl UserRepository for Store {
    fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        self.read(|t| t.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        self.read(|t| t.users.iter().find(|u| u.username == username).cloned())
    }

    fn create(&self, user: &User) -> AuthResult<()> {
        self.mutate(|t| {
            if t.users.iter().any(|u| u.username == user.username) {
                return Err(AuthError::UsernameTaken);
            }
            t.users.push(user.clone());
            Ok(())
        })
    }

    fn update(&self, user: &User) -> AuthResult<()> {
        self.mutate(|t| match t.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AuthError::StorageError("User not found".to_string())),
        })
    }
}

// ==================
// Teams
// ==================

impl TeamRepository for Store {
    fn find_team(&self, id: Uuid) -> TeamResult<Option<Team>> {
        self.read(|t| t.teams.iter().find(|team| team.id == id).cloned())
    }

    fn teams_managed_by(&self, manager_id: Uuid) -> TeamResult<Vec<Team>> {
        self.read(|t| {
            t.teams
                .iter()
                .filter(|team| team.manager_id == manager_id)
                .cloned()
                .collect()
        })
    }

    fn all_teams(&self) -> TeamResult<Vec<Team>> {
        self.read(|t| t.teams.clone())
    }

    fn create_team(&self, team: &Team) -> TeamResult<()> {
        self.mutate(|t| {
            if t.teams.iter().any(|existing| existing.name == team.name) {
                return Err(TeamError::TeamNameTaken(team.name.clone()));
            }
            t.teams.push(team.clone());
            Ok(())
        })
    }

    fn update_team(&self, team: &Team) -> TeamResult<()> {
        self.mutate(|t| {
            if t
                .teams
                .iter()
                .any(|existing| existing.name == team.name && existing.id != team.id)
            {
                return Err(TeamError::TeamNameTaken(team.name.clone()));
            }
            let existing = t
                .teams
                .iter_mut()
                .find(|existing| existing.id == team.id)
                .ok_or(TeamError::NotFound("Team"))?;
            *existing = team.clone();
            Ok(())
        })
    }
}

// ==================
// Availability
// ==================

fn check_new_slots(existing: &[Availability], new: &[Availability]) -> TeamResult<()> {
    for (i, slot) in new.iter().enumerate() {
        let clashes_existing = existing.iter().any(|other| other.same_slot(slot));
        let clashes_batch = new[..i].iter().any(|other| other.same_slot(slot));
        if clashes_existing || clashes_batch {
            return Err(TeamError::DuplicateSlot);
        }
    }
    Ok(())
}

impl AvailabilityRepository for Store {
    fn find_slot(&self, id: Uuid) -> TeamResult<Option<Availability>> {
        self.read(|t| t.slots.iter().find(|s| s.id == id).cloned())
    }

    fn slots_for_team(&self, team_id: Uuid, day: Option<Weekday>) -> TeamResult<Vec<Availability>> {
        self.read(|t| {
            t.slots
                .iter()
                .filter(|s| s.team_id == team_id && day.map_or(true, |d| s.day_of_week == d))
                .cloned()
                .collect()
        })
    }

    fn slots_on_day(&self, day: Weekday) -> TeamResult<Vec<Availability>> {
        self.read(|t| t.slots.iter().filter(|s| s.day_of_week == day).cloned().collect())
    }

    fn add_slot(&self, slot: &Availability) -> TeamResult<()> {
        self.mutate(|t| {
            let team_slots: Vec<Availability> = t
                .slots
                .iter()
                .filter(|s| s.team_id == slot.team_id)
                .cloned()
                .collect();
            if team_slots.len() >= MAX_SLOTS_PER_TEAM {
                return Err(TeamError::TooManySlots(MAX_SLOTS_PER_TEAM));
            }
            check_new_slots(&team_slots, std::slice::from_ref(slot))?;
            t.slots.push(slot.clone());
            Ok(())
        })
    }

    fn delete_slot(&self, id: Uuid) -> TeamResult<()> {
        self.mutate(|t| {
            let before = t.slots.len();
            t.slots.retain(|s| s.id != id);
            if t.slots.len() == before {
                Err(TeamError::NotFound("Availability"))
            } else {
                Ok(())
            }
        })
    }

    fn replace_slots(&self, team_id: Uuid, slots: &[Availability]) -> TeamResult<()> {
        if slots.len() > MAX_SLOTS_PER_TEAM {
            return Err(TeamError::TooManySlots(MAX_SLOTS_PER_TEAM));
        }
        if slots.iter().any(|s| s.team_id != team_id) {
            return Err(TeamError::validation("every slot must belong to the team"));
        }
        check_new_slots(&[], slots)?;

        self.mutate(|t| {
            t.slots.retain(|s| s.team_id != team_id);
            t.slots.extend_from_slice(slots);
            Ok(())
        })
    }
}

// ==================
// Match requests and chat
// ==================

impl MatchRequestRepository for Store {
    fn find_request(&self, id: Uuid) -> TeamResult<Option<MatchRequest>> {
        self.read(|t| t.requests.iter().find(|r| r.id == id).cloned())
    }

    fn requests_involving(&self, team_ids: &[Uuid]) -> TeamResult<Vec<MatchRequest>> {
        self.read(|t| {
            t.requests
                .iter()
                .filter(|r| team_ids.iter().any(|id| r.involves(*id)))
                .cloned()
                .collect()
        })
    }

    fn all_requests(&self) -> TeamResult<Vec<MatchRequest>> {
        self.read(|t| t.requests.clone())
    }

    fn create_request(&self, request: &MatchRequest) -> TeamResult<()> {
        self.mutate(|t| {
            let duplicate = t.requests.iter().any(|r| {
                r.is_pending()
                    && r.requester_id == request.requester_id
                    && r.receiver_id == request.receiver_id
            });
            if duplicate {
                return Err(TeamError::DuplicateRequest);
            }
            t.requests.push(request.clone());
            Ok(())
        })
    }

    fn transition_request(
        &self,
        id: Uuid,
        from: &[MatchStatus],
        to: MatchStatus,
        action: &'static str,
    ) -> TeamResult<MatchRequest> {
        self.mutate(|t| {
            let existing = t
                .requests
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(TeamError::NotFound("Match request"))?;
            if !from.contains(&existing.status) {
                return Err(TeamError::InvalidTransition {
                    from: existing.status,
                    action,
                });
            }
            existing.transition(to);
            Ok(existing.clone())
        })
    }
}

impl ChatRepository for Store {
    fn messages_for(&self, match_request_id: Uuid) -> TeamResult<Vec<ChatMessage>> {
        self.read(|t| {
            t.messages
                .iter()
                .filter(|m| m.match_request_id == match_request_id)
                .cloned()
                .collect()
        })
    }

    fn add_message(&self, message: &ChatMessage) -> TeamResult<()> {
        self.mutate(|t| {
            t.messages.push(message.clone());
            Ok(())
        })
    }
}
