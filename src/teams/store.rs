//! # Team Repositories
//!
//! Storage traits for the team domain. [`crate::storage::Store`] implements
//! all of them over one in-memory table set.

use uuid::Uuid;

use super::errors::TeamResult;
use super::models::{Availability, ChatMessage, MatchRequest, MatchStatus, Team};
use super::schedule::Weekday;

pub trait TeamRepository: Send + Sync {
    fn find_team(&self, id: Uuid) -> TeamResult<Option<Team>>;

    /// Teams managed by a user, in creation order
    fn teams_managed_by(&self, manager_id: Uuid) -> TeamResult<Vec<Team>>;

    fn all_teams(&self) -> TeamResult<Vec<Team>>;

    /// Insert; fails with `TeamNameTaken` if the name is in use
    fn create_team(&self, team: &Team) -> TeamResult<()>;

    /// Update; fails with `TeamNameTaken` if renamed onto another team
    fn update_team(&self, team: &Team) -> TeamResult<()>;
}

pub trait AvailabilityRepository: Send + Sync {
    fn find_slot(&self, id: Uuid) -> TeamResult<Option<Availability>>;

    /// A team's slots, optionally for one day
    fn slots_for_team(&self, team_id: Uuid, day: Option<Weekday>) -> TeamResult<Vec<Availability>>;

    /// Every slot on a given day, across all teams
    fn slots_on_day(&self, day: Weekday) -> TeamResult<Vec<Availability>>;

    /// Insert one slot, enforcing uniqueness and the per-team cap
    fn add_slot(&self, slot: &Availability) -> TeamResult<()>;

    fn delete_slot(&self, id: Uuid) -> TeamResult<()>;

    /// Swap all of a team's slots for `slots` in one step
    fn replace_slots(&self, team_id: Uuid, slots: &[Availability]) -> TeamResult<()>;
}

pub trait MatchRequestRepository: Send + Sync {
    fn find_request(&self, id: Uuid) -> TeamResult<Option<MatchRequest>>;

    /// Requests where any of `team_ids` is requester or receiver
    fn requests_involving(&self, team_ids: &[Uuid]) -> TeamResult<Vec<MatchRequest>>;

    fn all_requests(&self) -> TeamResult<Vec<MatchRequest>>;

    fn create_request(&self, request: &MatchRequest) -> TeamResult<()>;

    /// Move a request to `to` if its current status is one of `from`,
    /// checked and written under one lock
    fn transition_request(
        &self,
        id: Uuid,
        from: &[MatchStatus],
        to: MatchStatus,
        action: &'static str,
    ) -> TeamResult<MatchRequest>;
}

pub trait ChatRepository: Send + Sync {
    /// Messages of one request, in insertion order
    fn messages_for(&self, match_request_id: Uuid) -> TeamResult<Vec<ChatMessage>>;

    fn add_message(&self, message: &ChatMessage) -> TeamResult<()>;
}
