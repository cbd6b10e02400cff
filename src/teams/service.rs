//! # Roster Service
//!
//! Team management, availability and matchmaking. The match-request
//! lifecycle lives in `requests.rs` and chat in `chat.rs`; all three extend
//! the same [`RosterService`].

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::UserRepository;
use crate::observability::MetricsRegistry;
use crate::storage::Store;

use super::errors::{TeamError, TeamResult};
use super::matchmaking::{
    evaluate, skill_range, AvailableTeam, MatchCandidate, MatchQuery, MatchResults, TeamSummary,
};
use super::models::{validate_location, validate_team_name, Availability, SkillLevel, Team};
use super::schedule::{hhmm, TimeWindow, Weekday};
use super::store::{AvailabilityRepository, ChatRepository, MatchRequestRepository, TeamRepository};

/// Body of a team creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub name: String,
    #[serde(default)]
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub location: String,
}

/// Partial team update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub skill_level: Option<SkillLevel>,
    pub location: Option<String>,
}

/// One weekly slot as submitted by a client
#[derive(Debug, Clone, Deserialize)]
pub struct SlotInput {
    pub day_of_week: Weekday,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl SlotInput {
    fn into_slot(self, team_id: Uuid) -> TeamResult<Availability> {
        let window = TimeWindow::new(self.start_time, self.end_time)?;
        Ok(Availability::new(team_id, self.day_of_week, window))
    }
}

/// Body of a single slot creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewSlot {
    pub team_id: Uuid,
    #[serde(flatten)]
    pub slot: SlotInput,
}

/// A managed team with the time of its latest outgoing request
#[derive(Debug, Clone, Serialize)]
pub struct TeamOverview {
    #[serde(flatten)]
    pub team: Team,
    pub last_match_date: Option<DateTime<Utc>>,
}

/// A team with its manager and slots
#[derive(Debug, Clone, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub manager_username: String,
    pub availabilities: Vec<Availability>,
}

/// Team, availability, matchmaking, request and chat operations
pub struct RosterService {
    pub(super) teams: Arc<dyn TeamRepository>,
    pub(super) slots: Arc<dyn AvailabilityRepository>,
    pub(super) requests: Arc<dyn MatchRequestRepository>,
    pub(super) chat: Arc<dyn ChatRepository>,
    pub(super) users: Arc<dyn UserRepository>,
    pub(super) metrics: Arc<MetricsRegistry>,
}

impl RosterService {
    pub fn new(store: Arc<Store>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            teams: store.clone(),
            slots: store.clone(),
            requests: store.clone(),
            chat: store.clone(),
            users: store,
            metrics,
        }
    }

    // ==================
    // Lookup helpers
    // ==================

    pub(super) fn team(&self, team_id: Uuid) -> TeamResult<Team> {
        self.teams
            .find_team(team_id)?
            .ok_or(TeamError::NotFound("Team"))
    }

    /// The team if `user_id` manages it; anything else looks like absence
    fn owned_team(&self, user_id: Uuid, team_id: Uuid) -> TeamResult<Team> {
        self.teams
            .find_team(team_id)?
            .filter(|team| team.is_managed_by(user_id))
            .ok_or(TeamError::NotFound("Team"))
    }

    pub(super) fn manages(&self, user_id: Uuid, team_id: Uuid) -> TeamResult<bool> {
        Ok(self
            .teams
            .find_team(team_id)?
            .is_some_and(|team| team.is_managed_by(user_id)))
    }

    pub(super) fn username(&self, user_id: Uuid) -> TeamResult<String> {
        Ok(self
            .users
            .find_by_id(user_id)?
            .map(|user| user.username)
            .unwrap_or_default())
    }

    fn summary(&self, team: &Team) -> TeamResult<TeamSummary> {
        Ok(TeamSummary::new(team, self.username(team.manager_id)?))
    }

    /// Latest outgoing `match_time` of a team
    pub(super) fn last_match_date(&self, team_id: Uuid) -> TeamResult<Option<DateTime<Utc>>> {
        Ok(self
            .requests
            .requests_involving(&[team_id])?
            .iter()
            .filter(|r| r.requester_id == team_id)
            .map(|r| r.match_time)
            .max())
    }

    // ==================
    // Teams
    // ==================

    /// Create a team managed by `user_id`
    pub fn create_team(&self, user_id: Uuid, new: NewTeam) -> TeamResult<Team> {
        let team = Team::new(&new.name, user_id, new.skill_level, &new.location)?;
        self.teams.create_team(&team)?;
        self.metrics.increment_teams_created();

        info!(team_id = %team.id, name = %team.name, manager_id = %user_id, "team created");
        Ok(team)
    }

    /// Update a team; only its manager may
    pub fn update_team(&self, user_id: Uuid, team_id: Uuid, changes: TeamUpdate) -> TeamResult<Team> {
        let mut team = self.team(team_id)?;
        if !team.is_managed_by(user_id) {
            return Err(TeamError::forbidden("Only the team's manager can edit it"));
        }

        if let Some(name) = changes.name {
            team.name = validate_team_name(&name)?;
        }
        if let Some(level) = changes.skill_level {
            team.skill_level = level;
        }
        if let Some(location) = changes.location {
            team.location = validate_location(&location)?;
        }

        self.teams.update_team(&team)?;
        info!(team_id = %team.id, "team updated");
        Ok(team)
    }

    /// Teams managed by the user, most recently matched first
    pub fn list_my_teams(&self, user_id: Uuid) -> TeamResult<Vec<TeamOverview>> {
        let mut overviews = self
            .teams
            .teams_managed_by(user_id)?
            .into_iter()
            .map(|team| -> TeamResult<TeamOverview> {
                let last_match_date = self.last_match_date(team.id)?;
                Ok(TeamOverview { team, last_match_date })
            })
            .collect::<TeamResult<Vec<_>>>()?;

        // None sorts below Some, so teams never matched end up last
        overviews.sort_by(|a, b| b.last_match_date.cmp(&a.last_match_date));
        Ok(overviews)
    }

    /// A team with its slots, optionally for one day
    pub fn get_team(&self, team_id: Uuid, day: Option<Weekday>) -> TeamResult<TeamDetail> {
        let team = self.team(team_id)?;
        let mut availabilities = self.slots.slots_for_team(team_id, day)?;
        availabilities.sort_by_key(|s| s.sort_key());

        Ok(TeamDetail {
            manager_username: self.username(team.manager_id)?,
            team,
            availabilities,
        })
    }

    // ==================
    // Availability
    // ==================

    /// Every slot of every team the user manages
    pub fn list_availability(&self, user_id: Uuid) -> TeamResult<Vec<Availability>> {
        let mut all = Vec::new();
        for team in self.teams.teams_managed_by(user_id)? {
            all.extend(self.slots.slots_for_team(team.id, None)?);
        }
        all.sort_by_key(|s| s.sort_key());
        Ok(all)
    }

    pub fn add_availability(&self, user_id: Uuid, new: NewSlot) -> TeamResult<Availability> {
        let team = self.owned_team(user_id, new.team_id)?;
        let slot = new.slot.into_slot(team.id)?;
        self.slots.add_slot(&slot)?;

        info!(team_id = %team.id, day = %slot.day_of_week, window = %slot.window(), "availability added");
        Ok(slot)
    }

    pub fn delete_availability(&self, user_id: Uuid, slot_id: Uuid) -> TeamResult<()> {
        let slot = self
            .slots
            .find_slot(slot_id)?
            .ok_or(TeamError::NotFound("Availability"))?;
        self.owned_team(user_id, slot.team_id)
            .map_err(|_| TeamError::NotFound("Availability"))?;

        self.slots.delete_slot(slot_id)?;
        info!(team_id = %slot.team_id, slot_id = %slot_id, "availability removed");
        Ok(())
    }

    /// Replace all of a team's slots; nothing changes unless every slot is valid
    pub fn replace_availability(
        &self,
        user_id: Uuid,
        team_id: Uuid,
        inputs: Vec<SlotInput>,
    ) -> TeamResult<Vec<Availability>> {
        let team = self.owned_team(user_id, team_id)?;
        let mut slots = inputs
            .into_iter()
            .map(|input| input.into_slot(team.id))
            .collect::<TeamResult<Vec<_>>>()?;

        self.slots.replace_slots(team.id, &slots)?;
        info!(team_id = %team.id, count = slots.len(), "availability replaced");

        slots.sort_by_key(|s| s.sort_key());
        Ok(slots)
    }

    // ==================
    // Matchmaking
    // ==================

    /// Opponents for one of the user's teams on a given day
    pub fn find_matches(&self, user_id: Uuid, query: MatchQuery) -> TeamResult<MatchResults> {
        let day = query
            .day
            .ok_or_else(|| TeamError::validation("A 'day' query parameter is required."))?;

        let managed = self.teams.teams_managed_by(user_id)?;
        let searching = match query.team_id {
            Some(team_id) => managed
                .iter()
                .find(|team| team.id == team_id)
                .cloned()
                .ok_or_else(|| TeamError::forbidden("You can only search on behalf of a team you manage."))?,
            None => managed.first().cloned().ok_or(TeamError::NoManagedTeam)?,
        };

        self.metrics.increment_matchmaking_queries();

        let range = skill_range(searching.skill_level, query.skill_tolerance);
        let own_slots = self.slots.slots_for_team(searching.id, Some(day))?;
        let day_slots = self.slots.slots_on_day(day)?;

        let mut candidates = Vec::new();
        for team in self.teams.all_teams()? {
            if team.is_managed_by(user_id) {
                continue;
            }
            let theirs: Vec<Availability> = day_slots
                .iter()
                .filter(|s| s.team_id == team.id)
                .cloned()
                .collect();

            if let Some((slots, overlaps)) =
                evaluate(&range, &own_slots, &team, &theirs, query.require_overlap)
            {
                candidates.push(MatchCandidate {
                    team: self.summary(&team)?,
                    slots,
                    overlaps,
                });
            }
        }
        candidates.sort_by(|a, b| a.team.name.cmp(&b.team.name));

        info!(
            team_id = %searching.id,
            day = %day,
            found = candidates.len(),
            "matchmaking search"
        );

        Ok(MatchResults {
            day,
            day_display: day.display_name(),
            team: self.summary(&searching)?,
            skill_min: *range.start(),
            skill_max: *range.end(),
            require_overlap: query.require_overlap,
            candidates,
        })
    }

    /// Every other manager's team with a slot on `day`, by name
    pub fn teams_available_on(&self, user_id: Uuid, day: Weekday) -> TeamResult<Vec<AvailableTeam>> {
        let day_slots = self.slots.slots_on_day(day)?;

        let mut available = Vec::new();
        for team in self.teams.all_teams()? {
            if team.is_managed_by(user_id) {
                continue;
            }
            let mut slots: Vec<Availability> = day_slots
                .iter()
                .filter(|s| s.team_id == team.id)
                .cloned()
                .collect();
            if slots.is_empty() {
                continue;
            }
            slots.sort_by_key(|s| s.sort_key());
            available.push(AvailableTeam {
                team: self.summary(&team)?,
                slots,
            });
        }
        available.sort_by(|a, b| a.team.name.cmp(&b.team.name));
        Ok(available)
    }
}
