//! # Matchmaking
//!
//! Opponent eligibility: a candidate must sit within the searching team's
//! skill range, hold at least one slot on the requested day and, unless the
//! caller opts out, share some time with the searching team on that day.
//!
//! The functions here are pure; [`super::RosterService::find_matches`] loads
//! the data and applies them.

use std::ops::RangeInclusive;

use serde::Serialize;
use uuid::Uuid;

use super::models::{Availability, SkillLevel, Team};
use super::schedule::{TimeWindow, Weekday};

/// Skill levels either side of the searching team's level still considered
pub const DEFAULT_SKILL_TOLERANCE: u8 = 1;

/// Parameters of one matchmaking search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    /// Day to search; required, but kept optional so a missing day is
    /// reported as a validation error rather than a parse failure
    pub day: Option<Weekday>,
    /// Which of the caller's teams is searching; defaults to the first one
    pub team_id: Option<Uuid>,
    pub skill_tolerance: u8,
    pub require_overlap: bool,
}

impl Default for MatchQuery {
    fn default() -> Self {
        Self {
            day: None,
            team_id: None,
            skill_tolerance: DEFAULT_SKILL_TOLERANCE,
            require_overlap: true,
        }
    }
}

impl MatchQuery {
    pub fn for_day(day: Weekday) -> Self {
        Self {
            day: Some(day),
            ..Default::default()
        }
    }
}

/// Public face of a team in search results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub skill_level: SkillLevel,
    pub manager_username: String,
}

impl TeamSummary {
    pub fn new(team: &Team, manager_username: impl Into<String>) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            location: team.location.clone(),
            skill_level: team.skill_level,
            manager_username: manager_username.into(),
        }
    }
}

/// One eligible opponent
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub team: TeamSummary,
    /// The candidate's slots on the searched day, by start time
    pub slots: Vec<Availability>,
    /// Time shared with the searching team on that day
    pub overlaps: Vec<TimeWindow>,
}

/// Outcome of a search
#[derive(Debug, Clone, Serialize)]
pub struct MatchResults {
    pub day: Weekday,
    pub day_display: &'static str,
    pub team: TeamSummary,
    pub skill_min: u8,
    pub skill_max: u8,
    pub require_overlap: bool,
    pub candidates: Vec<MatchCandidate>,
}

/// A team with at least one slot on a day, unfiltered by skill or overlap
#[derive(Debug, Clone, Serialize)]
pub struct AvailableTeam {
    pub team: TeamSummary,
    pub slots: Vec<Availability>,
}

/// `[max(1, level - tolerance), min(4, level + tolerance)]`
pub fn skill_range(level: SkillLevel, tolerance: u8) -> RangeInclusive<u8> {
    let level = level.value();
    let low = level.saturating_sub(tolerance).max(SkillLevel::MIN);
    let high = level.saturating_add(tolerance).min(SkillLevel::MAX);
    low..=high
}

/// Every pairwise intersection between two slot lists, sorted and deduplicated
pub fn overlapping_windows(ours: &[Availability], theirs: &[Availability]) -> Vec<TimeWindow> {
    let mut windows: Vec<TimeWindow> = ours
        .iter()
        .flat_map(|a| theirs.iter().filter_map(move |b| a.window().intersection(&b.window())))
        .collect();
    windows.sort();
    windows.dedup();
    windows
}

/// Judge one candidate.
///
/// `own_slots` and `their_slots` must already be restricted to the searched
/// day. Returns `None` when the candidate is out of range, has no slot, or
/// (with `require_overlap`) shares no time.
pub fn evaluate(
    range: &RangeInclusive<u8>,
    own_slots: &[Availability],
    candidate: &Team,
    their_slots: &[Availability],
    require_overlap: bool,
) -> Option<(Vec<Availability>, Vec<TimeWindow>)> {
    if !range.contains(&candidate.skill_level.value()) || their_slots.is_empty() {
        return None;
    }

    let overlaps = overlapping_windows(own_slots, their_slots);
    if require_overlap && overlaps.is_empty() {
        return None;
    }

    let mut slots = their_slots.to_vec();
    slots.sort_by_key(|s| s.sort_key());
    Some((slots, overlaps))
}
