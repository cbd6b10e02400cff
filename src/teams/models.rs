//! # Team Models
//!
//! Teams, their weekly availability, match requests between teams and the
//! chat messages attached to a request.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{TeamError, TeamResult};
use super::schedule::{hhmm, TimeWindow, Weekday};

/// Longest accepted team name
pub const MAX_TEAM_NAME_LEN: usize = 100;

/// Longest accepted team location
pub const MAX_LOCATION_LEN: usize = 255;

/// Availability slots one team may hold
pub const MAX_SLOTS_PER_TEAM: usize = 10;

/// Longest accepted chat message
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Characters kept by [`ChatMessage::preview`]
pub const PREVIEW_LEN: usize = 50;

/// Team skill level, 1 (beginner) to 4 (advanced)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SkillLevel(u8);

impl SkillLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(level: u8) -> TeamResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(TeamError::Validation(format!(
                "skill level must be between {} and {}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for SkillLevel {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for SkillLevel {
    type Error = TeamError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<SkillLevel> for u8 {
    fn from(level: SkillLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A competitive team, owned by its manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub manager_id: Uuid,
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub location: String,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn new(
        name: &str,
        manager_id: Uuid,
        skill_level: SkillLevel,
        location: &str,
    ) -> TeamResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: validate_team_name(name)?,
            manager_id,
            skill_level,
            location: validate_location(location)?,
            created_at: Utc::now(),
        })
    }

    pub fn is_managed_by(&self, user_id: Uuid) -> bool {
        self.manager_id == user_id
    }
}

/// Trim and length-check a team name
pub fn validate_team_name(name: &str) -> TeamResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TeamError::validation("team name is required"));
    }
    if name.chars().count() > MAX_TEAM_NAME_LEN {
        return Err(TeamError::Validation(format!(
            "team name must be at most {} characters",
            MAX_TEAM_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Trim and length-check a location (empty is fine)
pub fn validate_location(location: &str) -> TeamResult<String> {
    let location = location.trim();
    if location.chars().count() > MAX_LOCATION_LEN {
        return Err(TeamError::Validation(format!(
            "location must be at most {} characters",
            MAX_LOCATION_LEN
        )));
    }
    Ok(location.to_string())
}

/// A weekly recurring window in which a team can play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub id: Uuid,
    pub team_id: Uuid,
    pub day_of_week: Weekday,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl Availability {
    pub fn new(team_id: Uuid, day_of_week: Weekday, window: TimeWindow) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            day_of_week,
            start_time: window.start,
            end_time: window.end,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Same team, day and times
    pub fn same_slot(&self, other: &Availability) -> bool {
        self.team_id == other.team_id
            && self.day_of_week == other.day_of_week
            && self.start_time == other.start_time
            && self.end_time == other.end_time
    }

    /// Ordering key: day, then start time
    pub fn sort_key(&self) -> (Weekday, NaiveTime, NaiveTime) {
        (self.day_of_week, self.start_time, self.end_time)
    }
}

/// Lifecycle state of a match request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    #[serde(rename = "P")]
    Pending,
    #[serde(rename = "A")]
    Accepted,
    #[serde(rename = "R")]
    Rejected,
    #[serde(rename = "C")]
    Cancelled,
}

impl MatchStatus {
    pub fn code(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "P",
            MatchStatus::Accepted => "A",
            MatchStatus::Rejected => "R",
            MatchStatus::Cancelled => "C",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "Pending",
            MatchStatus::Accepted => "Accepted",
            MatchStatus::Rejected => "Rejected",
            MatchStatus::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = TeamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P" | "PENDING" => Ok(MatchStatus::Pending),
            "A" | "ACCEPTED" => Ok(MatchStatus::Accepted),
            "R" | "REJECTED" => Ok(MatchStatus::Rejected),
            "C" | "CANCELLED" => Ok(MatchStatus::Cancelled),
            _ => Err(TeamError::Validation(format!("'{}' is not a valid status", s))),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_ascii_lowercase())
    }
}

/// A proposal from one team to another for a match at a time and place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub status: MatchStatus,
    pub match_time: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchRequest {
    /// A new pending request; a team may not challenge itself
    pub fn new(
        requester_id: Uuid,
        receiver_id: Uuid,
        match_time: DateTime<Utc>,
        location: &str,
    ) -> TeamResult<Self> {
        if requester_id == receiver_id {
            return Err(TeamError::SelfMatch);
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            requester_id,
            receiver_id,
            status: MatchStatus::Pending,
            match_time,
            location: location.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// The opposite participant, or None if `team_id` is not a participant
    pub fn other_team(&self, team_id: Uuid) -> Option<Uuid> {
        if team_id == self.requester_id {
            Some(self.receiver_id)
        } else if team_id == self.receiver_id {
            Some(self.requester_id)
        } else {
            None
        }
    }

    pub fn involves(&self, team_id: Uuid) -> bool {
        self.requester_id == team_id || self.receiver_id == team_id
    }

    pub fn is_pending(&self) -> bool {
        self.status == MatchStatus::Pending
    }

    pub fn is_accepted(&self) -> bool {
        self.status == MatchStatus::Accepted
    }

    pub fn is_rejected(&self) -> bool {
        self.status == MatchStatus::Rejected
    }

    pub(crate) fn transition(&mut self, to: MatchStatus) {
        self.status = to;
        self.updated_at = Utc::now();
    }
}

/// A message in the chat thread of one match request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub match_request_id: Uuid,
    pub sender_id: Uuid,
    #[serde(default)]
    pub sender_team_id: Option<Uuid>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        match_request_id: Uuid,
        sender_id: Uuid,
        sender_team_id: Option<Uuid>,
        content: &str,
    ) -> TeamResult<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TeamError::validation("message content is required"));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(TeamError::Validation(format!(
                "message must be at most {} characters",
                MAX_MESSAGE_LEN
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            match_request_id,
            sender_id,
            sender_team_id,
            content: content.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Content cut to 50 characters, with `...` when cut
    pub fn preview(&self) -> String {
        truncate_with_ellipsis(&self.content, PREVIEW_LEN)
    }
}

/// First `max` characters of `s`, plus `...` if anything was dropped
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut cut: String = s.chars().take(max).collect();
        cut.push_str("...");
        cut
    } else {
        s.to_string()
    }
}
