//! # Teams Module
//!
//! Teams, weekly availability, matchmaking, the match-request lifecycle,
//! per-request chat and match reminders.

mod chat;
pub mod errors;
pub mod matchmaking;
pub mod models;
pub mod reminders;
pub mod requests;
pub mod schedule;
pub mod service;
pub mod store;

pub use errors::{TeamError, TeamResult};
pub use matchmaking::{MatchQuery, MatchResults};
pub use models::{Availability, ChatMessage, MatchRequest, MatchStatus, SkillLevel, Team};
pub use reminders::{send_reminders, Notifier, ReminderReport, SmtpConfig};
pub use requests::{Dashboard, NewMatchRequest, RequestView};
pub use schedule::{TimeWindow, Weekday};
pub use service::{NewSlot, NewTeam, RosterService, SlotInput, TeamUpdate};
