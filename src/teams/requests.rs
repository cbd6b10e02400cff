//! # Match Request Lifecycle
//!
//! ```text
//! Pending  --accept(receiver)-->  Accepted
//! Pending  --reject(receiver)-->  Rejected
//! Pending  --cancel(requester)--> Cancelled
//! Accepted --cancel(either)-->    Cancelled
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::errors::{TeamError, TeamResult};
use super::models::{MatchRequest, MatchStatus, Team};
use super::service::RosterService;

/// Body of a new match request
#[derive(Debug, Clone, Deserialize)]
pub struct NewMatchRequest {
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub match_time: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
}

/// A request with both team names resolved
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: MatchRequest,
    pub requester_name: String,
    pub receiver_name: String,
    pub status_display: &'static str,
}

/// Request overview for a manager
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub teams: Vec<Team>,
    pub current_team: Option<Team>,
    pub outgoing: Vec<RequestView>,
    pub incoming: Vec<RequestView>,
    pub pending_count: usize,
    /// Accepted or cancelled
    pub active: Vec<RequestView>,
    /// Rejected
    pub history: Vec<RequestView>,
}

/// Newest `created_at` first; ties keep the later insertion first
fn newest_first(requests: &mut [MatchRequest]) {
    requests.reverse();
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl RosterService {
    fn request(&self, request_id: Uuid) -> TeamResult<MatchRequest> {
        self.requests
            .find_request(request_id)?
            .ok_or(TeamError::NotFound("Match request"))
    }

    pub(super) fn view(&self, request: MatchRequest) -> TeamResult<RequestView> {
        let requester_name = self.team(request.requester_id)?.name;
        let receiver_name = self.team(request.receiver_id)?.name;
        Ok(RequestView {
            status_display: request.status.label(),
            request,
            requester_name,
            receiver_name,
        })
    }

    /// Load a request the user takes part in, through either team
    pub(super) fn participating_request(&self, user_id: Uuid, request_id: Uuid) -> TeamResult<MatchRequest> {
        let request = self.request(request_id)?;
        if !self.manages(user_id, request.requester_id)? && !self.manages(user_id, request.receiver_id)? {
            return Err(TeamError::forbidden("You are not a participant in this match request"));
        }
        Ok(request)
    }

    /// Propose a match from one of the user's teams
    pub fn create_request(&self, user_id: Uuid, new: NewMatchRequest) -> TeamResult<MatchRequest> {
        let requester = self.team(new.requester_id)?;
        if !requester.is_managed_by(user_id) {
            return Err(TeamError::forbidden("You can only send requests from a team you manage"));
        }
        if new.requester_id == new.receiver_id {
            return Err(TeamError::SelfMatch);
        }

        let receiver = self.team(new.receiver_id)?;
        if receiver.is_managed_by(user_id) {
            return Err(TeamError::SelfMatch);
        }
        if new.match_time <= Utc::now() {
            return Err(TeamError::validation("match time must be in the future"));
        }

        let request = MatchRequest::new(requester.id, receiver.id, new.match_time, &new.location)?;
        self.requests.create_request(&request)?;
        self.metrics.increment_requests_created();

        info!(
            request_id = %request.id,
            requester = %requester.name,
            receiver = %receiver.name,
            match_time = %request.match_time,
            "match request created"
        );
        Ok(request)
    }

    fn answer(
        &self,
        user_id: Uuid,
        request_id: Uuid,
        to: MatchStatus,
        action: &'static str,
    ) -> TeamResult<MatchRequest> {
        let request = self.request(request_id)?;
        if !self.manages(user_id, request.receiver_id)? {
            return Err(TeamError::Forbidden(format!(
                "Only the receiving team's manager can {} this request",
                action
            )));
        }

        let request = self
            .requests
            .transition_request(request.id, &[MatchStatus::Pending], to, action)?;

        info!(request_id = %request.id, status = %request.status, "match request answered");
        Ok(request)
    }

    /// Receiver's manager accepts a pending request
    pub fn accept_request(&self, user_id: Uuid, request_id: Uuid) -> TeamResult<MatchRequest> {
        let request = self.answer(user_id, request_id, MatchStatus::Accepted, "accept")?;
        self.metrics.increment_requests_accepted();
        Ok(request)
    }

    /// Receiver's manager rejects a pending request
    pub fn reject_request(&self, user_id: Uuid, request_id: Uuid) -> TeamResult<MatchRequest> {
        let request = self.answer(user_id, request_id, MatchStatus::Rejected, "reject")?;
        self.metrics.increment_requests_rejected();
        Ok(request)
    }

    /// Withdraw a pending request, or call off an accepted match
    pub fn cancel_request(&self, user_id: Uuid, request_id: Uuid) -> TeamResult<MatchRequest> {
        let request = self.participating_request(user_id, request_id)?;

        // a pending request may be accepted before the write lands; either
        // state is cancellable by the requester
        let from: &[MatchStatus] = match request.status {
            MatchStatus::Pending => {
                if !self.manages(user_id, request.requester_id)? {
                    return Err(TeamError::forbidden(
                        "Only the requesting team's manager can withdraw a pending request",
                    ));
                }
                &[MatchStatus::Pending, MatchStatus::Accepted]
            }
            MatchStatus::Accepted => &[MatchStatus::Accepted],
            from => {
                return Err(TeamError::InvalidTransition {
                    from,
                    action: "cancel",
                })
            }
        };

        let request = self
            .requests
            .transition_request(request.id, from, MatchStatus::Cancelled, "cancel")?;
        self.metrics.increment_requests_cancelled();

        info!(request_id = %request.id, "match request cancelled");
        Ok(request)
    }

    pub fn get_request(&self, user_id: Uuid, request_id: Uuid) -> TeamResult<RequestView> {
        let request = self.participating_request(user_id, request_id)?;
        self.view(request)
    }

    /// Requests touching any of the user's teams, newest first
    pub fn list_requests(&self, user_id: Uuid, status: Option<MatchStatus>) -> TeamResult<Vec<RequestView>> {
        let team_ids: Vec<Uuid> = self
            .teams
            .teams_managed_by(user_id)?
            .iter()
            .map(|team| team.id)
            .collect();

        let mut requests: Vec<MatchRequest> = self
            .requests
            .requests_involving(&team_ids)?
            .into_iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect();
        newest_first(&mut requests);

        requests.into_iter().map(|r| self.view(r)).collect()
    }

    /// Directional requests of the user's most recently matched team, plus
    /// active and past matches across all of the user's teams
    pub fn dashboard(&self, user_id: Uuid) -> TeamResult<Dashboard> {
        let overviews = self.list_my_teams(user_id)?;
        let teams: Vec<Team> = overviews.into_iter().map(|o| o.team).collect();
        let Some(current) = teams.first().cloned() else {
            return Ok(Dashboard::default());
        };

        let team_ids: Vec<Uuid> = teams.iter().map(|t| t.id).collect();
        let mut involved = self.requests.requests_involving(&team_ids)?;
        newest_first(&mut involved);

        let mut dashboard = Dashboard {
            teams,
            current_team: Some(current.clone()),
            ..Default::default()
        };

        for request in involved {
            let view = self.view(request)?;
            match view.request.status {
                MatchStatus::Accepted | MatchStatus::Cancelled => dashboard.active.push(view.clone()),
                MatchStatus::Rejected => dashboard.history.push(view.clone()),
                MatchStatus::Pending => {}
            }

            if !view.request.involves(current.id) {
                continue;
            }
            if view.request.is_pending() {
                dashboard.pending_count += 1;
            }
            if view.request.requester_id == current.id {
                dashboard.outgoing.push(view);
            } else {
                dashboard.incoming.push(view);
            }
        }

        Ok(dashboard)
    }
}
