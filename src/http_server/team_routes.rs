//! Team HTTP Routes
//!
//! Teams, weekly availability, matchmaking and the weekday list.

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::teams::matchmaking::{AvailableTeam, DEFAULT_SKILL_TOLERANCE};
use crate::teams::service::{TeamDetail, TeamOverview};
use crate::teams::{
    Availability, MatchQuery, MatchResults, NewSlot, NewTeam, SlotInput, Team, TeamError,
    TeamUpdate, Weekday,
};

use super::errors::ApiResult;
use super::state::AppState;

/// Team routes, nested under `/api`
pub fn team_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/teams", get(list_teams_handler).post(create_team_handler))
        .route("/teams/:id", get(get_team_handler).patch(update_team_handler))
        .route("/teams/:id/availability", put(replace_availability_handler))
        .route(
            "/availability",
            get(list_availability_handler).post(add_availability_handler),
        )
        .route("/availability/:id", delete(delete_availability_handler))
        .route("/matchmaking", get(matchmaking_handler))
        .route("/match-finder", get(match_finder_handler))
        .route("/weekdays", get(weekdays_handler))
        .with_state(state)
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Default, Deserialize)]
pub struct DayParams {
    pub day: Option<String>,
}

impl DayParams {
    fn parse(&self) -> Result<Option<Weekday>, TeamError> {
        self.day
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(str::parse)
            .transpose()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchmakingParams {
    pub day: Option<String>,
    pub team: Option<Uuid>,
    pub tolerance: Option<u8>,
    pub overlap: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct WeekdayResponse {
    pub code: &'static str,
    pub name: &'static str,
}

// ==================
// Team Handlers
// ==================

async fn list_teams_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<TeamOverview>>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.list_my_teams(user_id)?))
}

async fn create_team_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<NewTeam>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let user_id = state.require_user(&headers)?;
    let team = state.roster.create_team(user_id, request)?;
    Ok((StatusCode::CREATED, Json(team)))
}

async fn get_team_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
    Query(params): Query<DayParams>,
) -> ApiResult<Json<TeamDetail>> {
    state.require_user(&headers)?;
    let day = params.parse()?;
    Ok(Json(state.roster.get_team(team_id, day)?))
}

async fn update_team_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
    Json(changes): Json<TeamUpdate>,
) -> ApiResult<Json<Team>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.update_team(user_id, team_id, changes)?))
}

// ==================
// Availability Handlers
// ==================

async fn list_availability_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Availability>>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.list_availability(user_id)?))
}

async fn add_availability_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<NewSlot>,
) -> ApiResult<(StatusCode, Json<Availability>)> {
    let user_id = state.require_user(&headers)?;
    let slot = state.roster.add_availability(user_id, request)?;
    Ok((StatusCode::CREATED, Json(slot)))
}

async fn delete_availability_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(slot_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let user_id = state.require_user(&headers)?;
    state.roster.delete_availability(user_id, slot_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn replace_availability_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
    Json(slots): Json<Vec<SlotInput>>,
) -> ApiResult<Json<Vec<Availability>>> {
    let user_id = state.require_user(&headers)?;
    Ok(Json(state.roster.replace_availability(user_id, team_id, slots)?))
}

// ==================
// Matchmaking Handlers
// ==================

async fn matchmaking_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<MatchmakingParams>,
) -> ApiResult<Json<MatchResults>> {
    let user_id = state.require_user(&headers)?;
    let day = DayParams { day: params.day }.parse()?;

    let query = MatchQuery {
        day,
        team_id: params.team,
        skill_tolerance: params.tolerance.unwrap_or(DEFAULT_SKILL_TOLERANCE),
        require_overlap: params.overlap.unwrap_or(true),
    };
    Ok(Json(state.roster.find_matches(user_id, query)?))
}

async fn match_finder_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<DayParams>,
) -> ApiResult<Json<Vec<AvailableTeam>>> {
    let user_id = state.require_user(&headers)?;
    let day = params
        .parse()?
        .ok_or_else(|| TeamError::validation("A 'day' query parameter is required."))?;
    Ok(Json(state.roster.teams_available_on(user_id, day)?))
}

async fn weekdays_handler() -> Json<Vec<WeekdayResponse>> {
    Json(
        Weekday::ALL
            .iter()
            .map(|day| WeekdayResponse {
                code: day.code(),
                name: day.display_name(),
            })
            .collect(),
    )
}
