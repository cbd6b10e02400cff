//! HTTP API integration tests
//!
//! Drive the full router in memory: auth, teams, availability, matchmaking,
//! the match request lifecycle, chat and the dashboard.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use roaster::http_server::{build_router, AppState, HttpServerConfig};

const SECRET: &str = "integration-test-secret-0123456789";

fn app() -> Router {
    let state = Arc::new(AppState::in_memory(SECRET));
    build_router(&HttpServerConfig::default(), state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register a user and return the access token
async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "password": "password123",
            "password_confirm": "password123",
            "email": format!("{}@example.com", username),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {}: {}", username, body);
    body["access_token"].as_str().unwrap().to_string()
}

async fn create_team(app: &Router, token: &str, name: &str, skill: u8) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/teams",
        Some(token),
        Some(json!({ "name": name, "skill_level": skill, "location": "Riverside" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create team {}: {}", name, body);
    body["id"].as_str().unwrap().to_string()
}

async fn add_slot(app: &Router, token: &str, team_id: &str, day: &str, start: &str, end: &str) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/availability",
        Some(token),
        Some(json!({
            "team_id": team_id,
            "day_of_week": day,
            "start_time": start,
            "end_time": end,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "add slot: {}", body);
}

async fn propose(app: &Router, token: &str, requester: &str, receiver: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/match-requests",
        Some(token),
        Some(json!({
            "requester_id": requester,
            "receiver_id": receiver,
            "match_time": (Utc::now() + Duration::days(3)).to_rfc3339(),
            "location": "Central Park",
        })),
    )
    .await
}

fn names(candidates: &Value) -> Vec<String> {
    candidates
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["team"]["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = app();
    register(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"].get("password_hash").is_none());
    let token = body["access_token"].as_str().unwrap().to_string();
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "password": "password123",
            "password_confirm": "password123",
        })),
    )
    .await;
    assert!(status.is_client_error());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_register_rejects_malformed_email() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "password": "password123",
            "password_confirm": "password123",
            "email": "alice at example dot com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn test_api_requires_token() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/teams", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, _) = send(&app, Method::GET, "/api/teams", Some("not-a-jwt"), None).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_teams_and_availability() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let dragons = create_team(&app, &alice, "Dragons", 2).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/teams",
        Some(&bob),
        Some(json!({ "name": "Dragons" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    add_slot(&app, &alice, &dragons, "MON", "18:00", "20:00").await;
    add_slot(&app, &alice, &dragons, "WED", "09:00", "11:00").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/availability",
        Some(&alice),
        Some(json!({
            "team_id": dragons,
            "day_of_week": "TUE",
            "start_time": "20:00",
            "end_time": "18:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    // bob does not manage the team
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/teams/{}", dragons),
        Some(&bob),
        Some(json!({ "location": "Elsewhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/teams/{}?day=MON", dragons),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["manager_username"], "alice");
    assert_eq!(body["availabilities"].as_array().unwrap().len(), 1);
    assert_eq!(body["availabilities"][0]["start_time"], "18:00");

    let (status, body) = send(&app, Method::GET, "/api/availability", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let slots = body.as_array().unwrap();
    assert_eq!(slots.len(), 2);

    let slot_id = slots[0]["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/availability/{}", slot_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/availability/{}", slot_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/teams/{}/availability", dragons),
        Some(&alice),
        Some(json!([
            { "day_of_week": "SAT", "start_time": "10:00", "end_time": "12:00" },
            { "day_of_week": "SUN", "start_time": "10:00", "end_time": "12:00" },
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_matchmaking() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let carol = register(&app, "carol").await;
    let dave = register(&app, "dave").await;

    let dragons = create_team(&app, &alice, "Dragons", 2).await;
    let tigers = create_team(&app, &bob, "Tigers", 3).await;
    let owls = create_team(&app, &carol, "Owls", 4).await;
    let sharks = create_team(&app, &dave, "Sharks", 2).await;

    add_slot(&app, &alice, &dragons, "MON", "18:00", "20:00").await;
    add_slot(&app, &bob, &tigers, "MON", "19:00", "21:00").await;
    add_slot(&app, &carol, &owls, "MON", "18:00", "20:00").await;
    // touches the Dragons window without overlapping it
    add_slot(&app, &dave, &sharks, "MON", "20:00", "22:00").await;

    let (status, body) = send(&app, Method::GET, "/api/matchmaking", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A 'day' query parameter is required.");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/matchmaking?day=MON",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["day_display"], "Monday");
    assert_eq!(body["skill_min"], 1);
    assert_eq!(body["skill_max"], 3);
    assert_eq!(names(&body["candidates"]), vec!["Tigers"]);
    assert_eq!(body["candidates"][0]["overlaps"][0]["start"], "19:00");
    assert_eq!(body["candidates"][0]["overlaps"][0]["end"], "20:00");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/matchmaking?day=MON&overlap=false",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body["candidates"]), vec!["Sharks", "Tigers"]);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/matchmaking?day=MON&tolerance=2",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body["candidates"]), vec!["Owls", "Tigers"]);

    // searching for someone else's team
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/matchmaking?day=MON&team={}", tigers),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/matchmaking?day=XYZ",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/match-finder?day=MON",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, _) = send(&app, Method::GET, "/api/match-finder", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_matchmaking_without_team() {
    let app = app();
    let alice = register(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/matchmaking?day=MON",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_request_lifecycle_and_chat() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let carol = register(&app, "carol").await;

    let dragons = create_team(&app, &alice, "Dragons", 2).await;
    let tigers = create_team(&app, &bob, "Tigers", 2).await;
    create_team(&app, &carol, "Owls", 2).await;

    // only the requester's manager may propose
    let (status, _) = propose(&app, &bob, &dragons, &tigers).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = propose(&app, &alice, &dragons, &dragons).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, request) = propose(&app, &alice, &dragons, &tigers).await;
    assert_eq!(status, StatusCode::CREATED, "{}", request);
    assert_eq!(request["status"], "P");
    let request_id = request["id"].as_str().unwrap().to_string();

    let (status, _) = propose(&app, &alice, &dragons, &tigers).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // the requester cannot accept their own proposal
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/match-requests/{}/accept", request_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/match-requests?status=P",
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["requester_name"], "Dragons");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/match-requests/{}/accept", request_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "A");

    // accepted requests cannot be rejected
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/match-requests/{}/reject", request_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let messages = format!("/api/match-requests/{}/messages", request_id);
    let (status, body) = send(
        &app,
        Method::POST,
        &messages,
        Some(&alice),
        Some(json!({ "content": "See you at 7?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sender_team_id"], dragons.as_str());

    let (status, _) = send(
        &app,
        Method::POST,
        &messages,
        Some(&bob),
        Some(json!({ "content": "Works for us" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        &messages,
        Some(&carol),
        Some(json!({ "content": "Can we join?" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, &messages, Some(&carol), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, &messages, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let thread: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(thread, vec!["See you at 7?", "Works for us"]);

    let message_id = body[0]["id"].as_str().unwrap().to_string();
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("{}/{}", messages, message_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "See you at 7?");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("{}/{}", messages, message_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/match-requests/{}/cancel", request_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "C");
}

#[tokio::test]
async fn test_dashboard_and_metrics() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let dragons = create_team(&app, &alice, "Dragons", 2).await;
    let tigers = create_team(&app, &bob, "Tigers", 2).await;

    let (status, request) = propose(&app, &alice, &dragons, &tigers).await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/dashboard", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_team"]["name"], "Tigers");
    assert_eq!(body["incoming"].as_array().unwrap().len(), 1);
    assert_eq!(body["pending_count"], 1);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/match-requests/{}/reject", request_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/dashboard", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending_count"], 0);
    assert_eq!(body["history"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/observability/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users_registered"], 2);
    assert_eq!(body["teams_created"], 2);
    assert_eq!(body["requests_created"], 1);
    assert_eq!(body["requests_rejected"], 1);
}

#[tokio::test]
async fn test_weekdays() {
    let app = app();
    let alice = register(&app, "alice").await;
    let (status, body) = send(&app, Method::GET, "/api/weekdays", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let days = body.as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["code"], "MON");
    assert_eq!(days[0]["name"], "Monday");
}
