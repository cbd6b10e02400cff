//! # HTTP Server Module
//!
//! JSON REST API over axum.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/auth/*` - Registration, login and tokens
//! - `/api/*` - Teams, availability, matchmaking, match requests and chat
//! - `/observability/*` - Metrics

pub mod auth_routes;
pub mod config;
pub mod errors;
pub mod match_routes;
pub mod observability_routes;
pub mod server;
pub mod state;
pub mod team_routes;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use server::{build_router, HttpServer};
pub use state::AppState;
