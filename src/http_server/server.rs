//! # HTTP Server
//!
//! Main HTTP server combining all endpoint routers.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::auth_routes::auth_routes;
use super::config::HttpServerConfig;
use super::match_routes::match_routes;
use super::observability_routes::{health_routes, observability_routes};
use super::state::AppState;
use super::team_routes::team_routes;

/// How often expired refresh sessions are dropped
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// HTTP Server for the roaster API
pub struct HttpServer {
    config: HttpServerConfig,
    state: Arc<AppState>,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, state: Arc<AppState>) -> Self {
        let router = build_router(&config, state.clone());
        Self {
            config,
            state,
            router,
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Bind and serve until the process is stopped
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self.config.bind_addr()?;

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "roaster HTTP server listening");

        let sweeper = spawn_session_sweeper(self.state);
        let result = axum::serve(listener, self.router).await;
        sweeper.abort();
        result
    }
}

fn spawn_session_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            timer.tick().await;
            match state.auth.purge_expired_sessions() {
                Ok(0) => {}
                Ok(purged) => info!(purged, "expired sessions purged"),
                Err(e) => warn!(error = %e, "session purge failed"),
            }
        }
    })
}

/// Build the combined router with all endpoints
pub fn build_router(config: &HttpServerConfig, state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_routes())
        .nest("/auth", auth_routes(state.clone()))
        .nest("/observability", observability_routes(state.clone()))
        .nest("/api", team_routes(state.clone()).merge(match_routes(state)))
        .layer(TraceLayer::new_for_http())
        .layer(config.cors_layer())
}
