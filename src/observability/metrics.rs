//! Metrics registry for the roaster service
//!
//! - Counters only
//! - Monotonic increase
//! - Reset only on process start

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters
///
/// All counters use Relaxed ordering; exact cross-counter consistency is not
/// needed.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    users_registered: AtomicU64,
    teams_created: AtomicU64,
    requests_created: AtomicU64,
    requests_accepted: AtomicU64,
    requests_rejected: AtomicU64,
    requests_cancelled: AtomicU64,
    messages_posted: AtomicU64,
    matchmaking_queries: AtomicU64,
    reminders_sent: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_users_registered(&self) {
        self.users_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_teams_created(&self) {
        self.teams_created.fetch_add(1, Ordering::Relaxed);
    }

    // Match request lifecycle

    pub fn increment_requests_created(&self) {
        self.requests_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requests_accepted(&self) {
        self.requests_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requests_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requests_cancelled(&self) {
        self.requests_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_messages_posted(&self) {
        self.messages_posted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matchmaking_queries(&self) {
        self.matchmaking_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_reminders_sent(&self, count: u64) {
        self.reminders_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            users_registered: self.users_registered.load(Ordering::Relaxed),
            teams_created: self.teams_created.load(Ordering::Relaxed),
            requests_created: self.requests_created.load(Ordering::Relaxed),
            requests_accepted: self.requests_accepted.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            requests_cancelled: self.requests_cancelled.load(Ordering::Relaxed),
            messages_posted: self.messages_posted.load(Ordering::Relaxed),
            matchmaking_queries: self.matchmaking_queries.load(Ordering::Relaxed),
            reminders_sent: self.reminders_sent.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub users_registered: u64,
    pub teams_created: u64,
    pub requests_created: u64,
    pub requests_accepted: u64,
    pub requests_rejected: u64,
    pub requests_cancelled: u64,
    pub messages_posted: u64,
    pub matchmaking_queries: u64,
    pub reminders_sent: u64,
}
