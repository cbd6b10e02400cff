//! Observability for the roaster service
//!
//! - Structured logging through `tracing`
//! - Atomic counters served at `/observability/metrics`

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat, DEFAULT_FILTER};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
