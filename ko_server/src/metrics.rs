//! Prometheus metrics for monitoring contest server health.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener when
//! `METRICS_BIND` is set. Without an installed exporter every call below is a
//! no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts by method and status
//! - **Contest Metrics**: Rounds started, matches resolved, rejected submissions, conflicts
//! - **Realtime Metrics**: Active sessions, connections, dropped notifications
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ko_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", 201);
//! metrics::rounds_started_total();
//! ```

use knockout::{MatchEvent, NotificationPublisher, SessionHub};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Contest Metrics
// ============================================================================

/// Increment rounds started counter.
pub fn rounds_started_total() {
    metrics::counter!("contest_rounds_started_total").increment(1);
}

/// Increment matches resolved counter, labelled by how the winner was decided.
pub fn matches_resolved_total(source: &'static str) {
    metrics::counter!("contest_matches_resolved_total", "source" => source).increment(1);
}

/// Increment rejected submissions counter.
pub fn submissions_rejected_total() {
    metrics::counter!("contest_submissions_rejected_total").increment(1);
}

/// Increment persistence conflicts counter.
pub fn persistence_conflicts_total() {
    metrics::counter!("contest_persistence_conflicts_total").increment(1);
}

// ============================================================================
// Realtime Metrics
// ============================================================================

/// Set current active WebSocket sessions count.
pub fn websocket_sessions_active(count: usize) {
    metrics::gauge!("websocket_sessions_active").set(count as f64);
}

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment notifications that reached no session.
pub fn notifications_dropped_total() {
    metrics::counter!("notifications_dropped_total").increment(1);
}

/// Session hub publisher that counts undelivered events
pub struct MeteredPublisher {
    hub: Arc<SessionHub>,
}

impl MeteredPublisher {
    pub fn new(hub: Arc<SessionHub>) -> Self {
        Self { hub }
    }
}

impl NotificationPublisher for MeteredPublisher {
    fn publish(&self, event: MatchEvent) {
        if self.hub.deliver(&event) == 0 {
            notifications_dropped_total();
        }
    }
}
