//! Structured logging configuration.
//!
//! The `knockout` library logs through the `log` facade; those records are
//! picked up by the `tracing` subscriber installed here, so library and
//! server output share one format and one filter.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use ko_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a contest lifecycle event with structured data
///
/// # Example
///
/// ```
/// use ko_server::logging::log_contest_event;
///
/// log_contest_event("round_started", "spring-cup", "req-1", "round 2 with 4 match(es)");
/// ```
pub fn log_contest_event(event_type: &str, contest_id: &str, request_id: &str, message: &str) {
    if event_type == "conflict" {
        tracing::warn!(
            event_type = event_type,
            contest_id = contest_id,
            request_id = request_id,
            "CONTEST: {}",
            message
        );
    } else {
        tracing::info!(
            event_type = event_type,
            contest_id = contest_id,
            request_id = request_id,
            "CONTEST: {}",
            message
        );
    }
}

/// Log API request/response
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Request path
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
/// * `request_id` - Correlation ID of the request
pub fn log_api_request(
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
    request_id: &str,
) {
    if duration_ms > 1000 {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            request_id = request_id,
            "Slow API request"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            request_id = request_id,
            "API request completed"
        );
    }
}
