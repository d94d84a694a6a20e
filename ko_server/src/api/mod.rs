//! HTTP/WebSocket API for the contest server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: Middleware for CORS and request IDs
//! - **Actor Model**: Contest mutations serialized by one actor per contest
//!
//! # Modules
//!
//! - [`contests`]: Contest, participant, problem, round and match endpoints
//! - [`websocket`]: Realtime match outcome delivery
//! - [`request_id`]: Request correlation middleware
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ko_server::api::{create_router, AppState};
//! use knockout::{ContestManager, EngineConfig, SessionHub};
//! use knockout::db::InMemoryContestRepository;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sessions = Arc::new(SessionHub::default());
//! let contest_manager = Arc::new(ContestManager::new(
//!     Arc::new(InMemoryContestRepository::new()),
//!     sessions.clone(),
//!     EngineConfig::default(),
//! ));
//!
//! let app = create_router(AppState {
//!     contest_manager,
//!     sessions,
//!     database: None,
//! });
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod contests;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
};
use knockout::{ContestManager, SessionHub, db::Database};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    /// Routes contest operations to contest actors
    pub contest_manager: Arc<ContestManager>,
    /// Live WebSocket sessions
    pub sessions: Arc<SessionHub>,
    /// Present when contests are stored in Postgres
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET    /health
/// POST   /api/v1/contests
/// GET    /api/v1/contests
/// GET    /api/v1/contests/{id}
/// PUT    /api/v1/contests/{id}
/// DELETE /api/v1/contests/{id}
/// POST   /api/v1/contests/{id}/participants
/// DELETE /api/v1/contests/{id}/participants/{user_id}
/// GET    /api/v1/contests/{id}/problems
/// POST   /api/v1/contests/{id}/problems
/// GET    /api/v1/contests/{id}/problems/random
/// DELETE /api/v1/contests/{id}/problems/{problem_id}
/// POST   /api/v1/contests/{id}/rounds
/// POST   /api/v1/contests/{id}/matches/{match_id}/winner
/// GET    /api/v1/contests/{id}/matches/active?user_id=
/// POST   /api/v1/contests/{id}/submissions
/// GET    /ws/{user_id}
/// ```
pub fn create_router(state: AppState) -> Router {
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/{user_id}", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/contests",
            post(contests::create_contest).get(contests::list_contests),
        )
        .route(
            "/contests/{contest_id}",
            get(contests::get_contest)
                .put(contests::update_contest)
                .delete(contests::delete_contest),
        )
        .route(
            "/contests/{contest_id}/participants",
            post(contests::register_participant),
        )
        .route(
            "/contests/{contest_id}/participants/{user_id}",
            delete(contests::unregister_participant),
        )
        .route(
            "/contests/{contest_id}/problems",
            get(contests::list_problems).post(contests::add_problem),
        )
        .route(
            "/contests/{contest_id}/problems/random",
            get(contests::random_problem),
        )
        .route(
            "/contests/{contest_id}/problems/{problem_id}",
            delete(contests::remove_problem),
        )
        .route("/contests/{contest_id}/rounds", post(contests::start_round))
        .route(
            "/contests/{contest_id}/matches/active",
            get(contests::active_match),
        )
        .route(
            "/contests/{contest_id}/matches/{match_id}/winner",
            post(contests::apply_winner),
        )
        .route(
            "/contests/{contest_id}/submissions",
            post(contests::submit_solution),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if the store is reachable, or `503 Service Unavailable`
/// otherwise. The in-memory store is always healthy.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":"memory","active_contests":0,"sessions":0,...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, storage_healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "storage_healthy": storage_healthy,
        "active_contests": state.contest_manager.active_contest_count().await,
        "sessions": state.sessions.session_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
