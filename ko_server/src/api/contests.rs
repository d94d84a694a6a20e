//! Contest management API handlers.
//!
//! This module provides HTTP REST endpoints for contest operations including:
//! - Creating, listing, editing and deleting contests
//! - Registering participants and managing the problem pool
//! - Starting rounds and recording match winners
//! - Reacting to judged submissions
//!
//! Identity is established upstream; handlers trust the user IDs they receive.
//!
//! # Examples
//!
//! Start the next round:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/contests/CONTEST_ID/rounds
//! ```
//!
//! Record a winner:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/contests/CONTEST_ID/matches/CONTEST_ID-1-1/winner \
//!   -H "Content-Type: application/json" \
//!   -d '{"user_id": "ada"}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use knockout::{
    Contest, ContestDetails, ContestError, ContestResult, ContestState, ErrorKind, Match,
    MatchInfo, RoundStarted, SubmissionOutcome, Verdict,
    contest::{ProblemId, RoundNumber, UserId},
};
use serde::{Deserialize, Serialize};

use super::{AppState, request_id::RequestId};
use crate::{logging::log_contest_event, metrics};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Contest error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub ContestError);

impl From<ContestError> for ApiError {
    fn from(err: ContestError) -> Self {
        Self(err)
    }
}

/// HTTP status for a contest error
pub fn status_for(err: &ContestError) -> StatusCode {
    match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidState | ErrorKind::InvalidParticipant | ErrorKind::Validation => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::AlreadyResolved | ErrorKind::Duplicate | ErrorKind::Conflict => {
            StatusCode::CONFLICT
        }
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);

        if self.0.kind() == ErrorKind::Conflict {
            metrics::persistence_conflicts_total();
        }
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Contest operation failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.client_message(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Map a mutation result, logging lost optimistic-concurrency races
fn observe<T>(result: ContestResult<T>, contest_id: &str, request_id: &RequestId) -> ApiResult<T> {
    result.map_err(|e| {
        if matches!(e, ContestError::Conflict(_)) {
            log_contest_event("conflict", contest_id, request_id.as_str(), &e.to_string());
        }
        ApiError(e)
    })
}

/// Full contest with its derived standing
#[derive(Debug, Serialize)]
pub struct ContestView {
    #[serde(flatten)]
    pub contest: Contest,
    pub status: ContestState,
    pub champion: Option<UserId>,
}

impl From<Contest> for ContestView {
    fn from(contest: Contest) -> Self {
        Self {
            status: contest.state(),
            champion: contest.champion().cloned(),
            contest,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContestSummary {
    pub id: String,
    pub title: String,
    pub level: String,
    pub status: ContestState,
    pub participants: usize,
    pub current_round: RoundNumber,
    pub total_rounds: Option<RoundNumber>,
    pub created_at: DateTime<Utc>,
}

impl From<&Contest> for ContestSummary {
    fn from(contest: &Contest) -> Self {
        Self {
            id: contest.id.clone(),
            title: contest.details.title.clone(),
            level: contest.details.level.clone(),
            status: contest.state(),
            participants: contest.registered.len(),
            current_round: contest.current_round,
            total_rounds: contest.total_rounds,
            created_at: contest.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParticipantRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct ProblemRequest {
    pub problem_id: ProblemId,
}

#[derive(Debug, Serialize)]
pub struct ProblemResponse {
    pub problem_id: ProblemId,
}

#[derive(Debug, Serialize)]
pub struct ProblemListResponse {
    pub problems: Vec<ProblemId>,
}

#[derive(Debug, Deserialize)]
pub struct WinnerRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct ActiveMatchQuery {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    pub user_id: UserId,
    pub problem_id: ProblemId,
    pub verdict: Verdict,
}

/// Create a contest.
///
/// # Request
///
/// ```json
/// { "title": "Weekly #12", "description": "", "level": "easy" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Empty or overlong title
pub async fn create_contest(
    State(state): State<AppState>,
    Json(details): Json<ContestDetails>,
) -> ApiResult<(StatusCode, Json<ContestView>)> {
    let contest = state.contest_manager.create_contest(details).await?;
    Ok((StatusCode::CREATED, Json(contest.into())))
}

/// List all contests, newest first.
pub async fn list_contests(State(state): State<AppState>) -> ApiResult<Json<Vec<ContestSummary>>> {
    let contests = state.contest_manager.list_contests().await?;
    Ok(Json(contests.iter().map(ContestSummary::from).collect()))
}

/// Get a contest with all rounds.
///
/// # Errors
///
/// - `404 Not Found`: Contest doesn't exist
pub async fn get_contest(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> ApiResult<Json<ContestView>> {
    let contest = state.contest_manager.get_contest(&contest_id).await?;
    Ok(Json(contest.into()))
}

/// Replace a contest's descriptive details.
pub async fn update_contest(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Json(details): Json<ContestDetails>,
) -> ApiResult<Json<ContestView>> {
    let contest = state
        .contest_manager
        .edit_contest(&contest_id, details)
        .await?;
    Ok(Json(contest.into()))
}

pub async fn delete_contest(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.contest_manager.delete_contest(&contest_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Register a participant.
///
/// # Errors
///
/// - `400 Bad Request`: Contest already started
/// - `409 Conflict`: Already registered
pub async fn register_participant(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Json(request): Json<ParticipantRequest>,
) -> ApiResult<(StatusCode, Json<ContestView>)> {
    let contest = state
        .contest_manager
        .register_participant(&contest_id, &request.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(contest.into())))
}

pub async fn unregister_participant(
    State(state): State<AppState>,
    Path((contest_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<ContestView>> {
    let contest = state
        .contest_manager
        .unregister_participant(&contest_id, &user_id)
        .await?;
    Ok(Json(contest.into()))
}

pub async fn list_problems(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> ApiResult<Json<ProblemListResponse>> {
    let problems = state.contest_manager.list_problems(&contest_id).await?;
    Ok(Json(ProblemListResponse { problems }))
}

pub async fn add_problem(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Json(request): Json<ProblemRequest>,
) -> ApiResult<(StatusCode, Json<ProblemListResponse>)> {
    let contest = state
        .contest_manager
        .add_problem(&contest_id, &request.problem_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ProblemListResponse {
            problems: contest.problems,
        }),
    ))
}

pub async fn remove_problem(
    State(state): State<AppState>,
    Path((contest_id, problem_id)): Path<(String, String)>,
) -> ApiResult<Json<ProblemListResponse>> {
    let contest = state
        .contest_manager
        .remove_problem(&contest_id, &problem_id)
        .await?;
    Ok(Json(ProblemListResponse {
        problems: contest.problems,
    }))
}

/// Draw a random problem from the pool.
///
/// # Errors
///
/// - `404 Not Found`: Contest missing or pool empty
pub async fn random_problem(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> ApiResult<Json<ProblemResponse>> {
    let problem_id = state.contest_manager.random_problem(&contest_id).await?;
    Ok(Json(ProblemResponse { problem_id }))
}

/// Generate the next round.
///
/// # Response
///
/// Returns `201 Created` with the round number, the fixed total and the new
/// matches. Byes are returned already completed.
///
/// # Errors
///
/// - `400 Bad Request`: Previous round unfinished, no participants, or contest over
/// - `409 Conflict`: Concurrent modification, retry
pub async fn start_round(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(contest_id): Path<String>,
) -> ApiResult<(StatusCode, Json<RoundStarted>)> {
    let started = observe(
        state.contest_manager.start_round(&contest_id).await,
        &contest_id,
        &request_id,
    )?;

    metrics::rounds_started_total();
    log_contest_event(
        "round_started",
        &contest_id,
        request_id.as_str(),
        &format!(
            "round {}/{} with {} match(es)",
            started.round,
            started.total_rounds,
            started.matches.len()
        ),
    );

    Ok((StatusCode::CREATED, Json(started)))
}

/// Record the winner of a match in the current round.
///
/// # Errors
///
/// - `404 Not Found`: Contest missing or match not in the current round
/// - `400 Bad Request`: No round started, or winner not part of the match
/// - `409 Conflict`: Match already resolved, or concurrent modification
pub async fn apply_winner(
    State(state): State<AppState>,
    request_id: RequestId,
    Path((contest_id, match_id)): Path<(String, String)>,
    Json(request): Json<WinnerRequest>,
) -> ApiResult<Json<Match>> {
    let resolved = observe(
        state
            .contest_manager
            .apply_winner(&contest_id, &match_id, &request.user_id)
            .await,
        &contest_id,
        &request_id,
    )?;

    metrics::matches_resolved_total("organizer");
    log_contest_event(
        "match_resolved",
        &contest_id,
        request_id.as_str(),
        &format!("{} won {}", request.user_id, match_id),
    );

    Ok(Json(resolved))
}

/// The caller's match in the current round.
pub async fn active_match(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Query(query): Query<ActiveMatchQuery>,
) -> ApiResult<Json<MatchInfo>> {
    let info = state
        .contest_manager
        .get_active_match_for_user(&contest_id, &query.user_id)
        .await?;
    Ok(Json(info))
}

/// Apply a judge verdict to the submitter's match.
///
/// # Request
///
/// ```json
/// { "user_id": "ada", "problem_id": "two-sum", "verdict": "accepted" }
/// ```
pub async fn submit_solution(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(contest_id): Path<String>,
    Json(request): Json<SubmissionRequest>,
) -> ApiResult<Json<SubmissionOutcome>> {
    let outcome = observe(
        state
            .contest_manager
            .submit_solution(
                &contest_id,
                &request.user_id,
                &request.problem_id,
                request.verdict,
            )
            .await,
        &contest_id,
        &request_id,
    )?;

    match &outcome {
        SubmissionOutcome::Accepted { resolved } => {
            metrics::matches_resolved_total("judge");
            log_contest_event(
                "match_resolved",
                &contest_id,
                request_id.as_str(),
                &format!("{} solved {} in {}", request.user_id, request.problem_id, resolved.match_id),
            );
        }
        SubmissionOutcome::Rejected { .. } => metrics::submissions_rejected_total(),
    }

    Ok(Json(outcome))
}
