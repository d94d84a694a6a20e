//! # Knockout
//!
//! A single-elimination contest engine: randomized brackets with byes, gated
//! round advancement, idempotent match resolution and best-effort outcome
//! notifications.
//!
//! ## Architecture
//!
//! A contest moves through a small state machine:
//!
//! - **NotStarted**: participants register, problems are added to the pool
//! - **RoundInProgress(k)**: round `k` has at least one pending match
//! - **RoundComplete(k)**: every match of round `k` has a winner
//! - **Finished**: the last round's single match is decided
//!
//! The number of rounds is `ceil(log2 n)` for the `n` participants registered
//! when round 1 starts, and never changes afterwards.
//!
//! ## Core Modules
//!
//! - [`contest`]: the aggregate, bracket generation, round gating, resolution
//! - [`engine`]: per-contest actors that serialize mutations
//! - [`db`]: repository trait with Postgres and in-memory implementations
//! - [`notify`]: match events and the live-session hub
//!
//! ## Example
//!
//! ```
//! use knockout::{ContestDetails, ContestManager, EngineConfig};
//! use knockout::db::InMemoryContestRepository;
//! use knockout::notify::SessionHub;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), knockout::ContestError> {
//! let manager = ContestManager::new(
//!     Arc::new(InMemoryContestRepository::new()),
//!     Arc::new(SessionHub::default()),
//!     EngineConfig::seeded(42),
//! );
//!
//! let contest = manager.create_contest(ContestDetails::new("Weekly")).await?;
//! manager.register_participant(&contest.id, "ada").await?;
//! manager.register_participant(&contest.id, "grace").await?;
//!
//! let started = manager.start_round(&contest.id).await?;
//! assert_eq!(started.total_rounds, 1);
//!
//! let final_match = &started.matches[0];
//! manager
//!     .apply_winner(&contest.id, &final_match.match_id, &final_match.user1)
//!     .await?;
//!
//! let finished = manager.get_contest(&contest.id).await?;
//! assert_eq!(finished.champion(), Some(&final_match.user1));
//! # Ok(())
//! # }
//! ```

/// Contest aggregate and the synchronous rules that act on it.
pub mod contest;
pub use contest::{
    BracketGenerator, Contest, ContestDetails, ContestError, ContestResult, ContestState,
    ErrorKind, Match, MatchInfo, MatchStatus, Opponent, Round, SubmissionOutcome, Verdict,
};

/// Persistence.
pub mod db;

/// Serialized per-contest execution.
pub mod engine;
pub use engine::{ContestManager, EngineConfig, RoundStarted};

/// Outcome notifications.
pub mod notify;
pub use notify::{MatchEvent, NotificationPublisher, SessionHub};
