//! Contest error types.

use super::models::{ContestId, MatchId};
use thiserror::Error;

/// Contest errors
#[derive(Debug, Error)]
pub enum ContestError {
    /// Contest not found
    #[error("Contest not found: {0}")]
    ContestNotFound(ContestId),

    /// Match, participant, problem or active match not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Round gating violated, no active round, or contest already decided
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Winner not in the match, or submission for the wrong problem
    #[error("Invalid participant: {0}")]
    InvalidParticipant(String),

    /// Match already has a winner
    #[error("Match already resolved: {0}")]
    AlreadyResolved(MatchId),

    /// Participant or problem already present
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    /// Rejected input (empty title, blank identifiers)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Stored version moved on since the aggregate was loaded
    #[error("Concurrent modification of contest {0}")]
    Conflict(ContestId),

    /// Contest actor stopped or dropped the request
    #[error("Contest {0} is unavailable")]
    Unavailable(ContestId),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification used by transports to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidParticipant,
    AlreadyResolved,
    Duplicate,
    Validation,
    Conflict,
    Unavailable,
    Internal,
}

impl ContestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContestError::ContestNotFound(_) | ContestError::NotFound(_) => ErrorKind::NotFound,
            ContestError::InvalidState(_) => ErrorKind::InvalidState,
            ContestError::InvalidParticipant(_) => ErrorKind::InvalidParticipant,
            ContestError::AlreadyResolved(_) => ErrorKind::AlreadyResolved,
            ContestError::Duplicate(_) => ErrorKind::Duplicate,
            ContestError::Validation(_) => ErrorKind::Validation,
            ContestError::Conflict(_) => ErrorKind::Conflict,
            ContestError::Unavailable(_) => ErrorKind::Unavailable,
            ContestError::Database(_) | ContestError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Get a client-safe error message
    ///
    /// Storage errors are collapsed so SQL and JSON details never reach clients.
    pub fn client_message(&self) -> String {
        match self {
            ContestError::Database(_) | ContestError::Serialization(_) => {
                "Internal server error".to_string()
            }
            ContestError::Conflict(_) => {
                "Contest was modified concurrently, retry the request".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for contest operations
pub type ContestResult<T> = Result<T, ContestError>;
