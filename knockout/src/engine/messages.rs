//! Contest actor message types.

use crate::contest::{
    Contest, ContestDetails, ContestResult, Match, ProblemId, RoundNumber, SubmissionOutcome,
    UserId, Verdict,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Reply channel for a contest command
pub type Reply<T> = oneshot::Sender<ContestResult<T>>;

/// Messages that can be sent to a ContestActor
///
/// Every variant except `Close` mutates the contest and is applied strictly
/// in arrival order.
#[derive(Debug)]
pub enum ContestMessage {
    /// Generate and persist the next round
    StartRound { response: Reply<RoundStarted> },

    /// Record a match winner
    ApplyWinner {
        match_id: String,
        winner_id: UserId,
        response: Reply<Match>,
    },

    /// React to a judged submission
    SubmitSolution {
        user_id: UserId,
        problem_id: ProblemId,
        verdict: Verdict,
        response: Reply<SubmissionOutcome>,
    },

    /// Register a participant before the contest starts
    Register {
        user_id: UserId,
        response: Reply<Contest>,
    },

    /// Withdraw a participant before the contest starts
    Unregister {
        user_id: UserId,
        response: Reply<Contest>,
    },

    /// Add a problem to the pool
    AddProblem {
        problem_id: ProblemId,
        response: Reply<Contest>,
    },

    /// Remove a problem from the pool
    RemoveProblem {
        problem_id: ProblemId,
        response: Reply<Contest>,
    },

    /// Replace descriptive details
    UpdateDetails {
        details: ContestDetails,
        response: Reply<Contest>,
    },

    /// Stop the actor
    Close { response: oneshot::Sender<()> },
}

/// Reply to a successful `StartRound`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStarted {
    pub round: RoundNumber,
    pub total_rounds: RoundNumber,
    pub matches: Vec<Match>,
}
