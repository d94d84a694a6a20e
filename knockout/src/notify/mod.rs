//! Match outcome notifications.
//!
//! The engine only knows the [`NotificationPublisher`] capability. Delivery is
//! best-effort: a recipient without a live session misses the event, and
//! nothing is queued or retried. Callers that need guaranteed delivery poll
//! the active match instead.

pub mod hub;

pub use hub::{SessionHub, SessionId, Subscription};

use crate::contest::models::{ContestId, Match, MatchId, MatchStatus, RoundNumber, UserId};
use serde::{Deserialize, Serialize};

/// Result of a match from the recipient's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
}

/// Event pushed to one participant of a resolved match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub contest_id: ContestId,
    pub match_id: MatchId,
    pub round: RoundNumber,
    pub status: MatchStatus,
    pub outcome: Outcome,
    pub recipient_id: UserId,
    pub opponent_id: UserId,
}

impl MatchEvent {
    /// One event per participant of a completed head-to-head match
    ///
    /// Byes and unresolved matches produce no events.
    pub fn for_resolved(contest_id: &str, round: RoundNumber, resolved: &Match) -> Vec<MatchEvent> {
        let (Some(winner), Some(user2)) = (resolved.winner.as_ref(), resolved.user2.as_player())
        else {
            return Vec::new();
        };

        [&resolved.user1, user2]
            .into_iter()
            .map(|recipient| {
                let opponent = if recipient == &resolved.user1 {
                    user2
                } else {
                    &resolved.user1
                };
                MatchEvent {
                    contest_id: contest_id.to_string(),
                    match_id: resolved.match_id.clone(),
                    round,
                    status: resolved.status,
                    outcome: if recipient == winner {
                        Outcome::Won
                    } else {
                        Outcome::Lost
                    },
                    recipient_id: recipient.clone(),
                    opponent_id: opponent.clone(),
                }
            })
            .collect()
    }
}

/// Fire-and-forget delivery of match events
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, event: MatchEvent);
}
