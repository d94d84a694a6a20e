//! Contest aggregate and match data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Contest ID type
pub type ContestId = String;

/// Participant identifier (issued by the external identity provider)
pub type UserId = String;

/// Problem identifier (owned by the external problem catalogue)
pub type ProblemId = String;

/// Match ID type, `{contest_id}-{round}-{sequence}`
pub type MatchId = String;

/// Round number, 1-indexed
pub type RoundNumber = u32;

/// Build the deterministic ID of the `sequence`-th match (1-indexed) of a round.
pub fn match_id(contest_id: &str, round: RoundNumber, sequence: usize) -> MatchId {
    format!("{contest_id}-{round}-{sequence}")
}

/// Second slot of a match: either a real opponent or a bye.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opponent {
    Player(UserId),
    Bye,
}

impl Opponent {
    pub fn as_player(&self) -> Option<&UserId> {
        match self {
            Opponent::Player(id) => Some(id),
            Opponent::Bye => None,
        }
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Opponent::Bye)
    }
}

impl fmt::Display for Opponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opponent::Player(id) => write!(f, "{id}"),
            Opponent::Bye => write!(f, "Bye"),
        }
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting for a winner
    Pending,
    /// Winner recorded (terminal)
    Completed,
}

/// A single pairing inside a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: MatchId,
    pub user1: UserId,
    pub user2: Opponent,
    /// Problem both participants race on (never set for byes)
    pub problem_id: Option<ProblemId>,
    pub status: MatchStatus,
    pub winner: Option<UserId>,
}

impl Match {
    /// Create a pending head-to-head match
    pub fn pending(match_id: MatchId, user1: UserId, user2: UserId) -> Self {
        Self {
            match_id,
            user1,
            user2: Opponent::Player(user2),
            problem_id: None,
            status: MatchStatus::Pending,
            winner: None,
        }
    }

    /// Create a bye, born completed and won by its only participant
    pub fn bye(match_id: MatchId, user1: UserId) -> Self {
        Self {
            match_id,
            winner: Some(user1.clone()),
            user1,
            user2: Opponent::Bye,
            problem_id: None,
            status: MatchStatus::Completed,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.user2.is_bye()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Whether `user_id` occupies one of the two slots
    pub fn involves(&self, user_id: &str) -> bool {
        self.user1 == user_id || self.user2.as_player().is_some_and(|u| u == user_id)
    }

    /// The other side of the match from `user_id`'s perspective
    pub fn opponent_of(&self, user_id: &str) -> Option<Opponent> {
        if self.user1 == user_id {
            Some(self.user2.clone())
        } else if self.user2.as_player().is_some_and(|u| u == user_id) {
            Some(Opponent::Player(self.user1.clone()))
        } else {
            None
        }
    }

    /// Real participants of the match (one for a bye, two otherwise)
    pub fn participants(&self) -> impl Iterator<Item = &UserId> {
        std::iter::once(&self.user1).chain(self.user2.as_player())
    }
}

/// All matches generated for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub number: RoundNumber,
    pub matches: Vec<Match>,
}

impl Round {
    /// True once every match has a winner
    pub fn is_complete(&self) -> bool {
        self.matches.iter().all(Match::is_completed)
    }

    pub fn pending_count(&self) -> usize {
        self.matches.iter().filter(|m| !m.is_completed()).count()
    }

    /// Winners in match order (byes included)
    pub fn winners(&self) -> Vec<UserId> {
        self.matches.iter().filter_map(|m| m.winner.clone()).collect()
    }

    pub fn find(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.match_id == match_id)
    }

    pub fn find_mut(&mut self, match_id: &str) -> Option<&mut Match> {
        self.matches.iter_mut().find(|m| m.match_id == match_id)
    }

    /// The match `user_id` plays in this round
    pub fn match_for(&self, user_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.involves(user_id))
    }
}

/// Descriptive contest metadata, editable by organizers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestDetails {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_mins: Option<u32>,
}

impl ContestDetails {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            level: String::new(),
            scheduled_start: None,
            duration_mins: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Position of a contest in the round state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "round", rename_all = "snake_case")]
pub enum ContestState {
    NotStarted,
    RoundInProgress(RoundNumber),
    RoundComplete(RoundNumber),
    Finished,
}

/// Contest aggregate, loaded and saved as a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contest {
    pub id: ContestId,
    pub details: ContestDetails,
    /// Registered participants, frozen once round 1 is generated
    pub registered: BTreeSet<UserId>,
    /// Problem pool drawn from when generating rounds
    pub problems: Vec<ProblemId>,
    /// `rounds[k - 1]` holds round `k`
    pub rounds: Vec<Round>,
    /// 0 until the first round starts
    pub current_round: RoundNumber,
    /// Fixed from the registered count when round 1 starts
    pub total_rounds: Option<RoundNumber>,
    /// Optimistic concurrency token, bumped by every successful save
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contest {
    pub fn new(id: ContestId, details: ContestDetails) -> Self {
        let now = Utc::now();
        Self {
            id,
            details,
            registered: BTreeSet::new(),
            problems: Vec::new(),
            rounds: Vec::new(),
            current_round: 0,
            total_rounds: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_started(&self) -> bool {
        self.current_round > 0
    }

    /// Look up round `number` (1-indexed)
    pub fn round(&self, number: RoundNumber) -> Option<&Round> {
        let index = number.checked_sub(1)? as usize;
        self.rounds.get(index)
    }

    pub fn round_mut(&mut self, number: RoundNumber) -> Option<&mut Round> {
        let index = number.checked_sub(1)? as usize;
        self.rounds.get_mut(index)
    }

    /// The round currently being played, if any
    pub fn current(&self) -> Option<&Round> {
        self.round(self.current_round)
    }

    pub fn is_finished(&self) -> bool {
        self.state() == ContestState::Finished
    }

    /// The tournament winner once the final is decided
    pub fn champion(&self) -> Option<&UserId> {
        if !self.is_finished() {
            return None;
        }
        self.current()?.matches.first()?.winner.as_ref()
    }
}
