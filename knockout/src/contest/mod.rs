//! Contest domain: the aggregate, bracket generation, round gating and match
//! resolution.
//!
//! Everything in this module is synchronous and operates on an in-memory
//! [`Contest`]. Loading, saving and serializing concurrent callers is the job
//! of [`crate::engine`].
//!
//! ## Example
//!
//! ```
//! use knockout::contest::{BracketGenerator, Contest, ContestDetails, rounds, resolver};
//!
//! let mut contest = Contest::new("spring".to_string(), ContestDetails::new("Spring Cup"));
//! for user in ["ada", "grace", "linus"] {
//!     contest.registered.insert(user.to_string());
//! }
//!
//! let mut generator = BracketGenerator::seeded(7);
//! let round = rounds::start_next_round(&mut contest, &mut generator).unwrap();
//! assert_eq!(round.matches.len(), 2); // one pairing, one bye
//!
//! let pending = contest.current().unwrap().matches[0].clone();
//! resolver::apply_winner(&mut contest, &pending.match_id, &pending.user1).unwrap();
//! ```

pub mod bracket;
pub mod errors;
pub mod models;
pub mod registration;
pub mod resolver;
pub mod rounds;

pub use bracket::{BracketGenerator, total_rounds};
pub use errors::{ContestError, ContestResult, ErrorKind};
pub use models::{
    Contest, ContestDetails, ContestId, ContestState, Match, MatchId, MatchStatus, Opponent,
    ProblemId, Round, RoundNumber, UserId,
};
pub use resolver::{MatchInfo, SubmissionOutcome, Verdict};
