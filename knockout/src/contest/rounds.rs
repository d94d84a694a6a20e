//! Round state machine: gates generation of the next round and detects the end
//! of the tournament.
//!
//! ```text
//! NotStarted ──start──▶ RoundInProgress(1) ──last winner──▶ RoundComplete(1)
//!                                                               │ start
//!                        RoundInProgress(k) ◀───────────────────┘
//!                               …
//!                        RoundComplete(total) == Finished
//! ```

use super::{
    bracket::{BracketGenerator, total_rounds},
    errors::{ContestError, ContestResult},
    models::{Contest, ContestState, Round, RoundNumber, UserId},
};
use rand::Rng;

impl Contest {
    /// Current position in the round state machine
    pub fn state(&self) -> ContestState {
        let Some(current) = self.current() else {
            return ContestState::NotStarted;
        };

        if !current.is_complete() {
            return ContestState::RoundInProgress(current.number);
        }

        match self.total_rounds {
            Some(total) if current.number >= total => ContestState::Finished,
            _ => ContestState::RoundComplete(current.number),
        }
    }
}

/// Validate that the next round may be generated and collect its entrants
///
/// Round 1 draws from the registered set; every later round draws from the
/// winners of the previous one, byes included.
pub fn next_round_entrants(contest: &Contest) -> ContestResult<(RoundNumber, Vec<UserId>)> {
    let next = contest.current_round + 1;

    if contest.round(next).is_some_and(|r| !r.matches.is_empty()) {
        return Err(ContestError::InvalidState(format!(
            "matches already generated for round {next}"
        )));
    }

    if contest.current_round == 0 {
        if contest.registered.is_empty() {
            return Err(ContestError::InvalidState(
                "no registered participants".to_string(),
            ));
        }
        return Ok((next, contest.registered.iter().cloned().collect()));
    }

    let previous = contest.current().ok_or_else(|| {
        ContestError::InvalidState(format!(
            "matches for round {} are missing",
            contest.current_round
        ))
    })?;

    if !previous.is_complete() {
        return Err(ContestError::InvalidState(format!(
            "round {} is not completed yet ({} pending)",
            previous.number,
            previous.pending_count()
        )));
    }

    let total = contest.total_rounds.ok_or_else(|| {
        ContestError::InvalidState("round count was never fixed".to_string())
    })?;

    if next > total {
        return Err(ContestError::InvalidState(format!(
            "tournament is over after {total} round(s)"
        )));
    }

    Ok((next, previous.winners()))
}

/// Generate and record the next round on `contest`
///
/// Only the in-memory aggregate is touched; callers persist it and discard
/// the draft if the save fails.
pub fn start_next_round<'a, R: Rng>(
    contest: &'a mut Contest,
    generator: &mut BracketGenerator<R>,
) -> ContestResult<&'a Round> {
    let (next, entrants) = next_round_entrants(contest)?;

    let total = match contest.total_rounds {
        Some(total) => total,
        None => total_rounds(entrants.len()),
    };

    let mut matches = generator.generate(&contest.id, next, &entrants);
    generator.assign_problems(&mut matches, &contest.problems);

    contest.rounds.push(Round {
        number: next,
        matches,
    });
    contest.current_round = next;
    contest.total_rounds = Some(total);

    log::debug!(
        "Contest {}: generated round {}/{} for {} entrant(s)",
        contest.id,
        next,
        total,
        entrants.len()
    );

    contest
        .current()
        .ok_or_else(|| ContestError::InvalidState(format!("round {next} was not recorded")))
}
