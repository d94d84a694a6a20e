//! Match resolution rules.
//!
//! Only the current round is ever mutated; earlier rounds are history.

use super::{
    errors::{ContestError, ContestResult},
    models::{Contest, Match, MatchStatus, Opponent, RoundNumber},
};
use serde::{Deserialize, Serialize};

/// Verdict reported by the external judge for a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// Result of reacting to a judged submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Submitter won the match
    Accepted { resolved: Match },
    /// Verdict was negative, the match stays pending
    Rejected { match_id: String },
}

/// A user's view of their match in the current round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub round: RoundNumber,
    pub match_id: String,
    pub user_id: String,
    pub opponent: Opponent,
    pub problem_id: Option<String>,
    pub status: MatchStatus,
    pub winner: Option<String>,
}

fn active_round_number(contest: &Contest) -> ContestResult<RoundNumber> {
    if contest.current_round == 0 {
        return Err(ContestError::InvalidState(
            "contest round not started".to_string(),
        ));
    }
    Ok(contest.current_round)
}

/// Record `winner_id` as the winner of `match_id` in the current round
///
/// Checks run in a fixed order: active round, match located, winner is a
/// participant, match still pending. Nothing is modified unless all pass.
pub fn apply_winner(contest: &mut Contest, match_id: &str, winner_id: &str) -> ContestResult<Match> {
    let round_number = active_round_number(contest)?;

    let round = contest.round_mut(round_number).ok_or_else(|| {
        ContestError::NotFound(format!("matches for current round ({round_number})"))
    })?;

    let target = round.find_mut(match_id).ok_or_else(|| {
        ContestError::NotFound(format!("match {match_id} in current round"))
    })?;

    if !target.involves(winner_id) {
        return Err(ContestError::InvalidParticipant(format!(
            "{winner_id} is not part of match {match_id}"
        )));
    }

    if target.is_completed() {
        return Err(ContestError::AlreadyResolved(match_id.to_string()));
    }

    target.winner = Some(winner_id.to_string());
    target.status = MatchStatus::Completed;

    Ok(target.clone())
}

/// Find the match a submission from `user_id` on `problem_id` would decide
pub fn match_for_submission<'a>(
    contest: &'a Contest,
    user_id: &str,
    problem_id: &str,
) -> ContestResult<&'a Match> {
    let round_number = active_round_number(contest)?;

    let m = contest
        .current()
        .and_then(|round| round.match_for(user_id))
        .ok_or_else(|| {
            ContestError::NotFound(format!(
                "no match for {user_id} in round {round_number}"
            ))
        })?;

    if m.is_bye() {
        return Err(ContestError::InvalidState(
            "participant has a bye, wait for the next round".to_string(),
        ));
    }

    if m.is_completed() {
        return Err(ContestError::AlreadyResolved(m.match_id.clone()));
    }

    if m.problem_id.as_deref() != Some(problem_id) {
        return Err(ContestError::InvalidParticipant(format!(
            "problem {problem_id} is not the problem assigned to match {}",
            m.match_id
        )));
    }

    Ok(m)
}

/// Describe `user_id`'s match in the current round
pub fn match_info(contest: &Contest, user_id: &str) -> ContestResult<MatchInfo> {
    let round = active_round_number(contest)?;

    let m = contest
        .current()
        .and_then(|r| r.match_for(user_id))
        .ok_or_else(|| {
            ContestError::NotFound(format!("no match for {user_id} in the current round"))
        })?;

    let opponent = m
        .opponent_of(user_id)
        .ok_or_else(|| ContestError::NotFound(format!("no match for {user_id}")))?;

    Ok(MatchInfo {
        round,
        match_id: m.match_id.clone(),
        user_id: user_id.to_string(),
        opponent,
        problem_id: m.problem_id.clone(),
        status: m.status,
        winner: m.winner.clone(),
    })
}
