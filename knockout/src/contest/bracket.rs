//! Bracket generation: pairs the entrants of a round and hands out byes.

use super::models::{Match, ProblemId, RoundNumber, UserId, match_id};
use rand::{
    Rng, SeedableRng,
    rngs::StdRng,
    seq::{IndexedRandom, SliceRandom},
};

/// Smallest power of two that can hold `entrants` players
pub fn bracket_size(entrants: usize) -> usize {
    entrants.max(1).next_power_of_two()
}

/// Number of byes needed to fill a bracket for `entrants` players
pub fn bye_count(entrants: usize) -> usize {
    if entrants < 2 {
        return entrants;
    }
    bracket_size(entrants) - entrants
}

/// Rounds needed to crown a champion from `entrants` players: `ceil(log2(n))`,
/// with a floor of one round so a lone entrant still plays (a bye) once.
pub fn total_rounds(entrants: usize) -> RoundNumber {
    bracket_size(entrants).trailing_zeros().max(1)
}

/// Randomized pairing with an injectable random source
pub struct BracketGenerator<R = StdRng> {
    rng: R,
}

impl BracketGenerator<StdRng> {
    /// Generator seeded from the operating system
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> BracketGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Build the ordered match list for one round
    ///
    /// Entrants are shuffled, the first `n - byes` are paired off into pending
    /// matches and every remaining entrant receives a completed bye. The winner
    /// count of the round is therefore always a power of two.
    pub fn generate(
        &mut self,
        contest_id: &str,
        round: RoundNumber,
        entrants: &[UserId],
    ) -> Vec<Match> {
        match entrants {
            [] => Vec::new(),
            [only] => vec![Match::bye(match_id(contest_id, round, 1), only.clone())],
            _ => {
                let mut pool = entrants.to_vec();
                pool.shuffle(&mut self.rng);

                let byes = bye_count(pool.len());
                let paired = pool.len() - byes;
                let mut matches = Vec::with_capacity(paired / 2 + byes);

                for pair in pool[..paired].chunks_exact(2) {
                    let id = match_id(contest_id, round, matches.len() + 1);
                    matches.push(Match::pending(id, pair[0].clone(), pair[1].clone()));
                }

                for user in &pool[paired..] {
                    let id = match_id(contest_id, round, matches.len() + 1);
                    matches.push(Match::bye(id, user.clone()));
                }

                matches
            }
        }
    }

    /// Draw a problem for every non-bye match, independently per match
    pub fn assign_problems(&mut self, matches: &mut [Match], problems: &[ProblemId]) {
        if problems.is_empty() {
            return;
        }
        for m in matches.iter_mut().filter(|m| !m.is_bye()) {
            m.problem_id = problems.choose(&mut self.rng).cloned();
        }
    }

    /// Pick one problem from the pool
    pub fn pick_problem<'a>(&mut self, problems: &'a [ProblemId]) -> Option<&'a ProblemId> {
        problems.choose(&mut self.rng)
    }
}
