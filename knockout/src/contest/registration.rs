//! Participant registration, problem pool and detail edits.

use super::{
    errors::{ContestError, ContestResult},
    models::{Contest, ContestDetails},
};

const MAX_TITLE_LEN: usize = 200;

impl ContestDetails {
    pub fn validate(&self) -> ContestResult<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ContestError::Validation(
                "contest title must not be empty".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ContestError::Validation(format!(
                "contest title must be at most {MAX_TITLE_LEN} characters"
            )));
        }
        if self.duration_mins == Some(0) {
            return Err(ContestError::Validation(
                "contest duration must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Contest {
    /// Add `user_id` to the registered set
    ///
    /// The set is frozen once the first round exists.
    pub fn register(&mut self, user_id: &str) -> ContestResult<()> {
        if user_id.trim().is_empty() {
            return Err(ContestError::Validation("user id must not be empty".to_string()));
        }
        self.ensure_open("registration")?;
        if !self.registered.insert(user_id.to_string()) {
            return Err(ContestError::Duplicate(format!(
                "{user_id} is already registered"
            )));
        }
        Ok(())
    }

    pub fn unregister(&mut self, user_id: &str) -> ContestResult<()> {
        self.ensure_open("unregistration")?;
        if !self.registered.remove(user_id) {
            return Err(ContestError::NotFound(format!(
                "{user_id} is not registered"
            )));
        }
        Ok(())
    }

    /// Add a problem to the pool; allowed between rounds
    pub fn add_problem(&mut self, problem_id: &str) -> ContestResult<()> {
        if problem_id.trim().is_empty() {
            return Err(ContestError::Validation(
                "problem id must not be empty".to_string(),
            ));
        }
        if self.problems.iter().any(|p| p == problem_id) {
            return Err(ContestError::Duplicate(format!(
                "problem {problem_id} is already in the pool"
            )));
        }
        self.problems.push(problem_id.to_string());
        Ok(())
    }

    /// Remove a problem from the pool
    ///
    /// Matches that already carry the problem keep it.
    pub fn remove_problem(&mut self, problem_id: &str) -> ContestResult<()> {
        let index = self
            .problems
            .iter()
            .position(|p| p == problem_id)
            .ok_or_else(|| ContestError::NotFound(format!("problem {problem_id}")))?;
        self.problems.remove(index);
        Ok(())
    }

    pub fn update_details(&mut self, details: ContestDetails) -> ContestResult<()> {
        details.validate()?;
        self.details = details;
        Ok(())
    }

    fn ensure_open(&self, action: &str) -> ContestResult<()> {
        if self.has_started() {
            return Err(ContestError::InvalidState(format!(
                "{action} is closed once the contest has started"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::models::Round;

    fn open_contest() -> Contest {
        Contest::new("cup".to_string(), ContestDetails::new("Cup"))
    }

    fn started_contest() -> Contest {
        let mut contest = open_contest();
        contest.register("ada").unwrap();
        contest.rounds.push(Round {
            number: 1,
            matches: Vec::new(),
        });
        contest.current_round = 1;
        contest
    }

    #[test]
    fn test_register_and_duplicate() {
        let mut contest = open_contest();
        contest.register("ada").unwrap();
        assert!(contest.registered.contains("ada"));

        let err = contest.register("ada").unwrap_err();
        assert!(matches!(err, ContestError::Duplicate(_)));
    }

    #[test]
    fn test_register_after_start_rejected() {
        let mut contest = started_contest();
        let err = contest.register("grace").unwrap_err();
        assert!(matches!(err, ContestError::InvalidState(_)));
        assert!(!contest.registered.contains("grace"));
    }

    #[test]
    fn test_unregister() {
        let mut contest = open_contest();
        contest.register("ada").unwrap();
        contest.unregister("ada").unwrap();
        assert!(contest.registered.is_empty());

        let err = contest.unregister("ada").unwrap_err();
        assert!(matches!(err, ContestError::NotFound(_)));
    }

    #[test]
    fn test_unregister_after_start_rejected() {
        let mut contest = started_contest();
        let err = contest.unregister("ada").unwrap_err();
        assert!(matches!(err, ContestError::InvalidState(_)));
    }

    #[test]
    fn test_problem_pool() {
        let mut contest = started_contest();
        contest.add_problem("p1").unwrap();
        contest.add_problem("p2").unwrap();
        assert!(matches!(
            contest.add_problem("p1"),
            Err(ContestError::Duplicate(_))
        ));

        contest.remove_problem("p1").unwrap();
        assert_eq!(contest.problems, vec!["p2".to_string()]);
        assert!(matches!(
            contest.remove_problem("p1"),
            Err(ContestError::NotFound(_))
        ));
    }

    #[test]
    fn test_details_validation() {
        assert!(ContestDetails::new("Cup").validate().is_ok());
        assert!(ContestDetails::new("   ").validate().is_err());
        assert!(ContestDetails::new("x".repeat(201)).validate().is_err());

        let mut details = ContestDetails::new("Cup");
        details.duration_mins = Some(0);
        assert!(details.validate().is_err());
    }

    #[test]
    fn test_update_details_keeps_old_on_error() {
        let mut contest = open_contest();
        let err = contest.update_details(ContestDetails::new("")).unwrap_err();
        assert!(matches!(err, ContestError::Validation(_)));
        assert_eq!(contest.details.title, "Cup");

        contest
            .update_details(ContestDetails::new("Final").with_level("hard"))
            .unwrap();
        assert_eq!(contest.details.title, "Final");
    }
}
