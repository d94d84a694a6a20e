//! Contest manager for spawning and routing to contest actors.

use super::{
    actor::{ContestActor, ContestHandle},
    config::EngineConfig,
    messages::{ContestMessage, Reply, RoundStarted},
};
use crate::{
    contest::{
        BracketGenerator, Contest, ContestDetails, ContestError, ContestId, ContestResult,
        Match, MatchInfo, ProblemId, SubmissionOutcome, Verdict, resolver,
    },
    db::ContestRepository,
    notify::NotificationPublisher,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Entry point for every contest operation
///
/// Reads go straight to the repository. Mutations are routed to the
/// contest's actor, spawned on first use, so that writes to one contest are
/// applied one after another while different contests proceed in parallel.
/// Actors of finished contests are retired after the request that observed
/// it, and respawned if the contest is touched again.
pub struct ContestManager {
    repository: Arc<dyn ContestRepository>,

    publisher: Arc<dyn NotificationPublisher>,

    config: EngineConfig,

    /// Live actor handles
    contests: Arc<RwLock<HashMap<ContestId, ContestHandle>>>,
}

impl ContestManager {
    pub fn new(
        repository: Arc<dyn ContestRepository>,
        publisher: Arc<dyn NotificationPublisher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            publisher,
            config,
            contests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a contest with a fresh ID
    pub async fn create_contest(&self, details: ContestDetails) -> ContestResult<Contest> {
        details.validate()?;

        let contest = Contest::new(Uuid::new_v4().to_string(), details);
        self.repository.create(&contest).await?;

        log::info!("Created contest {} '{}'", contest.id, contest.details.title);
        Ok(contest)
    }

    pub async fn get_contest(&self, contest_id: &str) -> ContestResult<Contest> {
        self.repository
            .find_by_id(contest_id)
            .await?
            .ok_or_else(|| ContestError::ContestNotFound(contest_id.to_string()))
    }

    pub async fn list_contests(&self) -> ContestResult<Vec<Contest>> {
        self.repository.list().await
    }

    pub async fn edit_contest(
        &self,
        contest_id: &str,
        details: ContestDetails,
    ) -> ContestResult<Contest> {
        self.dispatch(contest_id, |response| ContestMessage::UpdateDetails {
            details: details.clone(),
            response,
        })
        .await
    }

    /// Stop the contest's actor and remove it from storage
    pub async fn delete_contest(&self, contest_id: &str) -> ContestResult<()> {
        // Holding the write lock across the delete keeps `handle()` from
        // spawning an actor for a contest that is about to disappear
        let (handle, deleted) = {
            let mut contests = self.contests.write().await;
            let handle = contests.remove(contest_id);
            let deleted = self.repository.delete(contest_id).await;
            (handle, deleted)
        };

        if let Some(handle) = handle {
            // Already-stopped actors are fine here
            let _ = handle.close().await;
        }

        if !deleted? {
            return Err(ContestError::ContestNotFound(contest_id.to_string()));
        }

        log::info!("Deleted contest {}", contest_id);
        Ok(())
    }

    pub async fn register_participant(
        &self,
        contest_id: &str,
        user_id: &str,
    ) -> ContestResult<Contest> {
        self.dispatch(contest_id, |response| ContestMessage::Register {
            user_id: user_id.to_string(),
            response,
        })
        .await
    }

    pub async fn unregister_participant(
        &self,
        contest_id: &str,
        user_id: &str,
    ) -> ContestResult<Contest> {
        self.dispatch(contest_id, |response| ContestMessage::Unregister {
            user_id: user_id.to_string(),
            response,
        })
        .await
    }

    pub async fn add_problem(&self, contest_id: &str, problem_id: &str) -> ContestResult<Contest> {
        self.dispatch(contest_id, |response| ContestMessage::AddProblem {
            problem_id: problem_id.to_string(),
            response,
        })
        .await
    }

    pub async fn remove_problem(
        &self,
        contest_id: &str,
        problem_id: &str,
    ) -> ContestResult<Contest> {
        self.dispatch(contest_id, |response| ContestMessage::RemoveProblem {
            problem_id: problem_id.to_string(),
            response,
        })
        .await
    }

    pub async fn list_problems(&self, contest_id: &str) -> ContestResult<Vec<ProblemId>> {
        Ok(self.get_contest(contest_id).await?.problems)
    }

    /// Draw one problem from the pool at random
    pub async fn random_problem(&self, contest_id: &str) -> ContestResult<ProblemId> {
        let problems = self.list_problems(contest_id).await?;
        BracketGenerator::from_os_rng()
            .pick_problem(&problems)
            .cloned()
            .ok_or_else(|| ContestError::NotFound(format!("problems for contest {contest_id}")))
    }

    /// Generate the next round
    pub async fn start_round(&self, contest_id: &str) -> ContestResult<RoundStarted> {
        self.dispatch(contest_id, |response| ContestMessage::StartRound { response })
            .await
    }

    /// Record the winner of a match in the current round
    pub async fn apply_winner(
        &self,
        contest_id: &str,
        match_id: &str,
        winner_id: &str,
    ) -> ContestResult<Match> {
        self.dispatch(contest_id, |response| ContestMessage::ApplyWinner {
            match_id: match_id.to_string(),
            winner_id: winner_id.to_string(),
            response,
        })
        .await
    }

    /// React to a verdict from the judge for `user_id`'s submission
    pub async fn submit_solution(
        &self,
        contest_id: &str,
        user_id: &str,
        problem_id: &str,
        verdict: Verdict,
    ) -> ContestResult<SubmissionOutcome> {
        self.dispatch(contest_id, |response| ContestMessage::SubmitSolution {
            user_id: user_id.to_string(),
            problem_id: problem_id.to_string(),
            verdict,
            response,
        })
        .await
    }

    pub async fn get_active_match_for_user(
        &self,
        contest_id: &str,
        user_id: &str,
    ) -> ContestResult<MatchInfo> {
        let contest = self.get_contest(contest_id).await?;
        resolver::match_info(&contest, user_id)
    }

    /// Number of contests with a live actor
    pub async fn active_contest_count(&self) -> usize {
        self.contests.read().await.len()
    }

    /// Stop every actor, letting queued messages drain first
    pub async fn shutdown(&self) {
        let handles: Vec<ContestHandle> =
            self.contests.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.close().await;
        }
    }

    /// Send a command to the contest's actor and wait for the reply
    ///
    /// A handle that was retired between lookup and send is dropped and the
    /// command is sent once more to a fresh actor.
    async fn dispatch<T>(
        &self,
        contest_id: &str,
        build: impl Fn(Reply<T>) -> ContestMessage,
    ) -> ContestResult<T> {
        let mut handle = self.handle(contest_id).await?;
        let mut result = handle.request(&build).await;

        if matches!(result, Err(ContestError::Unavailable(_))) {
            self.forget(contest_id, &handle).await;
            handle = self.handle(contest_id).await?;
            result = handle.request(&build).await;
        }

        if handle.is_finished() {
            self.retire(contest_id, &handle).await;
        }

        result
    }

    /// Drop `handle` from the map unless a newer actor replaced it
    async fn forget(&self, contest_id: &str, handle: &ContestHandle) {
        let mut contests = self.contests.write().await;
        if contests
            .get(contest_id)
            .is_some_and(|current| current.same_actor(handle))
        {
            contests.remove(contest_id);
        }
    }

    /// Stop the actor of a finished contest
    async fn retire(&self, contest_id: &str, handle: &ContestHandle) {
        self.forget(contest_id, handle).await;
        // A concurrent caller may have closed it already
        let _ = handle.close().await;
        log::debug!("Retired actor for finished contest {}", contest_id);
    }

    async fn handle(&self, contest_id: &str) -> ContestResult<ContestHandle> {
        {
            let contests = self.contests.read().await;
            if let Some(handle) = contests.get(contest_id).filter(|h| !h.is_closed()) {
                return Ok(handle.clone());
            }
        }

        // Loading under the write lock serializes spawning with deletion
        let mut contests = self.contests.write().await;
        // Another caller may have spawned it while we waited for the lock
        if let Some(handle) = contests.get(contest_id).filter(|h| !h.is_closed()) {
            return Ok(handle.clone());
        }

        let contest = self.get_contest(contest_id).await?;

        let (actor, handle) = ContestActor::new(
            contest.id.clone(),
            Some(contest),
            &self.config,
            self.repository.clone(),
            self.publisher.clone(),
        );
        contests.insert(contest_id.to_string(), handle.clone());
        drop(contests);

        tokio::spawn(async move {
            actor.run().await;
        });

        log::debug!("Spawned actor for contest {}", contest_id);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryContestRepository;
    use crate::notify::SessionHub;

    fn manager() -> ContestManager {
        ContestManager::new(
            Arc::new(InMemoryContestRepository::new()),
            Arc::new(SessionHub::default()),
            EngineConfig::seeded(3),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let manager = manager();
        let created = manager
            .create_contest(ContestDetails::new("Weekly"))
            .await
            .unwrap();

        let fetched = manager.get_contest(&created.id).await.unwrap();
        assert_eq!(fetched.details.title, "Weekly");
        assert_eq!(manager.list_contests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let err = manager()
            .create_contest(ContestDetails::new(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, ContestError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_contest_spawns_nothing() {
        let manager = manager();
        let err = manager.start_round("nope").await.unwrap_err();
        assert!(matches!(err, ContestError::ContestNotFound(_)));
        assert_eq!(manager.active_contest_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_stops_actor() {
        let manager = manager();
        let contest = manager
            .create_contest(ContestDetails::new("Weekly"))
            .await
            .unwrap();
        manager.register_participant(&contest.id, "ada").await.unwrap();
        assert_eq!(manager.active_contest_count().await, 1);

        manager.delete_contest(&contest.id).await.unwrap();
        assert_eq!(manager.active_contest_count().await, 0);

        let err = manager.get_contest(&contest.id).await.unwrap_err();
        assert!(matches!(err, ContestError::ContestNotFound(_)));
        assert!(manager.delete_contest(&contest.id).await.is_err());
    }

    #[tokio::test]
    async fn test_random_problem() {
        let manager = manager();
        let contest = manager
            .create_contest(ContestDetails::new("Weekly"))
            .await
            .unwrap();

        let err = manager.random_problem(&contest.id).await.unwrap_err();
        assert!(matches!(err, ContestError::NotFound(_)));

        manager.add_problem(&contest.id, "p1").await.unwrap();
        manager.add_problem(&contest.id, "p2").await.unwrap();
        let picked = manager.random_problem(&contest.id).await.unwrap();
        assert!(picked == "p1" || picked == "p2");
    }

    #[tokio::test]
    async fn test_finished_contests_release_their_actors() {
        let manager = manager();

        for i in 0..50 {
            let contest = manager
                .create_contest(ContestDetails::new(format!("Solo {i}")))
                .await
                .unwrap();
            manager.register_participant(&contest.id, "ada").await.unwrap();

            // A single entrant gets a bye and the contest is over at once
            let started = manager.start_round(&contest.id).await.unwrap();
            assert!(started.matches[0].is_bye());
        }

        assert_eq!(manager.active_contest_count().await, 0);
    }

    #[tokio::test]
    async fn test_final_resolution_retires_actor_and_contest_stays_usable() {
        let manager = manager();
        let contest = manager
            .create_contest(ContestDetails::new("Final"))
            .await
            .unwrap();
        manager.register_participant(&contest.id, "ada").await.unwrap();
        manager.register_participant(&contest.id, "bob").await.unwrap();

        let started = manager.start_round(&contest.id).await.unwrap();
        assert_eq!(manager.active_contest_count().await, 1);

        let m = &started.matches[0];
        manager
            .apply_winner(&contest.id, &m.match_id, &m.user1)
            .await
            .unwrap();
        assert_eq!(manager.active_contest_count().await, 0);

        // Later commands respawn an actor that reads the finished contest
        let err = manager
            .apply_winner(&contest.id, &m.match_id, &m.user1)
            .await
            .unwrap_err();
        assert!(matches!(err, ContestError::AlreadyResolved(_)));
        let err = manager.start_round(&contest.id).await.unwrap_err();
        assert!(matches!(err, ContestError::InvalidState(_)));
        assert_eq!(manager.active_contest_count().await, 0);

        let finished = manager.get_contest(&contest.id).await.unwrap();
        assert_eq!(finished.champion(), Some(&m.user1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_racing_commands_leaves_no_actor() {
        let manager = Arc::new(manager());

        for _ in 0..20 {
            let contest = manager
                .create_contest(ContestDetails::new("Doomed"))
                .await
                .unwrap();

            let registering = {
                let manager = Arc::clone(&manager);
                let id = contest.id.clone();
                tokio::spawn(async move { manager.register_participant(&id, "ada").await })
            };
            let deleting = {
                let manager = Arc::clone(&manager);
                let id = contest.id.clone();
                tokio::spawn(async move { manager.delete_contest(&id).await })
            };

            deleting.await.unwrap().unwrap();
            // Either it ran first or it found nothing to load or save
            let _ = registering.await.unwrap();

            // Nothing may touch the contest once both are done
            let err = manager
                .register_participant(&contest.id, "bob")
                .await
                .unwrap_err();
            assert!(matches!(err, ContestError::ContestNotFound(_)));
        }

        assert_eq!(manager.active_contest_count().await, 0);
    }
}
