//! Contest actor: the single owner of one contest's mutations.

use super::{
    config::EngineConfig,
    messages::{ContestMessage, Reply, RoundStarted},
};
use crate::{
    contest::{
        BracketGenerator, Contest, ContestError, ContestId, ContestResult, Match,
        SubmissionOutcome, Verdict, resolver, rounds,
    },
    db::ContestRepository,
    notify::{MatchEvent, NotificationPublisher},
};
use chrono::Utc;
use rand::rngs::StdRng;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{mpsc, oneshot};

/// Contest actor handle for sending messages
#[derive(Clone)]
pub struct ContestHandle {
    sender: mpsc::Sender<ContestMessage>,
    contest_id: ContestId,
    /// Set by the actor once the persisted contest has a champion
    finished: Arc<AtomicBool>,
}

impl ContestHandle {
    pub fn new(
        sender: mpsc::Sender<ContestMessage>,
        contest_id: ContestId,
        finished: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sender,
            contest_id,
            finished,
        }
    }

    pub fn contest_id(&self) -> &str {
        &self.contest_id
    }

    /// Whether the actor behind this handle has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Whether the last aggregate the actor saw was finished
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Whether both handles talk to the same actor
    pub fn same_actor(&self, other: &ContestHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Send a message to the contest
    pub async fn send(&self, message: ContestMessage) -> ContestResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| ContestError::Unavailable(self.contest_id.clone()))
    }

    /// Send a command and wait for its reply
    pub async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> ContestMessage,
    ) -> ContestResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await
            .map_err(|_| ContestError::Unavailable(self.contest_id.clone()))?
    }

    /// Ask the actor to stop accepting messages
    ///
    /// Messages already queued are still processed before the actor exits.
    pub async fn close(&self) -> ContestResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(ContestMessage::Close { response: tx }).await?;
        rx.await
            .map_err(|_| ContestError::Unavailable(self.contest_id.clone()))
    }
}

/// Actor owning a single contest
///
/// Messages are processed one at a time. Each mutation works on a clone of
/// the cached aggregate and the cache is only replaced after the repository
/// accepted the save, so a failed save leaves nothing behind.
pub struct ContestActor {
    id: ContestId,

    /// Last aggregate known to be persisted
    cached: Option<Contest>,

    inbox: mpsc::Receiver<ContestMessage>,

    repository: Arc<dyn ContestRepository>,

    publisher: Arc<dyn NotificationPublisher>,

    generator: BracketGenerator<StdRng>,

    finished: Arc<AtomicBool>,
}

impl ContestActor {
    /// Create a new contest actor
    ///
    /// `initial` may carry the aggregate the caller just loaded, saving the
    /// first round trip to the repository.
    pub fn new(
        id: ContestId,
        initial: Option<Contest>,
        config: &EngineConfig,
        repository: Arc<dyn ContestRepository>,
        publisher: Arc<dyn NotificationPublisher>,
    ) -> (Self, ContestHandle) {
        let (sender, inbox) = mpsc::channel(config.mailbox_size);
        let generator = BracketGenerator::with_rng(config.rng.rng_for(&id));
        let finished = Arc::new(AtomicBool::new(
            initial.as_ref().is_some_and(Contest::is_finished),
        ));

        let actor = Self {
            id: id.clone(),
            cached: initial,
            inbox,
            repository,
            publisher,
            generator,
            finished: finished.clone(),
        };

        (actor, ContestHandle::new(sender, id, finished))
    }

    /// Run the contest actor event loop
    pub async fn run(mut self) {
        log::info!("Contest {} actor starting", self.id);

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;
        }

        log::info!("Contest {} actor stopped", self.id);
    }

    async fn handle_message(&mut self, message: ContestMessage) {
        match message {
            ContestMessage::StartRound { response } => {
                let result = self.handle_start_round().await;
                let _ = response.send(result);
            }

            ContestMessage::ApplyWinner {
                match_id,
                winner_id,
                response,
            } => {
                let result = self.handle_apply_winner(&match_id, &winner_id).await;
                let _ = response.send(result);
            }

            ContestMessage::SubmitSolution {
                user_id,
                problem_id,
                verdict,
                response,
            } => {
                let result = self
                    .handle_submission(&user_id, &problem_id, verdict)
                    .await;
                let _ = response.send(result);
            }

            ContestMessage::Register { user_id, response } => {
                let result = self.update(|c| c.register(&user_id)).await;
                let _ = response.send(result);
            }

            ContestMessage::Unregister { user_id, response } => {
                let result = self.update(|c| c.unregister(&user_id)).await;
                let _ = response.send(result);
            }

            ContestMessage::AddProblem {
                problem_id,
                response,
            } => {
                let result = self.update(|c| c.add_problem(&problem_id)).await;
                let _ = response.send(result);
            }

            ContestMessage::RemoveProblem {
                problem_id,
                response,
            } => {
                let result = self.update(|c| c.remove_problem(&problem_id)).await;
                let _ = response.send(result);
            }

            ContestMessage::UpdateDetails { details, response } => {
                let result = self.update(|c| c.update_details(details)).await;
                let _ = response.send(result);
            }

            ContestMessage::Close { response } => {
                // Buffered messages still drain; new sends fail
                self.inbox.close();
                let _ = response.send(());
            }
        }
    }

    async fn handle_start_round(&mut self) -> ContestResult<RoundStarted> {
        let (started, _) = self
            .mutate(|contest, generator| {
                let round = rounds::start_next_round(contest, generator)?.clone();
                Ok(RoundStarted {
                    round: round.number,
                    total_rounds: contest.total_rounds.unwrap_or(round.number),
                    matches: round.matches,
                })
            })
            .await?;

        log::info!(
            "Contest {}: round {}/{} started with {} match(es)",
            self.id,
            started.round,
            started.total_rounds,
            started.matches.len()
        );

        Ok(started)
    }

    async fn handle_apply_winner(&mut self, match_id: &str, winner_id: &str) -> ContestResult<Match> {
        let (resolved, saved) = self
            .mutate(|contest, _| resolver::apply_winner(contest, match_id, winner_id))
            .await?;

        self.announce(&saved, &resolved);
        Ok(resolved)
    }

    async fn handle_submission(
        &mut self,
        user_id: &str,
        problem_id: &str,
        verdict: Verdict,
    ) -> ContestResult<SubmissionOutcome> {
        if verdict == Verdict::Rejected {
            let contest = self.load().await?;
            let pending = resolver::match_for_submission(&contest, user_id, problem_id)?;
            log::debug!(
                "Contest {}: rejected submission from {} in {}",
                self.id,
                user_id,
                pending.match_id
            );
            return Ok(SubmissionOutcome::Rejected {
                match_id: pending.match_id.clone(),
            });
        }

        let (resolved, saved) = self
            .mutate(|contest, _| {
                let match_id = resolver::match_for_submission(contest, user_id, problem_id)?
                    .match_id
                    .clone();
                resolver::apply_winner(contest, &match_id, user_id)
            })
            .await?;

        self.announce(&saved, &resolved);
        Ok(SubmissionOutcome::Accepted { resolved })
    }

    fn announce(&self, contest: &Contest, resolved: &Match) {
        log::info!(
            "Contest {}: match {} won by {}",
            self.id,
            resolved.match_id,
            resolved.winner.as_deref().unwrap_or("-")
        );

        for event in MatchEvent::for_resolved(&self.id, contest.current_round, resolved) {
            self.publisher.publish(event);
        }
    }

    /// Apply a rule that needs no randomness and return the saved aggregate
    async fn update<F>(&mut self, apply: F) -> ContestResult<Contest>
    where
        F: FnOnce(&mut Contest) -> ContestResult<()>,
    {
        let ((), saved) = self.mutate(|contest, _| apply(contest)).await?;
        Ok(saved)
    }

    /// Run `apply` on a draft copy and persist it
    async fn mutate<T, F>(&mut self, apply: F) -> ContestResult<(T, Contest)>
    where
        F: FnOnce(&mut Contest, &mut BracketGenerator<StdRng>) -> ContestResult<T>,
    {
        let mut draft = self.load().await?;
        let value = apply(&mut draft, &mut self.generator)?;
        let saved = self.commit(draft).await?;
        Ok((value, saved))
    }

    async fn load(&mut self) -> ContestResult<Contest> {
        if let Some(contest) = &self.cached {
            return Ok(contest.clone());
        }

        let contest = self
            .repository
            .find_by_id(&self.id)
            .await?
            .ok_or_else(|| ContestError::ContestNotFound(self.id.clone()))?;

        self.remember(&contest);
        Ok(contest)
    }

    fn remember(&mut self, contest: &Contest) {
        self.finished
            .store(contest.is_finished(), Ordering::Release);
        self.cached = Some(contest.clone());
    }

    async fn commit(&mut self, mut draft: Contest) -> ContestResult<Contest> {
        draft.updated_at = Utc::now();

        match self.repository.save(&draft).await {
            Ok(version) => {
                draft.version = version;
                self.remember(&draft);
                Ok(draft)
            }
            Err(e) => {
                // Whatever we hold may be stale now; reload on the next message
                self.cached = None;
                if matches!(e, ContestError::Conflict(_)) {
                    log::warn!("Contest {}: concurrent modification detected", self.id);
                } else {
                    log::error!("Contest {}: failed to save: {}", self.id, e);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::{ContestDetails, MatchStatus};
    use crate::db::InMemoryContestRepository;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<MatchEvent>>,
    }

    impl NotificationPublisher for Recorder {
        fn publish(&self, event: MatchEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    async fn spawn_with(users: &[&str]) -> (ContestHandle, InMemoryContestRepository, Arc<Recorder>) {
        let mut contest = Contest::new("cup".to_string(), ContestDetails::new("Cup"));
        for user in users {
            contest.register(user).unwrap();
        }
        contest.add_problem("p1").unwrap();

        let repo = InMemoryContestRepository::new().with_contest(contest).await;
        let recorder = Arc::new(Recorder::default());
        let (actor, handle) = ContestActor::new(
            "cup".to_string(),
            None,
            &EngineConfig::seeded(1),
            Arc::new(repo.clone()),
            recorder.clone(),
        );
        tokio::spawn(actor.run());

        (handle, repo, recorder)
    }

    #[tokio::test]
    async fn test_start_round_persists() {
        let (handle, repo, _) = spawn_with(&["a", "b", "c", "d"]).await;

        let started = handle
            .request(|response| ContestMessage::StartRound { response })
            .await
            .unwrap();
        assert_eq!(started.round, 1);
        assert_eq!(started.total_rounds, 2);
        assert_eq!(started.matches.len(), 2);

        let stored = repo.find_by_id("cup").await.unwrap().unwrap();
        assert_eq!(stored.current_round, 1);
        assert_eq!(stored.version, 1);
        assert!(
            stored.rounds[0]
                .matches
                .iter()
                .all(|m| m.problem_id.as_deref() == Some("p1"))
        );
    }

    #[tokio::test]
    async fn test_apply_winner_publishes_both_sides() {
        let (handle, _, recorder) = spawn_with(&["a", "b"]).await;
        let started = handle
            .request(|response| ContestMessage::StartRound { response })
            .await
            .unwrap();
        let m = &started.matches[0];

        let resolved = handle
            .request(|response| ContestMessage::ApplyWinner {
                match_id: m.match_id.clone(),
                winner_id: m.user1.clone(),
                response,
            })
            .await
            .unwrap();
        assert_eq!(resolved.status, MatchStatus::Completed);

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.recipient_id == m.user1));
    }

    #[tokio::test]
    async fn test_failed_rule_leaves_store_untouched() {
        let (handle, repo, recorder) = spawn_with(&["a", "b"]).await;
        handle
            .request(|response| ContestMessage::StartRound { response })
            .await
            .unwrap();

        let err = handle
            .request(|response| ContestMessage::ApplyWinner {
                match_id: "cup-1-1".to_string(),
                winner_id: "mallory".to_string(),
                response,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ContestError::InvalidParticipant(_)));

        let stored = repo.find_by_id("cup").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_external_write_surfaces_conflict_then_recovers() {
        let (handle, repo, _) = spawn_with(&["a", "b"]).await;

        // Warm the actor cache
        handle
            .request(|response| ContestMessage::AddProblem {
                problem_id: "p2".to_string(),
                response,
            })
            .await
            .unwrap();

        // Another process saves behind the actor's back
        let external = repo.find_by_id("cup").await.unwrap().unwrap();
        repo.save(&external).await.unwrap();

        let err = handle
            .request(|response| ContestMessage::AddProblem {
                problem_id: "p3".to_string(),
                response,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ContestError::Conflict(_)));

        // Cache was dropped, so the retry reloads and succeeds
        let saved = handle
            .request(|response| ContestMessage::AddProblem {
                problem_id: "p3".to_string(),
                response,
            })
            .await
            .unwrap();
        assert_eq!(saved.problems, vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_handle_reports_finished_after_final() {
        let (handle, _, _) = spawn_with(&["a", "b"]).await;
        let started = handle
            .request(|response| ContestMessage::StartRound { response })
            .await
            .unwrap();
        assert!(!handle.is_finished());

        let m = &started.matches[0];
        handle
            .request(|response| ContestMessage::ApplyWinner {
                match_id: m.match_id.clone(),
                winner_id: m.user1.clone(),
                response,
            })
            .await
            .unwrap();
        assert!(handle.is_finished());
        assert!(handle.same_actor(&handle.clone()));
    }

    #[tokio::test]
    async fn test_closed_actor_is_unavailable() {
        let (handle, _, _) = spawn_with(&["a"]).await;
        handle.close().await.unwrap();

        let err = handle
            .request(|response| ContestMessage::StartRound { response })
            .await
            .unwrap_err();
        assert!(matches!(err, ContestError::Unavailable(_)));
    }
}
