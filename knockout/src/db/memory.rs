//! In-process contest store with the same compare-and-swap semantics as the
//! Postgres repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::repository::ContestRepository;
use crate::contest::{Contest, ContestError, ContestId, ContestResult};

#[derive(Clone, Default)]
pub struct InMemoryContestRepository {
    contests: Arc<RwLock<HashMap<ContestId, Contest>>>,
}

impl InMemoryContestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing aggregate
    pub async fn with_contest(self, contest: Contest) -> Self {
        self.contests
            .write()
            .await
            .insert(contest.id.clone(), contest);
        self
    }

    pub async fn len(&self) -> usize {
        self.contests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contests.read().await.is_empty()
    }
}

#[async_trait]
impl ContestRepository for InMemoryContestRepository {
    async fn create(&self, contest: &Contest) -> ContestResult<()> {
        let mut contests = self.contests.write().await;
        if contests.contains_key(&contest.id) {
            return Err(ContestError::Duplicate(format!(
                "contest {} already exists",
                contest.id
            )));
        }
        contests.insert(contest.id.clone(), contest.clone());
        Ok(())
    }

    async fn find_by_id(&self, contest_id: &str) -> ContestResult<Option<Contest>> {
        Ok(self.contests.read().await.get(contest_id).cloned())
    }

    async fn save(&self, contest: &Contest) -> ContestResult<u64> {
        let mut contests = self.contests.write().await;
        let stored = contests
            .get_mut(&contest.id)
            .ok_or_else(|| ContestError::ContestNotFound(contest.id.clone()))?;

        if stored.version != contest.version {
            return Err(ContestError::Conflict(contest.id.clone()));
        }

        let mut next = contest.clone();
        next.version = contest.version + 1;
        *stored = next;

        Ok(stored.version)
    }

    async fn delete(&self, contest_id: &str) -> ContestResult<bool> {
        Ok(self.contests.write().await.remove(contest_id).is_some())
    }

    async fn list(&self) -> ContestResult<Vec<Contest>> {
        let mut all: Vec<Contest> = self.contests.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::ContestDetails;

    fn contest(id: &str) -> Contest {
        Contest::new(id.to_string(), ContestDetails::new("Cup"))
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryContestRepository::new();
        repo.create(&contest("a")).await.unwrap();

        let found = repo.find_by_id("a").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some("a".to_string()));
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate() {
        let repo = InMemoryContestRepository::new();
        repo.create(&contest("a")).await.unwrap();
        let err = repo.create(&contest("a")).await.unwrap_err();
        assert!(matches!(err, ContestError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let repo = InMemoryContestRepository::new();
        let mut c = contest("a");
        repo.create(&c).await.unwrap();

        c.problems.push("p1".to_string());
        let version = repo.save(&c).await.unwrap();
        assert_eq!(version, 1);

        let stored = repo.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.problems, vec!["p1".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_save_conflicts() {
        let repo = InMemoryContestRepository::new();
        let c = contest("a");
        repo.create(&c).await.unwrap();

        let mut first = repo.find_by_id("a").await.unwrap().unwrap();
        let mut second = first.clone();

        first.problems.push("p1".to_string());
        repo.save(&first).await.unwrap();

        second.problems.push("p2".to_string());
        let err = repo.save(&second).await.unwrap_err();
        assert!(matches!(err, ContestError::Conflict(_)));

        let stored = repo.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(stored.problems, vec!["p1".to_string()]);
    }

    #[tokio::test]
    async fn test_save_missing() {
        let repo = InMemoryContestRepository::new();
        let err = repo.save(&contest("ghost")).await.unwrap_err();
        assert!(matches!(err, ContestError::ContestNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryContestRepository::new().with_contest(contest("a")).await;
        assert_eq!(repo.len().await, 1);
        assert!(repo.delete("a").await.unwrap());
        assert!(!repo.delete("a").await.unwrap());
        assert!(repo.is_empty().await);
    }
}
