//! Repository trait definitions for testability and dependency injection.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::contest::{Contest, ContestError, ContestResult};

/// Whole-aggregate contest storage
///
/// `save` is a compare-and-swap on [`Contest::version`]: it succeeds only if
/// the stored version still equals the version the caller loaded, and
/// returns the new version. A mismatch yields [`ContestError::Conflict`].
#[async_trait]
pub trait ContestRepository: Send + Sync {
    /// Insert a new contest
    async fn create(&self, contest: &Contest) -> ContestResult<()>;

    /// Find contest by ID
    async fn find_by_id(&self, contest_id: &str) -> ContestResult<Option<Contest>>;

    /// Replace the stored aggregate if its version is unchanged
    async fn save(&self, contest: &Contest) -> ContestResult<u64>;

    /// Delete contest, returning whether it existed
    async fn delete(&self, contest_id: &str) -> ContestResult<bool>;

    /// All contests, newest first
    async fn list(&self) -> ContestResult<Vec<Contest>>;
}

/// PostgreSQL implementation of `ContestRepository`
///
/// The aggregate is stored as JSONB next to a `version` column, which is the
/// source of truth for the concurrency token.
pub struct PgContestRepository {
    pool: PgPool,
}

impl PgContestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode(row: &sqlx::postgres::PgRow) -> ContestResult<Contest> {
    let body: serde_json::Value = row.try_get("body")?;
    let version: i64 = row.try_get("version")?;

    let mut contest: Contest = serde_json::from_value(body)?;
    contest.version = version as u64;
    Ok(contest)
}

#[async_trait]
impl ContestRepository for PgContestRepository {
    async fn create(&self, contest: &Contest) -> ContestResult<()> {
        let body = serde_json::to_value(contest)?;

        let result = sqlx::query(
            "INSERT INTO contests (id, title, version, body, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&contest.id)
        .bind(&contest.details.title)
        .bind(contest.version as i64)
        .bind(body)
        .bind(contest.created_at)
        .bind(contest.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                ContestError::Duplicate(format!("contest {} already exists", contest.id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, contest_id: &str) -> ContestResult<Option<Contest>> {
        let row = sqlx::query("SELECT version, body FROM contests WHERE id = $1")
            .bind(contest_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode).transpose()
    }

    async fn save(&self, contest: &Contest) -> ContestResult<u64> {
        let body = serde_json::to_value(contest)?;

        let row = sqlx::query(
            "UPDATE contests
             SET body = $1, title = $2, version = version + 1, updated_at = $3
             WHERE id = $4 AND version = $5
             RETURNING version",
        )
        .bind(body)
        .bind(&contest.details.title)
        .bind(contest.updated_at)
        .bind(&contest.id)
        .bind(contest.version as i64)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let version: i64 = row.try_get("version")?;
            return Ok(version as u64);
        }

        // Either the row is gone or someone else saved first
        let exists = sqlx::query("SELECT 1 FROM contests WHERE id = $1")
            .bind(&contest.id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        if exists {
            Err(ContestError::Conflict(contest.id.clone()))
        } else {
            Err(ContestError::ContestNotFound(contest.id.clone()))
        }
    }

    async fn delete(&self, contest_id: &str) -> ContestResult<bool> {
        let result = sqlx::query("DELETE FROM contests WHERE id = $1")
            .bind(contest_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> ContestResult<Vec<Contest>> {
        let rows = sqlx::query("SELECT version, body FROM contests ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode).collect()
    }
}
