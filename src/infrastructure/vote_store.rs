// Vote Store - one vote per (user, post)
// The UNIQUE(user_id, post_id) constraint is the only arbiter; there is no check-then-insert.

use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row, Sqlite, Transaction};
use tracing::debug;

use crate::core::{PostId, UserId};
use crate::error::{AppError, AppResult};
use crate::models::{VoteCount, VoteDirection, Voter};

#[derive(Clone)]
pub struct VoteStore {
    pool: SqlitePool,
}

impl VoteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a vote. Fails with DuplicateVote if the user already voted on the post,
    /// whichever direction that vote has.
    pub async fn cast(
        &self,
        user_id: UserId,
        post_id: PostId,
        direction: VoteDirection,
    ) -> AppResult<VoteCount> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO post_voting_votes (user_id, post_id, direction, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(post_id)
        .bind(direction.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!("Duplicate vote by user {} on post {}", user_id, post_id);
                return Err(AppError::DuplicateVote { user_id, post_id });
            }
            Err(e) => {
                return Err(AppError::DatabaseError(format!(
                    "Failed to cast vote on post {}: {}",
                    post_id, e
                )))
            }
        }

        let count = Self::count_in(&mut tx, post_id).await?;
        tx.commit().await?;
        Ok(count)
    }

    /// Remove the user's vote. Fails with VoteNotFound if there is none.
    pub async fn retract(&self, user_id: UserId, post_id: PostId) -> AppResult<VoteCount> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM post_voting_votes WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to retract vote on post {}: {}", post_id, e))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::VoteNotFound { user_id, post_id });
        }

        let count = Self::count_in(&mut tx, post_id).await?;
        tx.commit().await?;
        Ok(count)
    }

    pub async fn count_for(&self, post_id: PostId) -> AppResult<VoteCount> {
        let mut tx = self.pool.begin().await?;
        let count = Self::count_in(&mut tx, post_id).await?;
        tx.commit().await?;
        Ok(count)
    }

    pub async fn direction_for(
        &self,
        user_id: UserId,
        post_id: PostId,
    ) -> AppResult<Option<VoteDirection>> {
        let row = sqlx::query("SELECT direction FROM post_voting_votes WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| parse_direction(row.get("direction")))
            .transpose()
    }

    /// Most recent voters first
    pub async fn voters(&self, post_id: PostId, limit: u32) -> AppResult<Vec<Voter>> {
        let rows = sqlx::query(
            "SELECT user_id, direction, created_at FROM post_voting_votes WHERE post_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(post_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list voters of post {}: {}", post_id, e)))?;

        rows.into_iter()
            .map(|row| {
                Ok(Voter {
                    user_id: row.get("user_id"),
                    direction: parse_direction(row.get("direction"))?,
                    voted_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn count_in(tx: &mut Transaction<'_, Sqlite>, post_id: PostId) -> AppResult<VoteCount> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN direction = 'up' THEN 1 ELSE 0 END), 0) AS up,
                COALESCE(SUM(CASE WHEN direction = 'down' THEN 1 ELSE 0 END), 0) AS down
            FROM post_voting_votes
            WHERE post_id = ?
            "#,
        )
        .bind(post_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count votes of post {}: {}", post_id, e)))?;

        Ok(VoteCount::new(post_id, row.get("up"), row.get("down")))
    }
}

fn parse_direction(value: String) -> AppResult<VoteDirection> {
    value.parse().map_err(AppError::Internal)
}
