// Comment Store - append-only comment log per post
// Deletion only sets a tombstone; ids are AUTOINCREMENT and never reassigned, which keeps the
// `id > cursor` pagination contract stable.

use chrono::Utc;
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row, Sqlite, Transaction};

use crate::core::{CommentId, PostId, UserId};
use crate::error::{AppError, AppResult};
use crate::models::Comment;

const COMMENT_COLUMNS: &str = "id, post_id, user_id, raw, cooked, created_at, updated_at";

#[derive(Clone)]
pub struct CommentStore {
    pool: SqlitePool,
}

impl CommentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        author: UserId,
        post_id: PostId,
        raw: &str,
        cooked: &str,
    ) -> AppResult<Comment> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO post_voting_comments (post_id, user_id, raw, cooked, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(post_id)
        .bind(author)
        .bind(raw)
        .bind(cooked)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create comment on post {}: {}", post_id, e)))?;

        Ok(Comment {
            id: CommentId(result.last_insert_rowid()),
            post_id,
            user_id: author,
            raw: raw.to_string(),
            cooked: cooked.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Live comment by id; trashed comments are not found
    pub async fn find(&self, comment_id: CommentId) -> AppResult<Option<Comment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM post_voting_comments WHERE id = ? AND deleted_at IS NULL",
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to get comment {}: {}", comment_id, e)))?;

        Ok(row.as_ref().map(comment_from_row))
    }

    pub async fn edit(&self, comment_id: CommentId, raw: &str, cooked: &str) -> AppResult<Comment> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE post_voting_comments SET raw = ?, cooked = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(raw)
        .bind(cooked)
        .bind(Utc::now())
        .bind(comment_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to edit comment {}: {}", comment_id, e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", comment_id)));
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM post_voting_comments WHERE id = ?",
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;
        let comment = comment_from_row(&row);

        tx.commit().await?;
        Ok(comment)
    }

    /// Tombstone a live comment. Returns the post's live comment count after the removal.
    pub async fn soft_delete(&self, comment_id: CommentId, deleted_by: UserId) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;

        let post_id: Option<PostId> = sqlx::query(
            "UPDATE post_voting_comments SET deleted_at = ?, deleted_by_id = ? WHERE id = ? AND deleted_at IS NULL RETURNING post_id",
        )
        .bind(Utc::now())
        .bind(deleted_by)
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to trash comment {}: {}", comment_id, e)))?
        .map(|row| row.get("post_id"));

        let Some(post_id) = post_id else {
            return Err(AppError::NotFound(format!("Comment {} not found", comment_id)));
        };

        let count = Self::live_count_in(&mut tx, post_id).await?;
        tx.commit().await?;
        Ok(count)
    }

    /// Live comments of `post_id` with id strictly greater than `last_seen`, ascending
    pub async fn fetch_after(
        &self,
        post_id: PostId,
        last_seen: CommentId,
        limit: Option<u32>,
    ) -> AppResult<Vec<Comment>> {
        // LIMIT -1 means no limit in SQLite
        let limit = limit.map(i64::from).unwrap_or(-1);

        let rows = sqlx::query(&format!(
            "SELECT {} FROM post_voting_comments WHERE post_id = ? AND id > ? AND deleted_at IS NULL ORDER BY id ASC LIMIT ?",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .bind(last_seen)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to load comments of post {}: {}", post_id, e)))?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    pub async fn live_count(&self, post_id: PostId) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;
        let count = Self::live_count_in(&mut tx, post_id).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn live_count_in(tx: &mut Transaction<'_, Sqlite>, post_id: PostId) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM post_voting_comments WHERE post_id = ? AND deleted_at IS NULL",
        )
        .bind(post_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.get("count"))
    }
}

fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        raw: row.get("raw"),
        cooked: row.get("cooked"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
