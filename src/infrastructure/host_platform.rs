// Host Platform - the forum this service plugs into
// Session resolution and topic/post lookup. Sign-up, login and topic creation belong to the
// host; the provisioning helpers on SqliteHostPlatform exist for seeding and tests.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::HashSet;

use crate::core::{PostId, TopicId, UserId};
use crate::error::{AppError, AppResult};
use crate::models::{Post, PostContext, Topic, TopicVisibility, User};

#[async_trait]
pub trait HostPlatform: Send + Sync {
    /// Resolve a session token to its user. Unknown tokens resolve to `None`.
    async fn user_for_session(&self, token: &str) -> AppResult<Option<User>>;

    async fn find_topic(&self, topic_id: TopicId) -> AppResult<Option<Topic>>;

    /// Load a post together with its topic
    async fn find_post(&self, post_id: PostId) -> AppResult<Option<PostContext>>;
}

/// Fields for provisioning a topic
#[derive(Debug, Clone, Default)]
pub struct NewTopic {
    pub title: String,
    pub post_voting_enabled: bool,
    pub closed: bool,
    pub archived: bool,
    pub allowed_user_ids: Option<Vec<UserId>>,
}

pub struct SqliteHostPlatform {
    pool: SqlitePool,
}

impl SqliteHostPlatform {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_user(
        &self,
        username: &str,
        admin: bool,
        moderator: bool,
        session_token: Option<&str>,
    ) -> AppResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, admin, moderator, session_token) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(admin)
        .bind(moderator)
        .bind(session_token)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create user {}: {}", username, e)))?;

        Ok(User {
            id: UserId(result.last_insert_rowid()),
            username: username.to_string(),
            admin,
            moderator,
        })
    }

    pub async fn create_topic(&self, topic: NewTopic) -> AppResult<Topic> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO topics (title, post_voting_enabled, closed, archived, private) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&topic.title)
        .bind(topic.post_voting_enabled)
        .bind(topic.closed)
        .bind(topic.archived)
        .bind(topic.allowed_user_ids.is_some())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create topic: {}", e)))?;
        let topic_id = TopicId(result.last_insert_rowid());

        let visibility = match topic.allowed_user_ids {
            Some(user_ids) => {
                for user_id in &user_ids {
                    sqlx::query("INSERT INTO topic_allowed_users (topic_id, user_id) VALUES (?, ?)")
                        .bind(topic_id)
                        .bind(*user_id)
                        .execute(&mut *tx)
                        .await?;
                }
                TopicVisibility::Private {
                    allowed_user_ids: user_ids.into_iter().collect(),
                }
            }
            None => TopicVisibility::Public,
        };

        tx.commit().await?;

        Ok(Topic {
            id: topic_id,
            title: topic.title,
            post_voting_enabled: topic.post_voting_enabled,
            closed: topic.closed,
            archived: topic.archived,
            visibility,
        })
    }

    /// Append a post to a topic, taking the next post number
    pub async fn create_post(
        &self,
        topic_id: TopicId,
        user_id: UserId,
        reply_to_post_number: Option<i32>,
    ) -> AppResult<Post> {
        let mut tx = self.pool.begin().await?;

        let post_number: i32 = sqlx::query(
            "SELECT COALESCE(MAX(post_number), 0) + 1 AS next FROM posts WHERE topic_id = ?",
        )
        .bind(topic_id)
        .fetch_one(&mut *tx)
        .await?
        .get("next");

        let result = sqlx::query(
            "INSERT INTO posts (topic_id, user_id, post_number, reply_to_post_number) VALUES (?, ?, ?, ?)",
        )
        .bind(topic_id)
        .bind(user_id)
        .bind(post_number)
        .bind(reply_to_post_number)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create post in topic {}: {}", topic_id, e)))?;

        tx.commit().await?;

        Ok(Post {
            id: PostId(result.last_insert_rowid()),
            topic_id,
            user_id,
            post_number,
            reply_to_post_number,
            deleted: false,
        })
    }

    pub async fn set_post_deleted(&self, post_id: PostId, deleted: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE posts SET deleted = ? WHERE id = ?")
            .bind(deleted)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }
        Ok(())
    }

    pub async fn set_topic_flags(&self, topic_id: TopicId, closed: bool, archived: bool) -> AppResult<()> {
        sqlx::query("UPDATE topics SET closed = ?, archived = ? WHERE id = ?")
            .bind(closed)
            .bind(archived)
            .bind(topic_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HostPlatform for SqliteHostPlatform {
    async fn user_for_session(&self, token: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, admin, moderator FROM users WHERE session_token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to resolve session: {}", e)))?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            username: row.get("username"),
            admin: row.get("admin"),
            moderator: row.get("moderator"),
        }))
    }

    async fn find_topic(&self, topic_id: TopicId) -> AppResult<Option<Topic>> {
        let row = sqlx::query(
            "SELECT id, title, post_voting_enabled, closed, archived, private FROM topics WHERE id = ?",
        )
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to get topic {}: {}", topic_id, e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let visibility = if row.get::<bool, _>("private") {
            let allowed_user_ids: HashSet<UserId> =
                sqlx::query("SELECT user_id FROM topic_allowed_users WHERE topic_id = ?")
                    .bind(topic_id)
                    .fetch_all(&self.pool)
                    .await?
                    .into_iter()
                    .map(|r| r.get::<UserId, _>("user_id"))
                    .collect();
            TopicVisibility::Private { allowed_user_ids }
        } else {
            TopicVisibility::Public
        };

        Ok(Some(Topic {
            id: row.get("id"),
            title: row.get("title"),
            post_voting_enabled: row.get("post_voting_enabled"),
            closed: row.get("closed"),
            archived: row.get("archived"),
            visibility,
        }))
    }

    async fn find_post(&self, post_id: PostId) -> AppResult<Option<PostContext>> {
        let row = sqlx::query(
            "SELECT id, topic_id, user_id, post_number, reply_to_post_number, deleted FROM posts WHERE id = ?",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to get post {}: {}", post_id, e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let post = Post {
            id: row.get("id"),
            topic_id: row.get("topic_id"),
            user_id: row.get("user_id"),
            post_number: row.get("post_number"),
            reply_to_post_number: row.get("reply_to_post_number"),
            deleted: row.get("deleted"),
        };

        // A post without its topic is treated as missing
        match self.find_topic(post.topic_id).await? {
            Some(topic) => Ok(Some(PostContext { post, topic })),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::Database;

    async fn host() -> SqliteHostPlatform {
        let db = Database::new_in_memory().await.unwrap();
        SqliteHostPlatform::new(db.pool)
    }

    #[tokio::test]
    async fn test_session_resolution() {
        let host = host().await;
        let user = host.create_user("alice", false, true, Some("tok-alice")).await.unwrap();

        let resolved = host.user_for_session("tok-alice").await.unwrap();
        assert_eq!(resolved, Some(user));
        assert_eq!(host.user_for_session("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_posts_get_sequential_numbers() {
        let host = host().await;
        let user = host.create_user("bob", false, false, None).await.unwrap();
        let topic = host
            .create_topic(NewTopic {
                title: "Which allocator?".into(),
                post_voting_enabled: true,
                ..NewTopic::default()
            })
            .await
            .unwrap();

        let first = host.create_post(topic.id, user.id, None).await.unwrap();
        let answer = host.create_post(topic.id, user.id, None).await.unwrap();
        let reply = host.create_post(topic.id, user.id, Some(2)).await.unwrap();

        assert_eq!(first.post_number, 1);
        assert_eq!(answer.post_number, 2);
        assert_eq!(reply.post_number, 3);

        let ctx = host.find_post(reply.id).await.unwrap().unwrap();
        assert!(ctx.post.is_reply());
        assert_eq!(ctx.topic, topic);
    }

    #[tokio::test]
    async fn test_private_topic_round_trip() {
        let host = host().await;
        let user = host.create_user("carol", false, false, None).await.unwrap();
        let topic = host
            .create_topic(NewTopic {
                title: "Staff only".into(),
                allowed_user_ids: Some(vec![user.id]),
                ..NewTopic::default()
            })
            .await
            .unwrap();

        let loaded = host.find_topic(topic.id).await.unwrap().unwrap();
        match loaded.visibility {
            TopicVisibility::Private { allowed_user_ids } => {
                assert!(allowed_user_ids.contains(&user.id));
            }
            TopicVisibility::Public => panic!("expected a private topic"),
        }
    }

    #[tokio::test]
    async fn test_missing_post() {
        let host = host().await;
        assert!(host.find_post(PostId(404)).await.unwrap().is_none());
        assert!(host.set_post_deleted(PostId(404), true).await.is_err());
    }
}
