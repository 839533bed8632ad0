// Database - SQLite connection pool and schema
// Host tables (users, topics, posts) live next to the votes and comments this service owns

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let in_memory = config.url.contains(":memory:");

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Invalid DATABASE_URL '{}': {}", config.url, e))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let options = if in_memory {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        };

        // An in-memory database lives exactly as long as its single connection
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to connect to {}: {}", config.url, e))
        })?;

        let db = Self { pool };
        db.initialize().await?;
        info!("Database ready at {}", config.url);
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            seed_demo_data: false,
        })
        .await
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                admin INTEGER NOT NULL DEFAULT 0,
                moderator INTEGER NOT NULL DEFAULT 0,
                session_token TEXT UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                post_voting_enabled INTEGER NOT NULL DEFAULT 0,
                closed INTEGER NOT NULL DEFAULT 0,
                archived INTEGER NOT NULL DEFAULT 0,
                private INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS topic_allowed_users (
                topic_id INTEGER NOT NULL REFERENCES topics(id),
                user_id INTEGER NOT NULL REFERENCES users(id),
                PRIMARY KEY (topic_id, user_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id INTEGER NOT NULL REFERENCES topics(id),
                user_id INTEGER NOT NULL REFERENCES users(id),
                post_number INTEGER NOT NULL,
                reply_to_post_number INTEGER,
                deleted INTEGER NOT NULL DEFAULT 0,
                UNIQUE (topic_id, post_number)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS post_voting_votes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                post_id INTEGER NOT NULL,
                direction TEXT NOT NULL CHECK (direction IN ('up', 'down')),
                created_at TEXT NOT NULL,
                UNIQUE (user_id, post_id)
            )
            "#,
            // AUTOINCREMENT: ids of trashed or rolled back comments are never handed out again
            r#"
            CREATE TABLE IF NOT EXISTS post_voting_comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                raw TEXT NOT NULL,
                cooked TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT,
                deleted_by_id INTEGER
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_posts_topic ON posts(topic_id, post_number)",
            "CREATE INDEX IF NOT EXISTS idx_votes_post ON post_voting_votes(post_id, direction)",
            "CREATE INDEX IF NOT EXISTS idx_comments_post_id ON post_voting_comments(post_id, id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;
        }

        Ok(())
    }

    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}
