use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub post_voting: PostVotingConfig,
    pub comments: CommentConfig,
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostVotingConfig {
    /// Site-wide switch. When off every operation is refused.
    pub enabled: bool,
}

/// Longest edit window chrono can represent
pub const MAX_EDIT_WINDOW_SECS: u64 = (i64::MAX / 1000) as u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub limit_per_post: u32,
    /// Seconds after creation during which the author may still edit. 0 = no limit.
    pub edit_window_secs: u64,
    pub author_can_edit: bool,
    pub author_can_delete: bool,
    pub staff_can_edit: bool,
    pub staff_can_delete: bool,
    pub broadcast_created: bool,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            min_length: 5,
            max_length: 600,
            limit_per_post: 20,
            edit_window_secs: 0,
            author_can_edit: true,
            author_can_delete: true,
            staff_can_edit: true,
            staff_can_delete: true,
            broadcast_created: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub workers: usize,
    pub max_delivery_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_delivery_attempts: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let comment_defaults = CommentConfig::default();
        let broadcast_defaults = BroadcastConfig::default();

        let config = Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/post_voting.db".to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
                seed_demo_data: env_or("SEED_DEMO_DATA", false),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("SERVER_PORT", 3000),
            },
            post_voting: PostVotingConfig {
                enabled: env_or("POST_VOTING_ENABLED", true),
            },
            comments: CommentConfig {
                min_length: env_or("COMMENT_MIN_LENGTH", comment_defaults.min_length),
                max_length: env_or("COMMENT_MAX_LENGTH", comment_defaults.max_length),
                limit_per_post: env_or("COMMENT_LIMIT_PER_POST", comment_defaults.limit_per_post),
                edit_window_secs: env_or("COMMENT_EDIT_WINDOW_SECS", comment_defaults.edit_window_secs),
                author_can_edit: env_or("AUTHOR_CAN_EDIT_COMMENT", comment_defaults.author_can_edit),
                author_can_delete: env_or(
                    "AUTHOR_CAN_DELETE_COMMENT",
                    comment_defaults.author_can_delete,
                ),
                staff_can_edit: env_or("STAFF_CAN_EDIT_COMMENT", comment_defaults.staff_can_edit),
                staff_can_delete: env_or("STAFF_CAN_DELETE_COMMENT", comment_defaults.staff_can_delete),
                broadcast_created: env_or(
                    "BROADCAST_COMMENT_CREATED",
                    comment_defaults.broadcast_created,
                ),
            },
            broadcast: BroadcastConfig {
                workers: env_or("BROADCAST_WORKERS", broadcast_defaults.workers),
                max_delivery_attempts: env_or(
                    "BROADCAST_MAX_ATTEMPTS",
                    broadcast_defaults.max_delivery_attempts,
                ),
                retry_delay_ms: env_or("BROADCAST_RETRY_DELAY_MS", broadcast_defaults.retry_delay_ms),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Configuration used by tests: in-memory database, defaults everywhere else
    pub fn for_testing() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
                seed_demo_data: false,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            post_voting: PostVotingConfig { enabled: true },
            comments: CommentConfig::default(),
            broadcast: BroadcastConfig {
                workers: 2,
                max_delivery_attempts: 3,
                retry_delay_ms: 5,
            },
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.comments.min_length > self.comments.max_length {
            anyhow::bail!(
                "COMMENT_MIN_LENGTH ({}) exceeds COMMENT_MAX_LENGTH ({})",
                self.comments.min_length,
                self.comments.max_length
            );
        }
        if self.comments.edit_window_secs > MAX_EDIT_WINDOW_SECS {
            anyhow::bail!(
                "COMMENT_EDIT_WINDOW_SECS ({}) exceeds the maximum of {}",
                self.comments.edit_window_secs,
                MAX_EDIT_WINDOW_SECS
            );
        }
        if self.broadcast.workers == 0 {
            anyhow::bail!("BROADCAST_WORKERS must be at least 1");
        }
        if self.broadcast.max_delivery_attempts == 0 {
            anyhow::bail!("BROADCAST_MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testing_config_is_valid() {
        let config = Config::for_testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.comments.max_length, 600);
        assert!(!config.comments.broadcast_created);
    }

    #[test]
    fn test_validate_rejects_inverted_length_bounds() {
        let mut config = Config::for_testing();
        config.comments.min_length = 700;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_worker_pool() {
        let mut config = Config::for_testing();
        config.broadcast.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_edit_window() {
        let mut config = Config::for_testing();
        config.comments.edit_window_secs = 10_000_000_000_000_000;
        assert!(config.validate().is_err());

        config.comments.edit_window_secs = u64::MAX;
        assert!(config.validate().is_err());

        config.comments.edit_window_secs = MAX_EDIT_WINDOW_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_address() {
        let mut config = Config::for_testing();
        config.server.port = 8080;
        assert_eq!(config.server_address(), "127.0.0.1:8080");
    }
}
