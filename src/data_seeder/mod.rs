// Demo data for local runs: a few users with fixed session tokens and one voting topic

use sqlx::{sqlite::SqlitePool, Row};
use tracing::info;

use crate::{
    error::AppResult,
    infrastructure::{NewTopic, SqliteHostPlatform},
};

/// (username, admin, moderator, session token)
const DEMO_USERS: [(&str, bool, bool, &str); 3] = [
    ("alice", false, false, "alice-token"),
    ("bob", false, false, "bob-token"),
    ("mod", false, true, "mod-token"),
];

/// Seed demo users, a voting-enabled topic with two answers and a reply, and a plain topic.
/// Does nothing if users already exist. Returns whether anything was written.
pub async fn seed_demo_data(pool: &SqlitePool) -> AppResult<bool> {
    let existing: i64 = sqlx::query("SELECT COUNT(*) AS count FROM users")
        .fetch_one(pool)
        .await?
        .get("count");
    if existing > 0 {
        info!("Database already has {} users, skipping demo data", existing);
        return Ok(false);
    }

    let host = SqliteHostPlatform::new(pool.clone());

    let mut users = Vec::with_capacity(DEMO_USERS.len());
    for (username, admin, moderator, token) in DEMO_USERS {
        users.push(host.create_user(username, admin, moderator, Some(token)).await?);
        info!("Demo user {} -> Authorization: Bearer {}", username, token);
    }

    let voting = host
        .create_topic(NewTopic {
            title: "How should we index the comments table?".to_string(),
            post_voting_enabled: true,
            ..Default::default()
        })
        .await?;
    let question = host.create_post(voting.id, users[0].id, None).await?;
    let answer = host.create_post(voting.id, users[1].id, None).await?;
    host.create_post(voting.id, users[0].id, Some(answer.post_number)).await?;

    let plain = host
        .create_topic(NewTopic {
            title: "Introductions".to_string(),
            ..Default::default()
        })
        .await?;
    host.create_post(plain.id, users[2].id, None).await?;

    info!(
        "Seeded voting topic {} (posts {} and {}) and plain topic {}",
        voting.id, question.id, answer.id, plain.id
    );
    Ok(true)
}
