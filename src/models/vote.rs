use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::{PostId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            other => Err(format!("unknown vote direction '{}'", other)),
        }
    }
}

/// Aggregate over the live votes of one post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub post_id: PostId,
    pub up: i64,
    pub down: i64,
    pub vote_count: i64,
}

impl VoteCount {
    pub fn new(post_id: PostId, up: i64, down: i64) -> Self {
        Self {
            post_id,
            up,
            down,
            vote_count: up - down,
        }
    }
}

/// Vote count plus the viewer's own vote, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSummary {
    #[serde(flatten)]
    pub count: VoteCount,
    pub user_voted_direction: Option<VoteDirection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub user_id: UserId,
    pub direction: VoteDirection,
    pub voted_at: DateTime<Utc>,
}
