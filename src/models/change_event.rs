// Change events fanned out to everyone viewing a topic

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{CommentId, PostId, TopicId};
use crate::models::{Comment, Post, VoteCount};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChangeKind {
    #[serde(rename = "post_voting_post_comment_created")]
    CommentCreated { comment: Comment },
    #[serde(rename = "post_voting_post_comment_edited")]
    CommentEdited {
        comment_id: CommentId,
        comment_raw: String,
        comment_cooked: String,
    },
    #[serde(rename = "post_voting_post_comment_trashed")]
    CommentTrashed {
        comment_id: CommentId,
        comments_count: i64,
    },
    #[serde(rename = "post_voting_post_voted")]
    Voted {
        vote_count: i64,
        up: i64,
        down: i64,
    },
}

impl ChangeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::CommentCreated { .. } => "post_voting_post_comment_created",
            ChangeKind::CommentEdited { .. } => "post_voting_post_comment_edited",
            ChangeKind::CommentTrashed { .. } => "post_voting_post_comment_trashed",
            ChangeKind::Voted { .. } => "post_voting_post_voted",
        }
    }
}

/// Serialized flat: `{"id": <post id>, "post_number", "topic_id", "updated_at", "type", ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "id")]
    pub post_id: PostId,
    pub post_number: i32,
    pub topic_id: TopicId,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn for_post(post: &Post, kind: ChangeKind) -> Self {
        Self {
            post_id: post.id,
            post_number: post.post_number,
            topic_id: post.topic_id,
            updated_at: Utc::now(),
            kind,
        }
    }

    pub fn comment_created(post: &Post, comment: Comment) -> Self {
        Self::for_post(post, ChangeKind::CommentCreated { comment })
    }

    pub fn comment_edited(post: &Post, comment: &Comment) -> Self {
        Self::for_post(
            post,
            ChangeKind::CommentEdited {
                comment_id: comment.id,
                comment_raw: comment.raw.clone(),
                comment_cooked: comment.cooked.clone(),
            },
        )
    }

    pub fn comment_trashed(post: &Post, comment_id: CommentId, comments_count: i64) -> Self {
        Self::for_post(
            post,
            ChangeKind::CommentTrashed {
                comment_id,
                comments_count,
            },
        )
    }

    pub fn voted(post: &Post, count: &VoteCount) -> Self {
        Self::for_post(
            post,
            ChangeKind::Voted {
                vote_count: count.vote_count,
                up: count.up,
                down: count.down,
            },
        )
    }
}
