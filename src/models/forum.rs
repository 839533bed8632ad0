// Host platform entities as seen by this service.
// Only the fields the access rules need are carried here.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::{PostId, TopicId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub admin: bool,
    pub moderator: bool,
}

impl User {
    pub fn is_staff(&self) -> bool {
        self.admin || self.moderator
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicVisibility {
    Public,
    /// Only the listed users (and staff) may see the topic
    Private { allowed_user_ids: HashSet<UserId> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    pub post_voting_enabled: bool,
    pub closed: bool,
    pub archived: bool,
    pub visibility: TopicVisibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub topic_id: TopicId,
    pub user_id: UserId,
    pub post_number: i32,
    pub reply_to_post_number: Option<i32>,
    pub deleted: bool,
}

impl Post {
    /// A reply to some other specific post. The first post is never a reply.
    pub fn is_reply(&self) -> bool {
        self.reply_to_post_number.is_some() && self.post_number != 1
    }

    /// Comments and votes may only attach to answer-eligible posts
    pub fn is_answer_eligible(&self) -> bool {
        !self.is_reply()
    }
}

/// A post together with the topic it lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContext {
    pub post: Post,
    pub topic: Topic,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(post_number: i32, reply_to_post_number: Option<i32>) -> Post {
        Post {
            id: PostId(1),
            topic_id: TopicId(1),
            user_id: UserId(1),
            post_number,
            reply_to_post_number,
            deleted: false,
        }
    }

    #[test]
    fn test_first_post_is_always_answer_eligible() {
        assert!(post(1, None).is_answer_eligible());
        assert!(post(1, Some(1)).is_answer_eligible());
    }

    #[test]
    fn test_top_level_answers_are_eligible_and_replies_are_not() {
        assert!(post(2, None).is_answer_eligible());
        assert!(post(3, Some(2)).is_reply());
        assert!(!post(3, Some(2)).is_answer_eligible());
    }

    #[test]
    fn test_staff_flags() {
        let mut user = User {
            id: UserId(5),
            username: "sam".into(),
            admin: false,
            moderator: false,
        };
        assert!(!user.is_staff());
        user.moderator = true;
        assert!(user.is_staff());
    }
}
