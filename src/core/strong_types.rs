// Strong Types - newtype identifiers for the forum entities this service touches
// Keeps user, topic, post and comment ids from being swapped at call sites

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares an `i64`-backed identifier that binds to SQLite as a plain integer
macro_rules! forum_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw ID value
            pub fn value(self) -> i64 {
                self.0
            }

            /// Check if this is a valid ID (positive)
            pub fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

forum_id!(
    /// Host platform user
    UserId
);
forum_id!(
    /// Host platform topic
    TopicId
);
forum_id!(
    /// Host platform post
    PostId
);
forum_id!(
    /// Comment identifier. Doubles as the pagination cursor, so it only ever grows.
    CommentId
);

impl CommentId {
    /// Cursor value that precedes every comment
    pub const START: CommentId = CommentId(0);
}
