// Post voting domain models

pub mod change_event;
pub mod comment;
pub mod forum;
pub mod vote;

pub use change_event::{ChangeEvent, ChangeKind};
pub use comment::Comment;
pub use forum::{Post, PostContext, Topic, TopicVisibility, User};
pub use vote::{VoteCount, VoteDirection, VoteSummary, Voter};
