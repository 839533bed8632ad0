// Infrastructure - persistence, host platform seams, rendering and event fan-out
pub mod database;         // SQLite pool and schema
pub mod host_platform;    // Session and post/topic lookup
pub mod renderer;         // Raw -> cooked comment text
pub mod vote_store;       // One vote per (user, post)
pub mod comment_store;    // Append-only comment log
pub mod message_bus;      // Per-topic delivery to subscribed sessions
pub mod broadcaster;      // Background fan-out workers
pub mod viewer;           // Viewer context
pub mod middleware;       // Viewer context middleware and extractor

pub use broadcaster::{BroadcastStats, ChangeBroadcaster};
pub use comment_store::CommentStore;
pub use database::Database;
pub use host_platform::{HostPlatform, NewTopic, SqliteHostPlatform};
pub use message_bus::{DeliveryChannel, TopicMessageBus};
pub use renderer::{BasicRenderer, TextRenderer};
pub use viewer::ViewerContext;
pub use vote_store::VoteStore;
