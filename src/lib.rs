// Post Voting - comments and single up/down votes on forum posts, with live topic updates

// Core types and primitives
pub mod core;

// Configuration and errors
pub mod config;
pub mod error;

// Domain models and access rules
pub mod models;
pub mod privacy;

// Persistence, host platform seams and event fan-out
pub mod infrastructure;

// Operations and HTTP surface
pub mod services;
pub mod voting_interface;
pub mod app_state;

pub mod data_seeder;

// Re-exports for convenience
pub use error::{AppError, AppResult};
