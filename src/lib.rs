//! Mixwheel Recommendation Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog;
pub mod config;
pub mod gateway;
pub mod interactions;
pub mod profiles;
pub mod recommend;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog::{SqliteTrackCatalog, TrackCatalog};
pub use interactions::{InteractionStore, SqliteInteractionStore};
pub use profiles::{ProfileBuilder, ProfileStore, SqliteProfileStore};
pub use recommend::{RecommendationEngine, RecommendationRequest};
pub use server::{run_server, RequestsLoggingLevel};

/// Short git commit hash embedded at build time.
pub fn git_hash() -> &'static str {
    env!("GIT_HASH")
}
