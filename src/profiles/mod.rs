mod builder;
mod models;
mod schema;
mod store;
mod worker;

pub use builder::ProfileBuilder;
pub use models::{ScoringWeights, TasteEntry, UserProfile, DEFAULT_SKIP_THRESHOLD_SEC};
pub use schema::PROFILES_MIGRATIONS;
pub use store::{ProfileStore, SqliteProfileStore};
pub use worker::{spawn_rebuild_worker, RebuildQueue};
