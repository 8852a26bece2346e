mod models;
mod schema;
mod store;

pub use models::{
    BehavioralStats, Interaction, InteractionEvent, NewInteraction, TrackEngagement,
    TrendingTrack,
};
pub use schema::INTERACTIONS_MIGRATIONS;
pub use store::{InteractionStore, SqliteInteractionStore};
