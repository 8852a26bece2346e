mod models;
mod schema;
mod store;

pub use models::{
    freshness_score, popularity_score, Track, TrackMetadata, TrackTerms,
    FRESHNESS_HALF_LIFE_DAYS, UNKNOWN_RELEASE_AGE_DAYS,
};
pub use schema::CATALOG_MIGRATIONS;
pub use store::{SqliteTrackCatalog, TrackCatalog};
