//! Schema for the user profile database.
//!
//! List-valued fields (taste entries, followed artists, seeds) and the
//! scoring weights are stored as JSON text, mirroring how they travel over
//! the API.

/// Version 1 - one row per user.
const PROFILES_V1: &str = "
CREATE TABLE profiles (
    user_id TEXT PRIMARY KEY,
    top_artists TEXT NOT NULL DEFAULT '[]',
    top_genres TEXT NOT NULL DEFAULT '[]',
    followed_artists TEXT NOT NULL DEFAULT '[]',
    average_completion_rate REAL NOT NULL DEFAULT 0,
    skip_threshold_seconds REAL NOT NULL DEFAULT 30,
    total_interactions INTEGER NOT NULL DEFAULT 0,
    verified_preference REAL NOT NULL DEFAULT 0.5,
    freshness_preference REAL NOT NULL DEFAULT 0.5,
    diversity_preference REAL NOT NULL DEFAULT 0.5,
    seed_artists TEXT NOT NULL DEFAULT '[]',
    onboarding_complete INTEGER NOT NULL DEFAULT 0,
    scoring_weights TEXT NOT NULL,
    last_profile_update INTEGER
);
";

pub const PROFILES_MIGRATIONS: &[&str] = &[PROFILES_V1];
