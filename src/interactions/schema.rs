//! Schema for the append-only interaction log database.

/// Version 1 - the interactions table.
///
/// The log is append-only: no UPDATE or DELETE is ever issued against it.
const INTERACTIONS_V1: &str = "
CREATE TABLE interactions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    track_id TEXT NOT NULL,
    event TEXT NOT NULL,
    value REAL,
    duration_played_sec REAL,
    track_duration_sec REAL,
    session_id TEXT,
    source TEXT,
    previous_track_id TEXT,
    playlist_id TEXT,
    search_query TEXT,
    hour_of_day INTEGER NOT NULL,
    day_of_week INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX idx_interactions_user ON interactions(user_id, created_at DESC);
CREATE INDEX idx_interactions_track ON interactions(track_id);
CREATE INDEX idx_interactions_event_time ON interactions(event, created_at);
";

pub const INTERACTIONS_MIGRATIONS: &[&str] = &[INTERACTIONS_V1];
