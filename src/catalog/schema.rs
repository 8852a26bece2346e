//! Schema for the track catalog database.

/// Version 1 - the tracks table.
const CATALOG_V1: &str = "
CREATE TABLE tracks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    artist TEXT NOT NULL,
    channel_title TEXT NOT NULL DEFAULT '',
    thumbnail TEXT,
    genres TEXT NOT NULL DEFAULT '[]',
    duration_sec INTEGER NOT NULL,
    released_at TEXT,
    is_live INTEGER NOT NULL DEFAULT 0,
    is_shorts INTEGER NOT NULL DEFAULT 0,
    is_music_category INTEGER,
    embeddable INTEGER,
    verified INTEGER NOT NULL DEFAULT 0,
    view_count INTEGER NOT NULL DEFAULT 0,
    total_plays INTEGER NOT NULL DEFAULT 0,
    total_likes INTEGER NOT NULL DEFAULT 0,
    total_skips INTEGER NOT NULL DEFAULT 0,
    completion_rate REAL NOT NULL DEFAULT 0,
    popularity_score REAL NOT NULL DEFAULT 0,
    freshness_score REAL NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX idx_tracks_artist ON tracks(artist);
";

pub const CATALOG_MIGRATIONS: &[&str] = &[CATALOG_V1];
