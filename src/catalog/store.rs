use super::models::{freshness_score, popularity_score, Track, TrackMetadata, TrackTerms};
use super::schema::CATALOG_MIGRATIONS;
use crate::sqlite_persistence::open_database;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Durable store of track metadata.
///
/// Writes recompute the derived popularity and freshness scores; reads are
/// plain lookups. The catalog grows monotonically, there is no delete path.
pub trait TrackCatalog: Send + Sync {
    /// Insert or replace a track, recomputing derived scores.
    fn upsert_track(&self, meta: TrackMetadata) -> Result<Track>;

    /// Look up a single track by external id.
    fn get_track(&self, id: &str) -> Result<Option<Track>>;

    /// Look up many tracks; unknown ids are simply absent from the result.
    fn get_tracks(&self, ids: &[String]) -> Result<Vec<Track>>;

    /// Number of tracks in the catalog.
    fn tracks_count(&self) -> Result<usize>;

    /// Textual fields of every track, for vocabulary construction.
    fn all_track_terms(&self) -> Result<Vec<TrackTerms>>;
}

pub struct SqliteTrackCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTrackCatalog {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new = !path.exists();
        let conn = open_database(path, "catalog", CATALOG_MIGRATIONS)?;
        if is_new {
            info!("Created new catalog database at {:?}", path);
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
        let genres_json: String = row.get("genres")?;
        let genres: Vec<String> = serde_json::from_str(&genres_json).unwrap_or_default();

        let released_at: Option<String> = row.get("released_at")?;
        let created_at: i64 = row.get("created_at")?;
        let updated_at: i64 = row.get("updated_at")?;

        Ok(Track {
            id: row.get("id")?,
            title: row.get("title")?,
            artist: row.get("artist")?,
            channel_title: row.get("channel_title")?,
            thumbnail: row.get("thumbnail")?,
            genres,
            duration_sec: row.get("duration_sec")?,
            released_at: released_at.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            is_live: row.get("is_live")?,
            is_shorts: row.get("is_shorts")?,
            is_music_category: row.get("is_music_category")?,
            embeddable: row.get("embeddable")?,
            verified: row.get("verified")?,
            view_count: row.get("view_count")?,
            total_plays: row.get("total_plays")?,
            total_likes: row.get("total_likes")?,
            total_skips: row.get("total_skips")?,
            completion_rate: row.get("completion_rate")?,
            popularity_score: row.get("popularity_score")?,
            freshness_score: row.get("freshness_score")?,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp(updated_at, 0).unwrap_or_else(Utc::now),
        })
    }
}

impl TrackCatalog for SqliteTrackCatalog {
    fn upsert_track(&self, meta: TrackMetadata) -> Result<Track> {
        let now = Utc::now();
        let popularity = popularity_score(meta.view_count);
        let freshness = freshness_score(meta.released_at, now);
        let genres_json = serde_json::to_string(&meta.genres)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tracks (
                id, title, artist, channel_title, thumbnail, genres,
                duration_sec, released_at, is_live, is_shorts,
                is_music_category, embeddable, verified, view_count,
                total_plays, total_likes, total_skips, completion_rate,
                popularity_score, freshness_score, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?21
            )
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                channel_title = excluded.channel_title,
                thumbnail = excluded.thumbnail,
                genres = excluded.genres,
                duration_sec = excluded.duration_sec,
                released_at = excluded.released_at,
                is_live = excluded.is_live,
                is_shorts = excluded.is_shorts,
                is_music_category = excluded.is_music_category,
                embeddable = excluded.embeddable,
                verified = excluded.verified,
                view_count = excluded.view_count,
                total_plays = excluded.total_plays,
                total_likes = excluded.total_likes,
                total_skips = excluded.total_skips,
                completion_rate = excluded.completion_rate,
                popularity_score = excluded.popularity_score,
                freshness_score = excluded.freshness_score,
                updated_at = excluded.updated_at",
            params![
                meta.id,
                meta.title,
                meta.artist,
                meta.channel_title,
                meta.thumbnail,
                genres_json,
                meta.duration_sec,
                meta.released_at.map(|d| d.format("%Y-%m-%d").to_string()),
                meta.is_live,
                meta.is_shorts,
                meta.is_music_category,
                meta.embeddable,
                meta.verified,
                meta.view_count,
                meta.total_plays,
                meta.total_likes,
                meta.total_skips,
                meta.completion_rate,
                popularity,
                freshness,
                now.timestamp(),
            ],
        )
        .with_context(|| format!("Failed to upsert track {}", meta.id))?;

        conn.query_row(
            "SELECT * FROM tracks WHERE id = ?1",
            params![meta.id],
            Self::row_to_track,
        )
        .context("Failed to read back upserted track")
    }

    fn get_track(&self, id: &str) -> Result<Option<Track>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM tracks WHERE id = ?1",
            params![id],
            Self::row_to_track,
        )
        .optional()
        .with_context(|| format!("Failed to get track {}", id))
    }

    fn get_tracks(&self, ids: &[String]) -> Result<Vec<Track>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM tracks WHERE id IN ({})", placeholders);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), Self::row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to get tracks")?;
        Ok(rows)
    }

    fn tracks_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn all_track_terms(&self) -> Result<Vec<TrackTerms>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT artist, title, genres FROM tracks")?;
        let rows = stmt
            .query_map([], |row| {
                let genres_json: String = row.get(2)?;
                Ok(TrackTerms {
                    artist: row.get(0)?,
                    title: row.get(1)?,
                    genres: serde_json::from_str(&genres_json).unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read track terms")?;
        Ok(rows)
    }
}
