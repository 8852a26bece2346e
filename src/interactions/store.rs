use super::models::{
    BehavioralStats, Interaction, InteractionEvent, NewInteraction, TrackEngagement, TrendingTrack,
};
use super::schema::INTERACTIONS_MIGRATIONS;
use crate::sqlite_persistence::open_database;
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// Append-only record of user actions, plus the grouped-aggregation queries
/// the profile builder and candidate generator read from it.
pub trait InteractionStore: Send + Sync {
    /// Append one interaction. The returned record carries the generated id,
    /// timestamp and time-of-day context.
    fn append(&self, new: NewInteraction) -> Result<Interaction>;

    /// Most recent interactions for a user, newest first.
    fn recent_interactions(&self, user_id: &str, limit: usize) -> Result<Vec<Interaction>>;

    /// A user's tracks ranked by seed weight
    /// (`3×likes + 2×finishes + plays + 2×avg_completion`), recency breaking ties.
    fn top_tracks(&self, user_id: &str, limit: usize) -> Result<Vec<TrackEngagement>>;

    /// Per-track engagement for every track the user touched.
    fn track_engagement(&self, user_id: &str) -> Result<Vec<TrackEngagement>>;

    /// Every track id the user has any interaction with.
    fn interacted_track_ids(&self, user_id: &str) -> Result<HashSet<String>>;

    /// Track ids the user liked, all time.
    fn liked_track_ids(&self, user_id: &str) -> Result<Vec<String>>;

    /// All (user_id, track_id) like pairs from other users, for overlap
    /// similarity.
    fn like_pairs_excluding(&self, user_id: &str) -> Result<Vec<(String, String)>>;

    /// Tracks liked by any of the given users within the window, newest first.
    fn recent_likes_of_users(&self, user_ids: &[String], window_days: u32) -> Result<Vec<String>>;

    /// Globally trending tracks over the window, by
    /// `plays + 2×likes + 3×unique_listeners`.
    fn trending(&self, window_days: u32, limit: usize) -> Result<Vec<TrendingTrack>>;

    /// Interaction counts grouped by event kind over the window.
    fn activity_counts(
        &self,
        user_id: &str,
        window_days: u32,
    ) -> Result<HashMap<InteractionEvent, i64>>;

    /// Whole-log behavioral scalars for one user.
    fn behavioral_stats(&self, user_id: &str) -> Result<BehavioralStats>;
}

pub struct SqliteInteractionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteInteractionStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new = !path.exists();
        let conn = open_database(path, "interactions", INTERACTIONS_MIGRATIONS)?;
        if is_new {
            info!("Created new interaction log at {:?}", path);
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn window_cutoff(window_days: u32) -> i64 {
        Utc::now().timestamp() - window_days as i64 * 24 * 60 * 60
    }

    fn row_to_interaction(row: &rusqlite::Row) -> rusqlite::Result<Interaction> {
        let event_str: String = row.get("event")?;
        let created_at: i64 = row.get("created_at")?;
        Ok(Interaction {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            track_id: row.get("track_id")?,
            // Unknown kinds cannot be written; fall back defensively on read.
            event: InteractionEvent::parse(&event_str).unwrap_or(InteractionEvent::Play),
            value: row.get("value")?,
            duration_played_sec: row.get("duration_played_sec")?,
            track_duration_sec: row.get("track_duration_sec")?,
            session_id: row.get("session_id")?,
            source: row.get("source")?,
            previous_track_id: row.get("previous_track_id")?,
            playlist_id: row.get("playlist_id")?,
            search_query: row.get("search_query")?,
            hour_of_day: row.get::<_, i64>("hour_of_day")? as u8,
            day_of_week: row.get::<_, i64>("day_of_week")? as u8,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        })
    }

    fn row_to_engagement(row: &rusqlite::Row) -> rusqlite::Result<TrackEngagement> {
        let last_at: i64 = row.get("last_at")?;
        Ok(TrackEngagement {
            track_id: row.get("track_id")?,
            plays: row.get("plays")?,
            finishes: row.get("finishes")?,
            likes: row.get("likes")?,
            avg_completion: row.get("avg_completion")?,
            last_interaction: DateTime::from_timestamp(last_at, 0).unwrap_or_else(Utc::now),
        })
    }
}

const ENGAGEMENT_SELECT: &str = "
    SELECT track_id,
           SUM(CASE WHEN event = 'play' THEN 1 ELSE 0 END) AS plays,
           SUM(CASE WHEN event = 'finish' THEN 1 ELSE 0 END) AS finishes,
           SUM(CASE WHEN event = 'like' THEN 1 ELSE 0 END) AS likes,
           AVG(CASE WHEN value IS NOT NULL THEN value END) AS avg_completion,
           MAX(created_at) AS last_at
    FROM interactions
    WHERE user_id = ?1
    GROUP BY track_id";

impl InteractionStore for SqliteInteractionStore {
    fn append(&self, new: NewInteraction) -> Result<Interaction> {
        let now = Utc::now();
        let interaction = Interaction {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            track_id: new.track_id,
            event: new.event,
            value: new.value.map(|v| v.clamp(0.0, 1.0)),
            duration_played_sec: new.duration_played_sec,
            track_duration_sec: new.track_duration_sec,
            session_id: new.session_id,
            source: new.source,
            previous_track_id: new.previous_track_id,
            playlist_id: new.playlist_id,
            search_query: new.search_query,
            hour_of_day: now.hour() as u8,
            day_of_week: now.weekday().num_days_from_monday() as u8,
            created_at: now,
        };

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO interactions (
                id, user_id, track_id, event, value, duration_played_sec,
                track_duration_sec, session_id, source, previous_track_id,
                playlist_id, search_query, hour_of_day, day_of_week, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                interaction.id,
                interaction.user_id,
                interaction.track_id,
                interaction.event.as_str(),
                interaction.value,
                interaction.duration_played_sec,
                interaction.track_duration_sec,
                interaction.session_id,
                interaction.source,
                interaction.previous_track_id,
                interaction.playlist_id,
                interaction.search_query,
                interaction.hour_of_day as i64,
                interaction.day_of_week as i64,
                interaction.created_at.timestamp(),
            ],
        )
        .context("Failed to append interaction")?;

        Ok(interaction)
    }

    fn recent_interactions(&self, user_id: &str, limit: usize) -> Result<Vec<Interaction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM interactions WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit], Self::row_to_interaction)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read interactions")?;
        Ok(rows)
    }

    fn top_tracks(&self, user_id: &str, limit: usize) -> Result<Vec<TrackEngagement>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "{}
             ORDER BY 3.0 * likes + 2.0 * finishes + plays
                      + 2.0 * COALESCE(avg_completion, 0) DESC,
                      last_at DESC
             LIMIT ?2",
            ENGAGEMENT_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user_id, limit], Self::row_to_engagement)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to aggregate top tracks")?;
        Ok(rows)
    }

    fn track_engagement(&self, user_id: &str) -> Result<Vec<TrackEngagement>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(ENGAGEMENT_SELECT)?;
        let rows = stmt
            .query_map(params![user_id], Self::row_to_engagement)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to aggregate track engagement")?;
        Ok(rows)
    }

    fn interacted_track_ids(&self, user_id: &str) -> Result<HashSet<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT DISTINCT track_id FROM interactions WHERE user_id = ?1")?;
        let rows = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()
            .context("Failed to read interacted track ids")?;
        Ok(rows)
    }

    fn liked_track_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT track_id FROM interactions
             WHERE user_id = ?1 AND event = 'like'",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read liked track ids")?;
        Ok(rows)
    }

    fn like_pairs_excluding(&self, user_id: &str) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT user_id, track_id FROM interactions
             WHERE event = 'like' AND user_id != ?1",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read like pairs")?;
        Ok(rows)
    }

    fn recent_likes_of_users(&self, user_ids: &[String], window_days: u32) -> Result<Vec<String>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        let cutoff = Self::window_cutoff(window_days);
        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; user_ids.len()].join(", ");
        let sql = format!(
            "SELECT track_id, MAX(created_at) AS last_at FROM interactions
             WHERE event = 'like' AND created_at >= ? AND user_id IN ({})
             GROUP BY track_id
             ORDER BY last_at DESC",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut bindings: Vec<&dyn rusqlite::ToSql> = vec![&cutoff];
        for id in user_ids {
            bindings.push(id);
        }
        let rows = stmt
            .query_map(bindings.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read recent likes")?;
        Ok(rows)
    }

    fn trending(&self, window_days: u32, limit: usize) -> Result<Vec<TrendingTrack>> {
        let cutoff = Self::window_cutoff(window_days);
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT track_id,
                    SUM(CASE WHEN event = 'play' THEN 1 ELSE 0 END) AS plays,
                    SUM(CASE WHEN event = 'like' THEN 1 ELSE 0 END) AS likes,
                    COUNT(DISTINCT user_id) AS unique_listeners
             FROM interactions
             WHERE created_at >= ?1
             GROUP BY track_id
             ORDER BY plays + 2 * likes + 3 * unique_listeners DESC, track_id ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![cutoff, limit], |row| {
                let plays: i64 = row.get("plays")?;
                let likes: i64 = row.get("likes")?;
                let unique_listeners: i64 = row.get("unique_listeners")?;
                Ok(TrendingTrack {
                    track_id: row.get("track_id")?,
                    plays,
                    likes,
                    unique_listeners,
                    trend_score: plays + 2 * likes + 3 * unique_listeners,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to aggregate trending tracks")?;
        Ok(rows)
    }

    fn activity_counts(
        &self,
        user_id: &str,
        window_days: u32,
    ) -> Result<HashMap<InteractionEvent, i64>> {
        let cutoff = Self::window_cutoff(window_days);
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT event, COUNT(*) FROM interactions
             WHERE user_id = ?1 AND created_at >= ?2
             GROUP BY event",
        )?;
        let mut counts = HashMap::new();
        let rows = stmt.query_map(params![user_id, cutoff], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (event_str, count) = row?;
            if let Some(event) = InteractionEvent::parse(&event_str) {
                counts.insert(event, count);
            }
        }
        Ok(counts)
    }

    fn behavioral_stats(&self, user_id: &str) -> Result<BehavioralStats> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT
                AVG(CASE WHEN event IN ('play', 'finish') THEN value END),
                AVG(CASE WHEN event = 'skip' THEN duration_played_sec END),
                COUNT(*)
             FROM interactions
             WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(BehavioralStats {
                    average_completion_rate: row.get(0)?,
                    average_skip_position_sec: row.get(1)?,
                    total_interactions: row.get(2)?,
                })
            },
        )
        .context("Failed to compute behavioral stats")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct TestLog {
        store: SqliteInteractionStore,
        _temp_dir: TempDir, // Keep temp dir alive
    }

    fn create_test_log() -> TestLog {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteInteractionStore::new(temp_dir.path().join("interactions.db")).unwrap();
        TestLog {
            store,
            _temp_dir: temp_dir,
        }
    }

    fn record(store: &SqliteInteractionStore, user: &str, track: &str, event: InteractionEvent) {
        store
            .append(NewInteraction::new(user, track, event))
            .unwrap();
    }

    #[test]
    fn test_append_round_trip() {
        let test = create_test_log();
        let mut new = NewInteraction::new("u1", "t1", InteractionEvent::Like);
        new.session_id = Some("s1".to_string());
        new.value = Some(0.8);
        let written = test.store.append(new).unwrap();

        let read_back = test.store.recent_interactions("u1", 10).unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].id, written.id);
        assert_eq!(read_back[0].event, InteractionEvent::Like);
        assert_eq!(read_back[0].session_id.as_deref(), Some("s1"));
        assert!(read_back[0].created_at.timestamp() > 0);
    }

    #[test]
    fn test_value_clamped_on_append() {
        let test = create_test_log();
        let mut new = NewInteraction::new("u1", "t1", InteractionEvent::Finish);
        new.value = Some(1.7);
        let written = test.store.append(new).unwrap();
        assert_eq!(written.value, Some(1.0));
    }

    #[test]
    fn test_top_tracks_weighting() {
        let test = create_test_log();
        // t1: one like (weight 3); t2: one play + one finish (weight 3)...
        // then one more play makes t2 win.
        record(&test.store, "u1", "t1", InteractionEvent::Like);
        record(&test.store, "u1", "t2", InteractionEvent::Play);
        record(&test.store, "u1", "t2", InteractionEvent::Finish);
        record(&test.store, "u1", "t2", InteractionEvent::Play);

        let top = test.store.top_tracks("u1", 5).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].track_id, "t2");
        assert!(top[0].seed_weight() > top[1].seed_weight());
    }

    #[test]
    fn test_trending_formula() {
        let test = create_test_log();
        // t1: 2 plays from one listener -> 2 + 3 = 5
        record(&test.store, "u1", "t1", InteractionEvent::Play);
        record(&test.store, "u1", "t1", InteractionEvent::Play);
        // t2: 1 like from each of two listeners -> 4 + 6 = 10
        record(&test.store, "u1", "t2", InteractionEvent::Like);
        record(&test.store, "u2", "t2", InteractionEvent::Like);

        let trending = test.store.trending(7, 10).unwrap();
        assert_eq!(trending[0].track_id, "t2");
        assert_eq!(trending[0].trend_score, 10);
        assert_eq!(trending[1].track_id, "t1");
        assert_eq!(trending[1].trend_score, 5);
    }

    #[test]
    fn test_like_pairs_exclude_requesting_user() {
        let test = create_test_log();
        record(&test.store, "u1", "t1", InteractionEvent::Like);
        record(&test.store, "u2", "t1", InteractionEvent::Like);
        record(&test.store, "u2", "t2", InteractionEvent::Like);

        let pairs = test.store.like_pairs_excluding("u1").unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|(user, _)| user == "u2"));
    }

    #[test]
    fn test_activity_counts_by_event() {
        let test = create_test_log();
        record(&test.store, "u1", "t1", InteractionEvent::Play);
        record(&test.store, "u1", "t2", InteractionEvent::Play);
        record(&test.store, "u1", "t1", InteractionEvent::Like);
        record(&test.store, "u2", "t1", InteractionEvent::Play);

        let counts = test.store.activity_counts("u1", 30).unwrap();
        assert_eq!(counts.get(&InteractionEvent::Play), Some(&2));
        assert_eq!(counts.get(&InteractionEvent::Like), Some(&1));
        assert_eq!(counts.get(&InteractionEvent::Skip), None);
    }

    #[test]
    fn test_behavioral_stats() {
        let test = create_test_log();
        let mut finish = NewInteraction::new("u1", "t1", InteractionEvent::Finish);
        finish.value = Some(1.0);
        test.store.append(finish).unwrap();
        let mut play = NewInteraction::new("u1", "t2", InteractionEvent::Play);
        play.value = Some(0.5);
        test.store.append(play).unwrap();
        let mut skip = NewInteraction::new("u1", "t3", InteractionEvent::Skip);
        skip.duration_played_sec = Some(20.0);
        test.store.append(skip).unwrap();

        let stats = test.store.behavioral_stats("u1").unwrap();
        assert_eq!(stats.total_interactions, 3);
        assert!((stats.average_completion_rate.unwrap() - 0.75).abs() < 1e-9);
        assert!((stats.average_skip_position_sec.unwrap() - 20.0).abs() < 1e-9);
    }
}
