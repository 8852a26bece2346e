use super::models::{ScoringWeights, UserProfile};
use super::schema::PROFILES_MIGRATIONS;
use crate::sqlite_persistence::open_database;
use anyhow::{Context, Result};
use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Storage for materialized user profiles, upsert-by-user-id.
pub trait ProfileStore: Send + Sync {
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Idempotent last-writer-wins upsert. Numeric preferences and scoring
    /// weights are clamped to [0, 1] before hitting disk.
    fn upsert_profile(&self, profile: &UserProfile) -> Result<()>;
}

pub struct SqliteProfileStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProfileStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new = !path.exists();
        let conn = open_database(path, "profiles", PROFILES_MIGRATIONS)?;
        if is_new {
            info!("Created new profile database at {:?}", path);
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
        let top_artists: String = row.get("top_artists")?;
        let top_genres: String = row.get("top_genres")?;
        let followed: String = row.get("followed_artists")?;
        let seeds: String = row.get("seed_artists")?;
        let weights: String = row.get("scoring_weights")?;
        let last_update: Option<i64> = row.get("last_profile_update")?;

        Ok(UserProfile {
            user_id: row.get("user_id")?,
            top_artists: serde_json::from_str(&top_artists).unwrap_or_default(),
            top_genres: serde_json::from_str(&top_genres).unwrap_or_default(),
            followed_artists: serde_json::from_str(&followed).unwrap_or_default(),
            average_completion_rate: row.get("average_completion_rate")?,
            skip_threshold_seconds: row.get("skip_threshold_seconds")?,
            total_interactions: row.get("total_interactions")?,
            verified_preference: row.get("verified_preference")?,
            freshness_preference: row.get("freshness_preference")?,
            diversity_preference: row.get("diversity_preference")?,
            seed_artists: serde_json::from_str(&seeds).unwrap_or_default(),
            onboarding_complete: row.get("onboarding_complete")?,
            scoring_weights: serde_json::from_str::<ScoringWeights>(&weights)
                .unwrap_or_default()
                .clamped(),
            last_profile_update: last_update.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        })
    }
}

impl ProfileStore for SqliteProfileStore {
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM profiles WHERE user_id = ?1",
            params![user_id],
            Self::row_to_profile,
        )
        .optional()
        .with_context(|| format!("Failed to get profile for {}", user_id))
    }

    fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        let weights = profile.scoring_weights.clone().clamped();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO profiles (
                user_id, top_artists, top_genres, followed_artists,
                average_completion_rate, skip_threshold_seconds,
                total_interactions, verified_preference, freshness_preference,
                diversity_preference, seed_artists, onboarding_complete,
                scoring_weights, last_profile_update
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(user_id) DO UPDATE SET
                top_artists = excluded.top_artists,
                top_genres = excluded.top_genres,
                followed_artists = excluded.followed_artists,
                average_completion_rate = excluded.average_completion_rate,
                skip_threshold_seconds = excluded.skip_threshold_seconds,
                total_interactions = excluded.total_interactions,
                verified_preference = excluded.verified_preference,
                freshness_preference = excluded.freshness_preference,
                diversity_preference = excluded.diversity_preference,
                seed_artists = excluded.seed_artists,
                onboarding_complete = excluded.onboarding_complete,
                scoring_weights = excluded.scoring_weights,
                last_profile_update = excluded.last_profile_update",
            params![
                profile.user_id,
                serde_json::to_string(&profile.top_artists)?,
                serde_json::to_string(&profile.top_genres)?,
                serde_json::to_string(&profile.followed_artists)?,
                profile.average_completion_rate,
                profile.skip_threshold_seconds,
                profile.total_interactions,
                profile.verified_preference.clamp(0.0, 1.0),
                profile.freshness_preference.clamp(0.0, 1.0),
                profile.diversity_preference.clamp(0.0, 1.0),
                serde_json::to_string(&profile.seed_artists)?,
                profile.onboarding_complete,
                serde_json::to_string(&weights)?,
                profile.last_profile_update.map(|at| at.timestamp()),
            ],
        )
        .with_context(|| format!("Failed to upsert profile for {}", profile.user_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::models::TasteEntry;
    use chrono::Utc;
    use tempfile::TempDir;

    struct TestProfiles {
        store: SqliteProfileStore,
        _temp_dir: TempDir, // Keep temp dir alive
    }

    fn create_test_store() -> TestProfiles {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteProfileStore::new(temp_dir.path().join("profiles.db")).unwrap();
        TestProfiles {
            store,
            _temp_dir: temp_dir,
        }
    }

    #[test]
    fn test_upsert_and_get_round_trip() {
        let test = create_test_store();
        assert!(test.store.get_profile("u1").unwrap().is_none());

        let mut profile = UserProfile::new("u1");
        profile.top_artists = vec![TasteEntry {
            name: "Björk".to_string(),
            weight: 12.5,
            last_updated: Utc::now(),
        }];
        profile.followed_artists = vec!["Björk".to_string()];
        profile.last_profile_update = Some(Utc::now());
        test.store.upsert_profile(&profile).unwrap();

        let loaded = test.store.get_profile("u1").unwrap().unwrap();
        assert_eq!(loaded.top_artists.len(), 1);
        assert_eq!(loaded.top_artists[0].name, "Björk");
        assert!(loaded.last_profile_update.is_some());
    }

    #[test]
    fn test_upsert_is_idempotent_and_clamps() {
        let test = create_test_store();
        let mut profile = UserProfile::new("u1");
        profile.verified_preference = 3.0;
        profile.scoring_weights.dup_penalty = -1.0;

        test.store.upsert_profile(&profile).unwrap();
        test.store.upsert_profile(&profile).unwrap();

        let loaded = test.store.get_profile("u1").unwrap().unwrap();
        assert_eq!(loaded.verified_preference, 1.0);
        assert_eq!(loaded.scoring_weights.dup_penalty, 0.0);
    }
}
