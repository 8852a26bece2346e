use super::models::{TasteEntry, UserProfile, DEFAULT_SKIP_THRESHOLD_SEC};
use super::models::TASTE_LIST_LIMIT;
use super::store::ProfileStore;
use crate::catalog::TrackCatalog;
use crate::interactions::InteractionStore;
use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Derives a user's profile from the interaction log and the catalog.
///
/// Rebuilds are idempotent upserts: two racing rebuilds for the same user
/// converge to the last writer's state. Fields the user sets through the API
/// (follows, preferences, weights, seeds) survive rebuilds untouched.
pub struct ProfileBuilder {
    interactions: Arc<dyn InteractionStore>,
    catalog: Arc<dyn TrackCatalog>,
    profiles: Arc<dyn ProfileStore>,
}

#[derive(Default)]
struct ArtistAccumulator {
    likes: i64,
    finishes: i64,
    plays: i64,
    unique_tracks: i64,
}

impl ArtistAccumulator {
    /// `3×likes + 2×finishes + plays + 0.5×unique_tracks`
    fn weight(&self) -> f64 {
        3.0 * self.likes as f64
            + 2.0 * self.finishes as f64
            + self.plays as f64
            + 0.5 * self.unique_tracks as f64
    }
}

impl ProfileBuilder {
    pub fn new(
        interactions: Arc<dyn InteractionStore>,
        catalog: Arc<dyn TrackCatalog>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            interactions,
            catalog,
            profiles,
        }
    }

    /// Rebuild and persist the profile for one user, returning the new state.
    pub fn rebuild(&self, user_id: &str) -> Result<UserProfile> {
        let mut profile = self
            .profiles
            .get_profile(user_id)?
            .unwrap_or_else(|| UserProfile::new(user_id));

        let engagement = self.interactions.track_engagement(user_id)?;
        let track_ids: Vec<String> = engagement.iter().map(|e| e.track_id.clone()).collect();
        let tracks = self.catalog.get_tracks(&track_ids)?;
        let tracks_by_id: HashMap<&str, _> =
            tracks.iter().map(|t| (t.id.as_str(), t)).collect();

        let now = Utc::now();
        let mut artists: HashMap<String, ArtistAccumulator> = HashMap::new();
        let mut genres: HashMap<String, f64> = HashMap::new();

        for stat in &engagement {
            let Some(track) = tracks_by_id.get(stat.track_id.as_str()) else {
                // Interactions can reference tracks never probed into the
                // catalog; they contribute nothing to taste lists.
                continue;
            };
            let entry = artists.entry(track.artist.clone()).or_default();
            entry.likes += stat.likes;
            entry.finishes += stat.finishes;
            entry.plays += stat.plays;
            entry.unique_tracks += 1;

            for genre in &track.genres {
                *genres.entry(genre.clone()).or_default() += stat.affinity_weight();
            }
        }

        profile.top_artists = top_entries(
            artists
                .into_iter()
                .map(|(name, acc)| (name, acc.weight()))
                .collect(),
            now,
        );
        profile.top_genres = top_entries(genres.into_iter().collect(), now);

        let stats = self.interactions.behavioral_stats(user_id)?;
        profile.average_completion_rate = stats.average_completion_rate.unwrap_or(0.0);
        profile.skip_threshold_seconds = stats
            .average_skip_position_sec
            .unwrap_or(DEFAULT_SKIP_THRESHOLD_SEC);
        profile.total_interactions = stats.total_interactions;
        profile.last_profile_update = Some(now);

        self.profiles.upsert_profile(&profile)?;
        debug!(
            "Rebuilt profile for {}: {} artists, {} genres, {} interactions",
            user_id,
            profile.top_artists.len(),
            profile.top_genres.len(),
            profile.total_interactions
        );
        Ok(profile)
    }
}

fn top_entries(weighted: Vec<(String, f64)>, now: chrono::DateTime<Utc>) -> Vec<TasteEntry> {
    let mut weighted = weighted;
    weighted.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    weighted
        .into_iter()
        .take(TASTE_LIST_LIMIT)
        .filter(|(_, weight)| *weight > 0.0)
        .map(|(name, weight)| TasteEntry {
            name,
            weight,
            last_updated: now,
        })
        .collect()
}
