//! Candidate generation from five independent sources.
//!
//! Sources run concurrently and fail independently: a gateway timeout or a
//! store error in one source is logged and contributes nothing, the other
//! sources still feed the merge. The merged list preserves source order
//! (seed related first, trending and genre exploration last) with set
//! semantics, capped at [`MAX_CANDIDATES`](super::models::MAX_CANDIDATES).

use super::models::MAX_CANDIDATES;
use crate::catalog::TrackCatalog;
use crate::gateway::TrackSearcher;
use crate::interactions::InteractionStore;
use crate::profiles::UserProfile;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

const SEED_TRACKS: usize = 5;
const RELATED_PER_SEED: usize = 10;
const TOP_ARTISTS: usize = 5;
const PER_ARTIST: usize = 12;
const SIMILAR_USERS: usize = 10;
const COLLABORATIVE_CAP: usize = 40;
const COLLABORATIVE_WINDOW_DAYS: u32 = 30;
const TRENDING_CAP: usize = 20;
const TRENDING_WINDOW_DAYS: u32 = 7;
const GENRES: usize = 3;
const PER_GENRE: usize = 10;

pub struct CandidateGenerator {
    catalog: Arc<dyn TrackCatalog>,
    interactions: Arc<dyn InteractionStore>,
    searcher: Arc<dyn TrackSearcher>,
}

impl CandidateGenerator {
    pub fn new(
        catalog: Arc<dyn TrackCatalog>,
        interactions: Arc<dyn InteractionStore>,
        searcher: Arc<dyn TrackSearcher>,
    ) -> Self {
        Self {
            catalog,
            interactions,
            searcher,
        }
    }

    /// Returns up to `MAX_CANDIDATES` deduplicated external track ids.
    pub async fn generate(&self, user_id: &str, profile: &UserProfile) -> Vec<String> {
        let (seed_related, by_artist, collaborative, trending, by_genre) = tokio::join!(
            self.from_seed_tracks(user_id),
            self.from_top_artists(profile),
            self.from_similar_users(user_id),
            self.from_trending(),
            self.from_top_genres(profile),
        );

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        let sources = [
            ("seed_related", seed_related),
            ("top_artists", by_artist),
            ("collaborative", collaborative),
            ("trending", trending),
            ("top_genres", by_genre),
        ];
        for (name, outcome) in sources {
            match outcome {
                Ok(ids) => {
                    debug!("Candidate source {} contributed {} ids", name, ids.len());
                    for id in ids {
                        if merged.len() >= MAX_CANDIDATES {
                            return merged;
                        }
                        if seen.insert(id.clone()) {
                            merged.push(id);
                        }
                    }
                }
                Err(e) => warn!("Candidate source {} failed: {:?}", name, e),
            }
        }
        merged
    }

    /// Source 1: gateway search seeded by the user's most engaged tracks.
    async fn from_seed_tracks(&self, user_id: &str) -> Result<Vec<String>> {
        let seeds = self.interactions.top_tracks(user_id, SEED_TRACKS)?;
        let seed_ids: Vec<String> = seeds.iter().map(|s| s.track_id.clone()).collect();
        let mut tracks = self.catalog.get_tracks(&seed_ids)?;
        // The catalog returns IN-clause scan order; restore the engagement
        // ranking so the strongest seeds search first and survive the cap.
        let rank: HashMap<&str, usize> = seed_ids
            .iter()
            .enumerate()
            .map(|(position, id)| (id.as_str(), position))
            .collect();
        tracks.sort_by_key(|track| rank.get(track.id.as_str()).copied().unwrap_or(usize::MAX));

        let mut ids = Vec::new();
        for track in tracks {
            let query = format!("{} {}", track.artist, track.title);
            match self.searcher.search(&query, RELATED_PER_SEED).await {
                Ok(hits) => ids.extend(hits.into_iter().map(|hit| hit.id)),
                Err(e) => warn!("Related search for {:?} failed: {:?}", query, e),
            }
        }
        Ok(ids)
    }

    /// Source 2: gateway search per top profile artist.
    async fn from_top_artists(&self, profile: &UserProfile) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in profile.top_artists.iter().take(TOP_ARTISTS) {
            match self.searcher.search(&entry.name, PER_ARTIST).await {
                Ok(hits) => ids.extend(hits.into_iter().map(|hit| hit.id)),
                Err(e) => warn!("Artist search for {:?} failed: {:?}", entry.name, e),
            }
        }
        Ok(ids)
    }

    /// Source 3: recent likes of the users with the highest like overlap.
    async fn from_similar_users(&self, user_id: &str) -> Result<Vec<String>> {
        let own_likes: HashSet<String> =
            self.interactions.liked_track_ids(user_id)?.into_iter().collect();
        if own_likes.is_empty() {
            return Ok(vec![]);
        }

        let mut likes_by_user: HashMap<String, HashSet<String>> = HashMap::new();
        for (other, track_id) in self.interactions.like_pairs_excluding(user_id)? {
            likes_by_user.entry(other).or_default().insert(track_id);
        }

        let mut similar: Vec<(String, f64)> = likes_by_user
            .into_iter()
            .filter_map(|(other, theirs)| {
                let common = own_likes.intersection(&theirs).count();
                if common == 0 {
                    return None;
                }
                let similarity = common as f64 / (own_likes.len() + theirs.len()) as f64;
                Some((other, similarity))
            })
            .collect();
        similar.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        similar.truncate(SIMILAR_USERS);

        let neighbor_ids: Vec<String> = similar.into_iter().map(|(id, _)| id).collect();
        if neighbor_ids.is_empty() {
            return Ok(vec![]);
        }

        let already_seen = self.interactions.interacted_track_ids(user_id)?;
        let ids = self
            .interactions
            .recent_likes_of_users(&neighbor_ids, COLLABORATIVE_WINDOW_DAYS)?
            .into_iter()
            .filter(|id| !already_seen.contains(id))
            .take(COLLABORATIVE_CAP)
            .collect();
        Ok(ids)
    }

    /// Source 4: globally trending tracks over the last week.
    async fn from_trending(&self) -> Result<Vec<String>> {
        let trending = self
            .interactions
            .trending(TRENDING_WINDOW_DAYS, TRENDING_CAP)?;
        Ok(trending.into_iter().map(|t| t.track_id).collect())
    }

    /// Source 5: gateway search per top profile genre.
    async fn from_top_genres(&self, profile: &UserProfile) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in profile.top_genres.iter().take(GENRES) {
            let query = format!("{} music", entry.name);
            match self.searcher.search(&query, PER_GENRE).await {
                Ok(hits) => ids.extend(hits.into_iter().map(|hit| hit.id)),
                Err(e) => warn!("Genre search for {:?} failed: {:?}", query, e),
            }
        }
        Ok(ids)
    }
}
