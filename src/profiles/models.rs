use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Skip threshold used until a user has recorded any skips.
pub const DEFAULT_SKIP_THRESHOLD_SEC: f64 = 30.0;

/// How many artists/genres a rebuilt profile retains.
pub const TASTE_LIST_LIMIT: usize = 10;

/// One weighted taste entry (an artist or a genre).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasteEntry {
    pub name: String,
    pub weight: f64,
    pub last_updated: DateTime<Utc>,
}

/// Per-signal blend weights used by the scorer. Every field is clamped to
/// [0, 1] on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub collaborative: f64,
    pub content: f64,
    pub popularity: f64,
    pub freshness: f64,
    pub follow_boost: f64,
    pub dup_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            collaborative: 0.45,
            content: 0.25,
            popularity: 0.10,
            freshness: 0.10,
            follow_boost: 0.15,
            dup_penalty: 0.20,
        }
    }
}

impl ScoringWeights {
    pub fn clamped(mut self) -> Self {
        self.collaborative = self.collaborative.clamp(0.0, 1.0);
        self.content = self.content.clamp(0.0, 1.0);
        self.popularity = self.popularity.clamp(0.0, 1.0);
        self.freshness = self.freshness.clamp(0.0, 1.0);
        self.follow_boost = self.follow_boost.clamp(0.0, 1.0);
        self.dup_penalty = self.dup_penalty.clamp(0.0, 1.0);
        self
    }
}

/// Materialized summary of a user's taste, rebuilt from the interaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,

    pub top_artists: Vec<TasteEntry>,
    pub top_genres: Vec<TasteEntry>,
    pub followed_artists: Vec<String>,

    pub average_completion_rate: f64,
    pub skip_threshold_seconds: f64,
    pub total_interactions: i64,

    pub verified_preference: f64,
    pub freshness_preference: f64,
    pub diversity_preference: f64,

    pub seed_artists: Vec<String>,
    pub onboarding_complete: bool,

    pub scoring_weights: ScoringWeights,

    pub last_profile_update: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            top_artists: vec![],
            top_genres: vec![],
            followed_artists: vec![],
            average_completion_rate: 0.0,
            skip_threshold_seconds: DEFAULT_SKIP_THRESHOLD_SEC,
            total_interactions: 0,
            verified_preference: 0.5,
            freshness_preference: 0.5,
            diversity_preference: 0.5,
            seed_artists: vec![],
            onboarding_complete: false,
            scoring_weights: ScoringWeights::default(),
            last_profile_update: None,
        }
    }

    /// True when the profile was never built or is older than `stale_after`.
    pub fn needs_update(&self, stale_after: Duration) -> bool {
        match self.last_profile_update {
            None => true,
            Some(at) => Utc::now() - at > stale_after,
        }
    }

    pub fn follows_artist(&self, artist: &str) -> bool {
        self.followed_artists
            .iter()
            .any(|followed| followed.eq_ignore_ascii_case(artist))
    }

    /// Affinity weight for an artist, if it is among the user's top artists.
    pub fn artist_weight(&self, artist: &str) -> Option<f64> {
        self.top_artists
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(artist))
            .map(|entry| entry.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_match_global_blend() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.collaborative, 0.45);
        assert_eq!(weights.content, 0.25);
        assert_eq!(weights.popularity, 0.10);
        assert_eq!(weights.freshness, 0.10);
        assert_eq!(weights.follow_boost, 0.15);
        assert_eq!(weights.dup_penalty, 0.20);
    }

    #[test]
    fn test_weights_clamped() {
        let weights = ScoringWeights {
            collaborative: 1.8,
            content: -0.3,
            ..Default::default()
        }
        .clamped();
        assert_eq!(weights.collaborative, 1.0);
        assert_eq!(weights.content, 0.0);
    }

    #[test]
    fn test_needs_update() {
        let mut profile = UserProfile::new("u1");
        assert!(profile.needs_update(Duration::hours(24)));

        profile.last_profile_update = Some(Utc::now());
        assert!(!profile.needs_update(Duration::hours(24)));

        profile.last_profile_update = Some(Utc::now() - Duration::hours(25));
        assert!(profile.needs_update(Duration::hours(24)));
    }

    #[test]
    fn test_follow_lookup_is_case_insensitive() {
        let mut profile = UserProfile::new("u1");
        profile.followed_artists = vec!["Four Tet".to_string()];
        assert!(profile.follows_artist("four tet"));
        assert!(!profile.follows_artist("Caribou"));
    }
}
