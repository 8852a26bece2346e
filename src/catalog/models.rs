use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Divisor applied to `ln(view_count + 1)` before capping at 1.0.
const POPULARITY_LOG_SCALE: f64 = 15.0;

/// Freshness halves every 90 days.
pub const FRESHNESS_HALF_LIFE_DAYS: f64 = 90.0;

/// Tracks with no known release date are treated as ten years old.
pub const UNKNOWN_RELEASE_AGE_DAYS: f64 = 3650.0;

/// A track in the catalog.
///
/// `popularity_score` and `freshness_score` are derived values. The store
/// recomputes them on every write; they are never accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub channel_title: String,
    pub thumbnail: Option<String>,
    pub genres: Vec<String>,
    pub duration_sec: i64,
    pub released_at: Option<NaiveDate>,

    pub is_live: bool,
    pub is_shorts: bool,
    /// None means the upstream source did not report a category.
    pub is_music_category: Option<bool>,
    /// None means embeddability is unknown (treated as embeddable).
    pub embeddable: Option<bool>,
    pub verified: bool,

    pub view_count: i64,
    pub total_plays: i64,
    pub total_likes: i64,
    pub total_skips: i64,
    pub completion_rate: f64,

    pub popularity_score: f64,
    pub freshness_score: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable track fields, as accepted by `TrackCatalog::upsert_track`.
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub channel_title: String,
    pub thumbnail: Option<String>,
    pub genres: Vec<String>,
    pub duration_sec: i64,
    pub released_at: Option<NaiveDate>,
    pub is_live: bool,
    pub is_shorts: bool,
    pub is_music_category: Option<bool>,
    pub embeddable: Option<bool>,
    pub verified: bool,
    pub view_count: i64,
    pub total_plays: i64,
    pub total_likes: i64,
    pub total_skips: i64,
    pub completion_rate: f64,
}

/// The textual fields the diversifier vocabulary is built from.
#[derive(Debug, Clone)]
pub struct TrackTerms {
    pub artist: String,
    pub title: String,
    pub genres: Vec<String>,
}

/// `min(1, ln(max(1, view_count) + 1) / 15)`, always in [0, 1].
pub fn popularity_score(view_count: i64) -> f64 {
    let views = view_count.max(1) as f64;
    ((views + 1.0).ln() / POPULARITY_LOG_SCALE).min(1.0)
}

/// `0.5 ^ (age_days / 90)`, always in [0, 1].
pub fn freshness_score(released_at: Option<NaiveDate>, now: DateTime<Utc>) -> f64 {
    let age_days = match released_at {
        Some(date) => (now.date_naive() - date).num_days().max(0) as f64,
        None => UNKNOWN_RELEASE_AGE_DAYS,
    };
    0.5_f64.powf(age_days / FRESHNESS_HALF_LIFE_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    #[test]
    fn test_popularity_score_bounds() {
        assert!(popularity_score(0) > 0.0);
        assert!(popularity_score(0) < 0.1);
        assert_eq!(popularity_score(i64::MAX / 2), 1.0);
        for views in [0, 1, 100, 10_000, 1_000_000_000] {
            let score = popularity_score(views);
            assert!((0.0..=1.0).contains(&score), "views={} score={}", views, score);
        }
    }

    #[test]
    fn test_freshness_score_half_life() {
        let now = Utc::now();
        let today = now.date_naive();
        let ninety_days_ago = today.checked_sub_days(Days::new(90)).unwrap();

        assert!((freshness_score(Some(today), now) - 1.0).abs() < 1e-9);
        assert!((freshness_score(Some(ninety_days_ago), now) - 0.5).abs() < 1e-9);

        // No release date falls back to the ten-year default age.
        let unknown = freshness_score(None, now);
        assert!(unknown > 0.0 && unknown < 1e-10);
    }

    #[test]
    fn test_freshness_future_release_clamps_to_now() {
        let now = Utc::now();
        let tomorrow = now.date_naive().checked_add_days(Days::new(1)).unwrap();
        assert_eq!(freshness_score(Some(tomorrow), now), 1.0);
    }
}
