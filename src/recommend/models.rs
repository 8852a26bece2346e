use crate::catalog::Track;
use crate::profiles::ScoringWeights;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Hard cap on deduplicated candidate ids per request.
pub const MAX_CANDIDATES: usize = 200;

/// Hard cap on returned recommendations per request.
pub const MAX_RESULTS: usize = 50;

pub const REASON_NO_CANDIDATES: &str = "no_candidates";
pub const REASON_NO_VALID_TRACKS: &str = "no_valid_tracks";

/// Per-request knobs, already validated with [`RecommendationRequest::normalized`].
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub user_id: String,
    pub limit: usize,
    pub enforce_verified: bool,
    pub use_exploration: bool,
    pub use_diversification: bool,
    pub explore_probability: f64,
}

impl RecommendationRequest {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            limit: 20,
            enforce_verified: false,
            use_exploration: true,
            use_diversification: true,
            explore_probability: 0.15,
        }
    }

    /// Clamps limit to [1, 50] and explore probability to [0, 1].
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_RESULTS);
        self.explore_probability = self.explore_probability.clamp(0.0, 1.0);
        self
    }
}

/// A candidate that survived eligibility, paired with its blended score.
#[derive(Debug, Clone)]
pub struct ScoredTrack {
    pub track: Track,
    pub score: f64,
}

/// One track as presented to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail: Option<String>,
    #[serde(rename = "duration")]
    pub duration_sec: i64,
    pub channel_title: String,
    pub is_verified: bool,
    pub score: f64,
}

impl From<&ScoredTrack> for RecommendedTrack {
    fn from(scored: &ScoredTrack) -> Self {
        Self {
            id: scored.track.id.clone(),
            title: scored.track.title.clone(),
            artist: scored.track.artist.clone(),
            thumbnail: scored.track.thumbnail.clone(),
            duration_sec: scored.track.duration_sec,
            channel_title: scored.track.channel_title.clone(),
            is_verified: scored.track.verified,
            score: scored.score,
        }
    }
}

/// Bookkeeping attached to every result, including empty ones.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub processing_time_ms: u64,
    pub candidates_generated: usize,
    pub valid_tracks: usize,
    pub weights_used: ScoringWeights,
    pub exploration: bool,
    pub diversification: bool,
    pub verified_only: bool,
    pub user_profile_last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResult {
    pub results: Vec<RecommendedTrack>,
    pub metadata: ResultMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_normalization_clamps() {
        let request = RecommendationRequest {
            limit: 500,
            explore_probability: 1.7,
            ..RecommendationRequest::new("u1")
        }
        .normalized();
        assert_eq!(request.limit, MAX_RESULTS);
        assert_eq!(request.explore_probability, 1.0);

        let request = RecommendationRequest {
            limit: 0,
            explore_probability: -0.2,
            ..RecommendationRequest::new("u1")
        }
        .normalized();
        assert_eq!(request.limit, 1);
        assert_eq!(request.explore_probability, 0.0);
    }

    #[test]
    fn test_recommended_track_wire_keys() {
        let track = RecommendedTrack {
            id: "t1".to_string(),
            title: "Odessa".to_string(),
            artist: "Caribou".to_string(),
            thumbnail: None,
            duration_sec: 240,
            channel_title: "Caribou - Topic".to_string(),
            is_verified: false,
            score: 0.5,
        };
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["duration"], 240);
        assert!(json.get("durationSec").is_none());
        assert_eq!(json["channelTitle"], "Caribou - Topic");
    }
}
