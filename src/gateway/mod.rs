mod client;

pub use client::MediaGatewayClient;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// One search result from the media gateway. Only the id takes part in
/// candidate generation; the rest is kept for logging.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub artist: String,
}

/// Full metadata for a single track as reported by the gateway probe.
#[derive(Debug, Clone, Default)]
pub struct ProbedTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub channel_title: String,
    pub thumbnail: Option<String>,
    pub genres: Vec<String>,
    pub duration_sec: i64,
    pub published_at: Option<NaiveDate>,
    pub view_count: i64,
    pub is_live: bool,
    pub is_shorts: bool,
    pub is_music_category: Option<bool>,
    pub embeddable: Option<bool>,
    pub verified: bool,
}

/// Search side of the media gateway, used by candidate generation.
#[async_trait]
pub trait TrackSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

/// Probe side of the media gateway, used to backfill the catalog.
#[async_trait]
pub trait TrackProber: Send + Sync {
    async fn probe(&self, track_id: &str) -> Result<ProbedTrack>;
}
