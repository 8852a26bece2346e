//! Stub media gateway backed by an in-memory track map.

use anyhow::{bail, Result};
use async_trait::async_trait;
use mixwheel_server::gateway::{ProbedTrack, SearchHit, TrackProber, TrackSearcher};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory gateway double. Search matches any query word against artist
/// and title, probe resolves from the same map. Queries are recorded for
/// assertions.
pub struct TestGateway {
    tracks: Vec<ProbedTrack>,
    by_id: HashMap<String, ProbedTrack>,
    pub queries: Mutex<Vec<String>>,
}

impl TestGateway {
    pub fn new(tracks: Vec<ProbedTrack>) -> Self {
        let by_id = tracks
            .iter()
            .map(|track| (track.id.clone(), track.clone()))
            .collect();
        Self {
            tracks,
            by_id,
            queries: Mutex::new(vec![]),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// A well-formed probed track with eligible defaults.
    pub fn track(id: &str, artist: &str, title: &str) -> ProbedTrack {
        ProbedTrack {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            channel_title: format!("{} - Topic", artist),
            duration_sec: 240,
            view_count: 100_000,
            ..Default::default()
        }
    }
}

#[async_trait]
impl TrackSearcher for TestGateway {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        let query_lower = query.to_lowercase();
        let words: Vec<&str> = query_lower.split_whitespace().collect();
        Ok(self
            .tracks
            .iter()
            .filter(|track| {
                let haystack =
                    format!("{} {}", track.artist, track.title).to_lowercase();
                words.iter().any(|word| haystack.contains(word))
            })
            .take(max_results)
            .map(|track| SearchHit {
                id: track.id.clone(),
                title: track.title.clone(),
                artist: track.artist.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl TrackProber for TestGateway {
    async fn probe(&self, track_id: &str) -> Result<ProbedTrack> {
        match self.by_id.get(track_id) {
            Some(track) => Ok(track.clone()),
            None => bail!("unknown track {}", track_id),
        }
    }
}
