//! HTTP client for the external media gateway service.
//!
//! The gateway fronts the actual media platform and exposes two endpoints:
//! `GET /api/search?q=&maxResults=` and `GET /api/video/{id}`. Durations
//! come back as clock strings (`"3:45"`, `"1:02:10"`) and view counts are
//! stringly typed, both quirks of the upstream service.

use super::{ProbedTrack, SearchHit, TrackProber, TrackSearcher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

pub struct MediaGatewayClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<WireTrack>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireTrack {
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    channel_title: String,
    thumbnail: Option<String>,
    #[serde(default)]
    duration: serde_json::Value,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    view_count: serde_json::Value,
    #[serde(default)]
    genres: Vec<String>,
    is_live: Option<bool>,
    is_shorts: Option<bool>,
    is_music_category: Option<bool>,
    embeddable: Option<bool>,
    verified: Option<bool>,
}

impl MediaGatewayClient {
    /// # Arguments
    /// * `base_url` - Base URL of the gateway (e.g. "http://localhost:5001")
    /// * `timeout_sec` - Per-request timeout; a timed-out call is treated by
    ///   callers like any other failed source.
    pub fn new(base_url: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create gateway HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TrackSearcher for MediaGatewayClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}/api/search?q={}&maxResults={}",
            self.base_url,
            urlencoding::encode(query),
            max_results
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach media gateway for search")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Gateway search for {:?} failed with status {}",
                query,
                response.status()
            );
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse gateway search response")?;

        Ok(body
            .results
            .into_iter()
            .filter_map(|wire| {
                let id = wire.id?;
                Some(SearchHit {
                    id,
                    title: wire.title,
                    artist: wire.artist,
                })
            })
            .take(max_results)
            .collect())
    }
}

#[async_trait]
impl TrackProber for MediaGatewayClient {
    async fn probe(&self, track_id: &str) -> Result<ProbedTrack> {
        let url = format!(
            "{}/api/video/{}",
            self.base_url,
            urlencoding::encode(track_id)
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach media gateway probing {}", track_id))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Gateway probe for {} failed with status {}",
                track_id,
                response.status()
            );
        }

        let wire: WireTrack = response
            .json()
            .await
            .context("Failed to parse gateway probe response")?;

        let id = wire
            .id
            .clone()
            .unwrap_or_else(|| track_id.to_string());
        Ok(ProbedTrack {
            id,
            title: wire.title.clone(),
            artist: wire.artist.clone(),
            channel_title: wire.channel_title.clone(),
            thumbnail: wire.thumbnail.clone(),
            genres: wire.genres.clone(),
            duration_sec: parse_duration_sec(&wire.duration),
            published_at: parse_published_at(&wire.published_at),
            view_count: parse_count(&wire.view_count),
            is_live: wire.is_live.unwrap_or(false),
            is_shorts: wire.is_shorts.unwrap_or(false),
            is_music_category: wire.is_music_category,
            embeddable: wire.embeddable,
            verified: wire.verified.unwrap_or(false),
        })
    }
}

/// Parse `"MM:SS"` / `"HH:MM:SS"` clock strings or plain second counts.
fn parse_duration_sec(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        serde_json::Value::String(s) => {
            if s.contains(':') {
                let parts: Vec<&str> = s.split(':').collect();
                let nums: Vec<i64> = parts
                    .iter()
                    .map(|p| p.trim().parse::<i64>().unwrap_or(0))
                    .collect();
                match nums.as_slice() {
                    [m, s] => m * 60 + s,
                    [h, m, s] => h * 3600 + m * 60 + s,
                    _ => 0,
                }
            } else {
                s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0)
            }
        }
        _ => 0,
    }
}

/// View counts arrive either as numbers or strings (sometimes empty).
fn parse_count(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

/// Upload dates arrive as `YYYYMMDD` or `YYYY-MM-DD`.
fn parse_published_at(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .ok()
}
