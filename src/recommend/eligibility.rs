//! Eligibility filtering with catalog backfill.
//!
//! A candidate id is resolved against the catalog first; on a miss the
//! gateway is probed synchronously and a successful probe is upserted, so
//! the catalog grows as a side effect of recommending. Probe failures drop
//! the candidate, they never fail the request.

use crate::catalog::{Track, TrackCatalog, TrackMetadata};
use crate::gateway::{ProbedTrack, TrackProber};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tracks shorter than this are rejected (intros, teasers, fragments).
const MIN_DURATION_SEC: i64 = 75;

/// Tracks longer than this are rejected (mixes, full sets, podcasts).
const MAX_DURATION_SEC: i64 = 600;

pub struct EligibilityFilter {
    catalog: Arc<dyn TrackCatalog>,
    prober: Arc<dyn TrackProber>,
}

impl EligibilityFilter {
    pub fn new(catalog: Arc<dyn TrackCatalog>, prober: Arc<dyn TrackProber>) -> Self {
        Self { catalog, prober }
    }

    /// Resolves candidate ids to eligible tracks, preserving input order.
    pub async fn filter(&self, candidate_ids: &[String], enforce_verified: bool) -> Vec<Track> {
        let mut eligible = Vec::new();
        for id in candidate_ids {
            let track = match self.resolve(id).await {
                Some(track) => track,
                None => continue,
            };
            if is_eligible(&track, enforce_verified) {
                eligible.push(track);
            } else {
                debug!("Track {} rejected by eligibility rules", id);
            }
        }
        eligible
    }

    async fn resolve(&self, id: &str) -> Option<Track> {
        match self.catalog.get_track(id) {
            Ok(Some(track)) => return Some(track),
            Ok(None) => {}
            Err(e) => {
                warn!("Catalog lookup for {} failed: {:?}", id, e);
                return None;
            }
        }

        let probed = match self.prober.probe(id).await {
            Ok(probed) => probed,
            Err(e) => {
                debug!("Probe for {} failed, dropping candidate: {:?}", id, e);
                return None;
            }
        };

        match self.catalog.upsert_track(metadata_from_probe(probed)) {
            Ok(track) => Some(track),
            Err(e) => {
                warn!("Failed to store probed track {}: {:?}", id, e);
                None
            }
        }
    }
}

fn metadata_from_probe(probed: ProbedTrack) -> TrackMetadata {
    TrackMetadata {
        id: probed.id,
        title: probed.title,
        artist: probed.artist,
        channel_title: probed.channel_title,
        thumbnail: probed.thumbnail,
        genres: probed.genres,
        duration_sec: probed.duration_sec,
        released_at: probed.published_at,
        is_live: probed.is_live,
        is_shorts: probed.is_shorts,
        is_music_category: probed.is_music_category,
        embeddable: probed.embeddable,
        verified: probed.verified,
        view_count: probed.view_count,
        ..Default::default()
    }
}

/// Hard rules; `None` on the tri-state flags means "not reported" and passes.
fn is_eligible(track: &Track, enforce_verified: bool) -> bool {
    if track.duration_sec < MIN_DURATION_SEC || track.duration_sec > MAX_DURATION_SEC {
        return false;
    }
    if track.is_live || track.is_shorts {
        return false;
    }
    if track.is_music_category == Some(false) {
        return false;
    }
    if track.embeddable == Some(false) {
        return false;
    }
    if enforce_verified && !track.verified {
        return false;
    }
    true
}
