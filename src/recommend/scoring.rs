//! Multi-signal scoring.
//!
//! Each eligible track gets a weighted blend of five signals plus a
//! duplicate-artist penalty applied in list order, so the second track by
//! an artist already seen in this pass scores lower than the first.
//! The collaborative map is a placeholder kept for weight compatibility;
//! nothing populates it yet, so that signal contributes 0.

use super::models::ScoredTrack;
use crate::catalog::Track;
use crate::profiles::{ScoringWeights, UserProfile};
use std::collections::{HashMap, HashSet};

/// Top-artist affinity weights are normalized by this before the cap at 1.
const ARTIST_WEIGHT_SCALE: f64 = 10.0;

/// Each overlapping genre adds this much to the content signal.
const GENRE_OVERLAP_STEP: f64 = 0.1;

/// Genre overlap contribution cap.
const GENRE_OVERLAP_CAP: f64 = 0.4;

/// Scores `tracks` against `profile`, preserving input order.
///
/// `collaborative` maps track id to a pre-computed collaborative score in
/// [0, 1]; absent entries contribute 0.
pub fn score_tracks(
    tracks: &[Track],
    profile: &UserProfile,
    collaborative: &HashMap<String, f64>,
) -> Vec<ScoredTrack> {
    let weights = profile.scoring_weights.clone().clamped();
    let mut artists_seen: HashSet<String> = HashSet::new();

    tracks
        .iter()
        .map(|track| {
            let artist_key = track.artist.to_lowercase();
            let is_duplicate = artists_seen.contains(&artist_key);
            artists_seen.insert(artist_key);

            let score = blend(track, profile, &weights, collaborative, is_duplicate);
            ScoredTrack {
                track: track.clone(),
                score,
            }
        })
        .collect()
}

/// Sorts scored tracks best first. Stable, so equal scores keep input order.
pub fn sort_by_score(scored: &mut [ScoredTrack]) {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
}

fn blend(
    track: &Track,
    profile: &UserProfile,
    weights: &ScoringWeights,
    collaborative: &HashMap<String, f64>,
    is_duplicate: bool,
) -> f64 {
    let collaborative_signal = collaborative.get(&track.id).copied().unwrap_or(0.0);
    let content_signal = content_score(track, profile);
    let follow_signal = if profile.follows_artist(&track.artist) {
        1.0
    } else {
        0.0
    };
    let dup_flag = if is_duplicate { 1.0 } else { 0.0 };

    let score = weights.collaborative * collaborative_signal
        + weights.content * content_signal
        + weights.popularity * track.popularity_score
        + weights.freshness * track.freshness_score
        + weights.follow_boost * follow_signal
        - weights.dup_penalty * dup_flag;
    score.max(0.0)
}

/// Artist affinity plus genre overlap, in [0, 1].
fn content_score(track: &Track, profile: &UserProfile) -> f64 {
    let artist_part = match profile.artist_weight(&track.artist) {
        Some(weight) => 0.6 * (weight / ARTIST_WEIGHT_SCALE).min(1.0),
        None => 0.0,
    };

    let overlap = track
        .genres
        .iter()
        .filter(|genre| {
            profile
                .top_genres
                .iter()
                .any(|entry| entry.name.eq_ignore_ascii_case(genre))
        })
        .count();
    let genre_part = (overlap as f64 * GENRE_OVERLAP_STEP).min(GENRE_OVERLAP_CAP);

    artist_part + genre_part
}
