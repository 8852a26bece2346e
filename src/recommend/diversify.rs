//! Result diversification via maximal marginal relevance.
//!
//! Tracks are compared as term-presence vectors over a shared vocabulary
//! built from the whole catalog: the artist name as one token, each genre
//! tag as one token, and the first three title words of at least three
//! characters. Cosine similarity over presence sets reduces to
//! `|A ∩ B| / sqrt(|A|·|B|)`.

use super::models::ScoredTrack;
use crate::catalog::{Track, TrackTerms};
use std::collections::{HashMap, HashSet};

/// How many leading title words enter the vocabulary.
const TITLE_TOKEN_LIMIT: usize = 3;

/// Title words shorter than this are skipped (articles, particles).
const MIN_TITLE_TOKEN_LEN: usize = 3;

pub const DEFAULT_MMR_LAMBDA: f64 = 0.8;

/// Token-to-index map shared by all requests. Rebuilt periodically from the
/// catalog; tokens that appeared after the last rebuild are simply ignored.
#[derive(Debug, Default)]
pub struct Vocabulary {
    indices: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn build(terms: &[TrackTerms]) -> Self {
        let mut indices = HashMap::new();
        for term in terms {
            for token in tokenize(&term.artist, &term.title, &term.genres) {
                let next = indices.len();
                indices.entry(token).or_insert(next);
            }
        }
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Presence set of known-token indices for one track.
    fn vector(&self, track: &Track) -> HashSet<usize> {
        tokenize(&track.artist, &track.title, &track.genres)
            .into_iter()
            .filter_map(|token| self.indices.get(&token).copied())
            .collect()
    }
}

fn tokenize(artist: &str, title: &str, genres: &[String]) -> Vec<String> {
    let mut tokens = Vec::new();
    let artist = artist.trim().to_lowercase();
    if !artist.is_empty() {
        tokens.push(artist);
    }
    for genre in genres {
        let genre = genre.trim().to_lowercase();
        if !genre.is_empty() {
            tokens.push(genre);
        }
    }
    tokens.extend(
        title
            .split_whitespace()
            .filter(|word| word.len() >= MIN_TITLE_TOKEN_LEN)
            .take(TITLE_TOKEN_LIMIT)
            .map(str::to_lowercase),
    );
    tokens
}

fn cosine(a: &HashSet<usize>, b: &HashSet<usize>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let common = a.intersection(b).count();
    common as f64 / ((a.len() * b.len()) as f64).sqrt()
}

/// Greedy MMR: repeatedly picks the candidate maximizing
/// `λ·relevance − (1−λ)·max_similarity_to_selected`. Ties keep the candidate
/// scanned first, so equal-valued inputs stay in score order.
pub fn diversify(
    scored: Vec<ScoredTrack>,
    k: usize,
    lambda: f64,
    vocabulary: &Vocabulary,
) -> Vec<ScoredTrack> {
    if scored.len() <= 1 {
        return scored;
    }

    let vectors: Vec<HashSet<usize>> = scored
        .iter()
        .map(|s| vocabulary.vector(&s.track))
        .collect();
    let mut remaining: Vec<usize> = (0..scored.len()).collect();
    let mut selected_indices: Vec<usize> = Vec::with_capacity(k);

    while selected_indices.len() < k && !remaining.is_empty() {
        let mut best_position = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (position, &candidate) in remaining.iter().enumerate() {
            let max_similarity = selected_indices
                .iter()
                .map(|&chosen| cosine(&vectors[candidate], &vectors[chosen]))
                .fold(0.0, f64::max);
            let value = lambda * scored[candidate].score - (1.0 - lambda) * max_similarity;
            if value > best_value {
                best_value = value;
                best_position = position;
            }
        }
        selected_indices.push(remaining.remove(best_position));
    }

    let mut slots: Vec<Option<ScoredTrack>> = scored.into_iter().map(Some).collect();
    selected_indices
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}
