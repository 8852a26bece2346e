//! Explore/exploit sampling over a scored candidate list.

use super::models::ScoredTrack;
use rand::Rng;

/// Picks `k` items from the best-first `scored` list.
///
/// The pool is the top `3k` items. Each output slot runs a Bernoulli trial
/// at `explore_probability`: on explore it draws uniformly from the middle
/// third of the remaining pool, otherwise it takes the best remaining item.
/// With probability 0 this is exactly top-k truncation, no rng consumed.
pub fn sample<R: Rng>(
    scored: Vec<ScoredTrack>,
    k: usize,
    explore_probability: f64,
    rng: &mut R,
) -> Vec<ScoredTrack> {
    let mut pool: Vec<ScoredTrack> = scored.into_iter().take(3 * k).collect();
    let mut picked = Vec::with_capacity(k);

    while picked.len() < k && !pool.is_empty() {
        let explore = explore_probability > 0.0 && rng.random_bool(explore_probability);
        let index = if explore {
            middle_third_index(pool.len(), rng).unwrap_or(0)
        } else {
            0
        };
        picked.push(pool.remove(index));
    }
    picked
}

/// Uniform index into `[len/3, 2·len/3)`, or `None` when that range is empty.
fn middle_third_index<R: Rng>(len: usize, rng: &mut R) -> Option<usize> {
    let start = len / 3;
    let end = 2 * len / 3;
    if start >= end {
        return None;
    }
    Some(rng.random_range(start..end))
}
