//! The recommendation pipeline.
//!
//! One request flows through: stale-profile rebuild, candidate generation,
//! eligibility filtering, scoring, optional exploration, optional
//! diversification. The engine never fails a request; any internal error is
//! folded into an empty result whose metadata carries the reason.

mod candidates;
mod diversify;
mod eligibility;
mod explore;
mod models;
mod scoring;

pub use diversify::{Vocabulary, DEFAULT_MMR_LAMBDA};
pub use models::{
    RecommendationRequest, RecommendationResult, RecommendedTrack, ResultMetadata, ScoredTrack,
    MAX_CANDIDATES, MAX_RESULTS, REASON_NO_CANDIDATES, REASON_NO_VALID_TRACKS,
};

use crate::catalog::TrackCatalog;
use crate::gateway::{TrackProber, TrackSearcher};
use crate::interactions::InteractionStore;
use crate::profiles::{ProfileBuilder, ProfileStore, UserProfile};
use anyhow::{Context, Result};
use candidates::CandidateGenerator;
use chrono::Duration;
use eligibility::EligibilityFilter;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// MMR trade-off between relevance and novelty.
    pub mmr_lambda: f64,
    /// A profile older than this is rebuilt synchronously before use.
    pub profile_stale_hours: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mmr_lambda: DEFAULT_MMR_LAMBDA,
            profile_stale_hours: 24,
        }
    }
}

pub struct RecommendationEngine {
    catalog: Arc<dyn TrackCatalog>,
    profiles: Arc<dyn ProfileStore>,
    builder: Arc<ProfileBuilder>,
    generator: CandidateGenerator,
    filter: EligibilityFilter,
    vocabulary: RwLock<Vocabulary>,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn TrackCatalog>,
        interactions: Arc<dyn InteractionStore>,
        profiles: Arc<dyn ProfileStore>,
        builder: Arc<ProfileBuilder>,
        searcher: Arc<dyn TrackSearcher>,
        prober: Arc<dyn TrackProber>,
        settings: EngineSettings,
    ) -> Self {
        let generator =
            CandidateGenerator::new(catalog.clone(), interactions.clone(), searcher);
        let filter = EligibilityFilter::new(catalog.clone(), prober);
        Self {
            catalog,
            profiles,
            builder,
            generator,
            filter,
            vocabulary: RwLock::new(Vocabulary::default()),
            settings,
        }
    }

    /// Rebuilds the shared diversifier vocabulary from the current catalog.
    pub fn rebuild_vocabulary(&self) -> Result<usize> {
        let terms = self
            .catalog
            .all_track_terms()
            .context("Failed to load track terms for vocabulary")?;
        let vocabulary = Vocabulary::build(&terms);
        let size = vocabulary.len();
        *self.vocabulary.write().unwrap_or_else(|e| e.into_inner()) = vocabulary;
        debug!("Rebuilt diversifier vocabulary, {} tokens", size);
        Ok(size)
    }

    pub async fn recommend(&self, request: RecommendationRequest) -> RecommendationResult {
        let started = Instant::now();
        let request = request.normalized();
        let profile = self.fresh_profile(&request.user_id);

        let (results, candidates_generated, valid_tracks, reason) =
            match self.pipeline(&request, &profile).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(
                        "Recommendation pipeline failed for {}: {:#}",
                        request.user_id, e
                    );
                    (vec![], 0, 0, Some(format!("{:#}", e)))
                }
            };

        let elapsed = started.elapsed().as_millis() as u64;
        info!(
            "Recommended {} tracks for {} in {}ms ({} candidates, {} valid)",
            results.len(),
            request.user_id,
            elapsed,
            candidates_generated,
            valid_tracks
        );

        RecommendationResult {
            results,
            metadata: ResultMetadata {
                processing_time_ms: elapsed,
                candidates_generated,
                valid_tracks,
                weights_used: profile.scoring_weights.clone().clamped(),
                exploration: request.use_exploration,
                diversification: request.use_diversification,
                verified_only: request.enforce_verified,
                user_profile_last_updated: profile.last_profile_update,
                reason,
            },
        }
    }

    async fn pipeline(
        &self,
        request: &RecommendationRequest,
        profile: &UserProfile,
    ) -> Result<(Vec<RecommendedTrack>, usize, usize, Option<String>)> {
        let candidate_ids = self.generator.generate(&request.user_id, profile).await;
        let candidates_generated = candidate_ids.len();
        if candidate_ids.is_empty() {
            return Ok((vec![], 0, 0, Some(REASON_NO_CANDIDATES.to_string())));
        }

        let eligible = self
            .filter
            .filter(&candidate_ids, request.enforce_verified)
            .await;
        let valid_tracks = eligible.len();
        if eligible.is_empty() {
            return Ok((
                vec![],
                candidates_generated,
                0,
                Some(REASON_NO_VALID_TRACKS.to_string()),
            ));
        }

        // Collaborative scores are not computed in this version; the scorer
        // takes the map so profile weights keep their meaning.
        let collaborative: HashMap<String, f64> = HashMap::new();
        let mut scored = scoring::score_tracks(&eligible, profile, &collaborative);
        scoring::sort_by_score(&mut scored);

        if request.use_exploration {
            let mut rng = rand::rng();
            scored = explore::sample(scored, request.limit, request.explore_probability, &mut rng);
        }

        if request.use_diversification {
            let vocabulary = self.vocabulary.read().unwrap_or_else(|e| e.into_inner());
            scored = diversify::diversify(scored, request.limit, self.settings.mmr_lambda, &vocabulary);
        }

        scored.truncate(request.limit);
        let results = scored.iter().map(RecommendedTrack::from).collect();
        Ok((results, candidates_generated, valid_tracks, None))
    }

    /// Loads the profile, rebuilding it in-line when stale. Rebuild failures
    /// fall back to whatever is stored (or an empty default).
    fn fresh_profile(&self, user_id: &str) -> UserProfile {
        let stored = match self.profiles.get_profile(user_id) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Failed to load profile for {}: {:?}", user_id, e);
                None
            }
        };

        let stale = stored
            .as_ref()
            .map(|p| p.needs_update(Duration::hours(self.settings.profile_stale_hours)))
            .unwrap_or(true);
        if stale {
            match self.builder.rebuild(user_id) {
                Ok(rebuilt) => return rebuilt,
                Err(e) => warn!("In-line profile rebuild for {} failed: {:?}", user_id, e),
            }
        }
        stored.unwrap_or_else(|| UserProfile::new(user_id))
    }
}
