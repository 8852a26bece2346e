use axum::extract::FromRef;

use crate::catalog::TrackCatalog;
use crate::interactions::InteractionStore;
use crate::profiles::{ProfileStore, RebuildQueue};
use crate::recommend::RecommendationEngine;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedTrackCatalog = Arc<dyn TrackCatalog>;
pub type GuardedInteractionStore = Arc<dyn InteractionStore>;
pub type GuardedProfileStore = Arc<dyn ProfileStore>;
pub type GuardedEngine = Arc<RecommendationEngine>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub catalog: GuardedTrackCatalog,
    pub interactions: GuardedInteractionStore,
    pub profiles: GuardedProfileStore,
    pub engine: GuardedEngine,
    pub rebuild_queue: RebuildQueue,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedTrackCatalog {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog.clone()
    }
}

impl FromRef<ServerState> for GuardedInteractionStore {
    fn from_ref(input: &ServerState) -> Self {
        input.interactions.clone()
    }
}

impl FromRef<ServerState> for GuardedProfileStore {
    fn from_ref(input: &ServerState) -> Self {
        input.profiles.clone()
    }
}

impl FromRef<ServerState> for GuardedEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.engine.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for RebuildQueue {
    fn from_ref(input: &ServerState) -> Self {
        input.rebuild_queue.clone()
    }
}
