use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::interactions::{InteractionEvent, NewInteraction};
use crate::profiles::{RebuildQueue, ScoringWeights, UserProfile};
use crate::recommend::{RecommendationRequest, MAX_RESULTS};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{log_requests, state::*, ListenerId, RequestsLoggingLevel, ServerConfig};

const TRENDING_DEFAULT_LIMIT: usize = 20;
const TRENDING_DEFAULT_WINDOW_DAYS: u32 = 7;
const ACTIVITY_WINDOW_DAYS: u32 = 30;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub tracks_count: Option<usize>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        tracks_count: state.catalog.tracks_count().ok(),
    };
    Json(stats)
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct RecommendationsQuery {
    pub limit: Option<usize>,
    pub verified_only: Option<bool>,
    pub exploration: Option<bool>,
    pub diversification: Option<bool>,
    pub explore_rate: Option<f64>,
}

async fn get_recommendations(
    listener: ListenerId,
    State(engine): State<GuardedEngine>,
    State(config): State<ServerConfig>,
    Query(query): Query<RecommendationsQuery>,
) -> Response {
    let mut request = RecommendationRequest::new(listener.as_str());
    if let Some(limit) = query.limit {
        request.limit = limit;
    }
    request.enforce_verified = query.verified_only.unwrap_or(false);
    request.use_exploration = query.exploration.unwrap_or(true);
    request.use_diversification = query.diversification.unwrap_or(true);
    request.explore_probability = query
        .explore_rate
        .unwrap_or(config.default_explore_probability);

    let result = engine.recommend(request).await;
    Json(result).into_response()
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InteractionBody {
    pub track_id: Option<String>,
    pub event: Option<String>,
    pub value: Option<f64>,
    pub duration_played: Option<f64>,
    pub track_duration: Option<f64>,
    pub session_id: Option<String>,
    pub source: Option<String>,
    pub previous_track_id: Option<String>,
    pub playlist_id: Option<String>,
    pub search_query: Option<String>,
}

async fn post_interaction(
    listener: ListenerId,
    State(interactions): State<GuardedInteractionStore>,
    State(rebuild_queue): State<RebuildQueue>,
    Json(body): Json<InteractionBody>,
) -> Response {
    let track_id = match body.track_id.as_deref().map(str::trim) {
        Some(track_id) if !track_id.is_empty() => track_id.to_string(),
        _ => return (StatusCode::BAD_REQUEST, "trackId is required").into_response(),
    };
    let event = match body.event.as_deref() {
        None => return (StatusCode::BAD_REQUEST, "event is required").into_response(),
        Some(raw) => match InteractionEvent::parse(raw) {
            Some(event) => event,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("Unknown event type: {}", raw),
                )
                    .into_response()
            }
        },
    };

    let new = NewInteraction {
        user_id: listener.0.clone(),
        track_id,
        event,
        value: body.value,
        duration_played_sec: body.duration_played,
        track_duration_sec: body.track_duration,
        session_id: body.session_id,
        source: body.source,
        previous_track_id: body.previous_track_id,
        playlist_id: body.playlist_id,
        search_query: body.search_query,
    };

    match interactions.append(new) {
        Ok(interaction) => {
            if event.triggers_profile_rebuild() {
                rebuild_queue.enqueue(listener.as_str());
            }
            (StatusCode::CREATED, Json(interaction)).into_response()
        }
        Err(err) => {
            warn!("Failed to record interaction: {:#}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    }
}

#[derive(Serialize)]
struct ProfileResponse {
    #[serde(flatten)]
    profile: UserProfile,
    /// Interaction counts by event kind over the last 30 days.
    recent_activity: std::collections::HashMap<String, i64>,
}

async fn get_profile(
    listener: ListenerId,
    State(profiles): State<GuardedProfileStore>,
    State(interactions): State<GuardedInteractionStore>,
) -> Response {
    let profile = match profiles.get_profile(listener.as_str()) {
        Ok(Some(profile)) => profile,
        Ok(None) => UserProfile::new(listener.as_str()),
        Err(err) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    };

    let recent_activity = match interactions.activity_counts(listener.as_str(), ACTIVITY_WINDOW_DAYS)
    {
        Ok(counts) => counts
            .into_iter()
            .map(|(event, count)| (event.as_str().to_string(), count))
            .collect(),
        Err(err) => {
            warn!("Failed to load activity counts: {:#}", err);
            Default::default()
        }
    };

    Json(ProfileResponse {
        profile,
        recent_activity,
    })
    .into_response()
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateBody {
    pub followed_artists: Option<Vec<String>>,
    pub verified_preference: Option<f64>,
    pub freshness_preference: Option<f64>,
    pub diversity_preference: Option<f64>,
    pub scoring_weights: Option<ScoringWeights>,
    pub seed_artists: Option<Vec<String>>,
}

async fn put_profile(
    listener: ListenerId,
    State(profiles): State<GuardedProfileStore>,
    Json(body): Json<ProfileUpdateBody>,
) -> Response {
    let mut profile = match profiles.get_profile(listener.as_str()) {
        Ok(Some(profile)) => profile,
        Ok(None) => UserProfile::new(listener.as_str()),
        Err(err) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    };

    if let Some(followed) = body.followed_artists {
        profile.followed_artists = followed;
    }
    if let Some(preference) = body.verified_preference {
        profile.verified_preference = preference.clamp(0.0, 1.0);
    }
    if let Some(preference) = body.freshness_preference {
        profile.freshness_preference = preference.clamp(0.0, 1.0);
    }
    if let Some(preference) = body.diversity_preference {
        profile.diversity_preference = preference.clamp(0.0, 1.0);
    }
    if let Some(weights) = body.scoring_weights {
        profile.scoring_weights = weights.clamped();
    }
    if let Some(seeds) = body.seed_artists {
        profile.seed_artists = seeds;
        profile.onboarding_complete = true;
    }

    match profiles.upsert_profile(&profile) {
        Ok(()) => Json(profile).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct TrendingQuery {
    pub limit: Option<usize>,
    pub days: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendingEntry {
    pub track_id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub thumbnail: Option<String>,
    pub plays: i64,
    pub likes: i64,
    pub unique_listeners: i64,
    pub trend_score: i64,
}

async fn get_trending(
    State(interactions): State<GuardedInteractionStore>,
    State(catalog): State<GuardedTrackCatalog>,
    Query(query): Query<TrendingQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(TRENDING_DEFAULT_LIMIT).clamp(1, MAX_RESULTS);
    let days = query.days.unwrap_or(TRENDING_DEFAULT_WINDOW_DAYS).max(1);

    let trending = match interactions.trending(days, limit) {
        Ok(trending) => trending,
        Err(err) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    };

    let ids: Vec<String> = trending.iter().map(|t| t.track_id.clone()).collect();
    let known = match catalog.get_tracks(&ids) {
        Ok(tracks) => tracks,
        Err(err) => {
            warn!("Failed to enrich trending tracks: {:#}", err);
            vec![]
        }
    };

    let entries: Vec<TrendingEntry> = trending
        .into_iter()
        .map(|t| {
            let track = known.iter().find(|track| track.id == t.track_id);
            TrendingEntry {
                track_id: t.track_id,
                title: track.map(|track| track.title.clone()),
                artist: track.map(|track| track.artist.clone()),
                thumbnail: track.and_then(|track| track.thumbnail.clone()),
                plays: t.plays,
                likes: t.likes,
                unique_listeners: t.unique_listeners,
                trend_score: t.trend_score,
            }
        })
        .collect();

    Json(entries).into_response()
}

pub fn make_app(
    config: ServerConfig,
    catalog: GuardedTrackCatalog,
    interactions: GuardedInteractionStore,
    profiles: GuardedProfileStore,
    engine: GuardedEngine,
    rebuild_queue: RebuildQueue,
) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        catalog,
        interactions,
        profiles,
        engine,
        rebuild_queue,
        hash: crate::git_hash().to_string(),
    };

    let api_routes: Router = Router::new()
        .route("/recommendations", get(get_recommendations))
        .route("/interaction", post(post_interaction))
        .route("/profile", get(get_profile))
        .route("/profile", put(put_profile))
        .route("/trending", get(get_trending))
        .with_state(state.clone());

    let mut app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1", api_routes);

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    app
}

#[allow(clippy::too_many_arguments)]
pub async fn run_server(
    catalog: GuardedTrackCatalog,
    interactions: GuardedInteractionStore,
    profiles: GuardedProfileStore,
    engine: GuardedEngine,
    rebuild_queue: RebuildQueue,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    default_explore_probability: f64,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
        default_explore_probability,
    };
    let app = make_app(
        config,
        catalog,
        interactions,
        profiles,
        engine,
        rebuild_queue,
    );

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on 127.0.0.1:{}", port);

    Ok(axum::serve(listener, app).await?)
}
