use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of action a user took on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionEvent {
    Play,
    Finish,
    Like,
    Dislike,
    Skip,
    AddPlaylist,
    Search,
    Share,
}

impl InteractionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionEvent::Play => "play",
            InteractionEvent::Finish => "finish",
            InteractionEvent::Like => "like",
            InteractionEvent::Dislike => "dislike",
            InteractionEvent::Skip => "skip",
            InteractionEvent::AddPlaylist => "add_playlist",
            InteractionEvent::Search => "search",
            InteractionEvent::Share => "share",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "play" => Some(InteractionEvent::Play),
            "finish" => Some(InteractionEvent::Finish),
            "like" => Some(InteractionEvent::Like),
            "dislike" => Some(InteractionEvent::Dislike),
            "skip" => Some(InteractionEvent::Skip),
            "add_playlist" => Some(InteractionEvent::AddPlaylist),
            "search" => Some(InteractionEvent::Search),
            "share" => Some(InteractionEvent::Share),
            _ => None,
        }
    }

    /// Events that should schedule a profile rebuild for the user.
    pub fn triggers_profile_rebuild(&self) -> bool {
        matches!(self, InteractionEvent::Like | InteractionEvent::Finish)
    }
}

/// One recorded user action. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub user_id: String,
    pub track_id: String,
    pub event: InteractionEvent,
    /// Completion ratio in [0, 1], when the client reports one.
    pub value: Option<f64>,
    pub duration_played_sec: Option<f64>,
    pub track_duration_sec: Option<f64>,
    pub session_id: Option<String>,
    pub source: Option<String>,
    pub previous_track_id: Option<String>,
    pub playlist_id: Option<String>,
    pub search_query: Option<String>,
    pub hour_of_day: u8,
    pub day_of_week: u8,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when recording an interaction.
#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub user_id: String,
    pub track_id: String,
    pub event: InteractionEvent,
    pub value: Option<f64>,
    pub duration_played_sec: Option<f64>,
    pub track_duration_sec: Option<f64>,
    pub session_id: Option<String>,
    pub source: Option<String>,
    pub previous_track_id: Option<String>,
    pub playlist_id: Option<String>,
    pub search_query: Option<String>,
}

impl NewInteraction {
    pub fn new(user_id: &str, track_id: &str, event: InteractionEvent) -> Self {
        Self {
            user_id: user_id.to_string(),
            track_id: track_id.to_string(),
            event,
            value: None,
            duration_played_sec: None,
            track_duration_sec: None,
            session_id: None,
            source: None,
            previous_track_id: None,
            playlist_id: None,
            search_query: None,
        }
    }
}

/// Per-track engagement aggregate for one user.
#[derive(Debug, Clone)]
pub struct TrackEngagement {
    pub track_id: String,
    pub plays: i64,
    pub finishes: i64,
    pub likes: i64,
    pub avg_completion: Option<f64>,
    pub last_interaction: DateTime<Utc>,
}

impl TrackEngagement {
    /// Seed-track weight: `3×likes + 2×finishes + plays + 2×avg_completion`.
    pub fn seed_weight(&self) -> f64 {
        3.0 * self.likes as f64
            + 2.0 * self.finishes as f64
            + self.plays as f64
            + 2.0 * self.avg_completion.unwrap_or(0.0)
    }

    /// Contribution of this track to artist/genre affinity:
    /// `3×likes + 2×finishes + plays`.
    pub fn affinity_weight(&self) -> f64 {
        3.0 * self.likes as f64 + 2.0 * self.finishes as f64 + self.plays as f64
    }
}

/// Windowed popularity aggregate, user independent.
#[derive(Debug, Clone, Serialize)]
pub struct TrendingTrack {
    pub track_id: String,
    pub plays: i64,
    pub likes: i64,
    pub unique_listeners: i64,
    /// `plays + 2×likes + 3×unique_listeners` over the window.
    pub trend_score: i64,
}

/// Behavioral scalars derived from the whole log for one user.
#[derive(Debug, Clone, Default)]
pub struct BehavioralStats {
    /// Average reported completion ratio over play/finish events.
    pub average_completion_rate: Option<f64>,
    /// Average playback position at which the user skips.
    pub average_skip_position_sec: Option<f64>,
    pub total_interactions: i64,
}
