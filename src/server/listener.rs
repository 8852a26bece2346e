//! Listener identification.
//!
//! Authentication is handled by the fronting service; by the time a request
//! reaches this server the listener is identified by the `X-User-Id` header.
//! A missing or unreadable header is a client error, not an auth failure.

use super::state::ServerState;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use tracing::debug;

pub const HEADER_USER_ID_KEY: &str = "X-User-Id";

/// The identified listener making the request.
#[derive(Debug, Clone)]
pub struct ListenerId(pub String);

impl ListenerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub enum ListenerExtractionError {
    MissingHeader,
}

impl IntoResponse for ListenerExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ListenerExtractionError::MissingHeader => (
                StatusCode::BAD_REQUEST,
                format!("Missing {} header", HEADER_USER_ID_KEY),
            )
                .into_response(),
        }
    }
}

impl FromRequestParts<ServerState> for ListenerId {
    type Rejection = ListenerExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        _ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(HEADER_USER_ID_KEY)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match value {
            Some(user_id) => Ok(ListenerId(user_id.to_string())),
            None => {
                debug!("No {} header on request", HEADER_USER_ID_KEY);
                Err(ListenerExtractionError::MissingHeader)
            }
        }
    }
}
