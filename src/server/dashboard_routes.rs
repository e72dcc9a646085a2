//! Owner-scoped dashboard aggregates.

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};

use super::error::{api_response, ApiError};
use super::session::Session;
use super::state::{GuardedPlatformStore, ServerState};

async fn channel_stats(
    session: Session,
    State(store): State<GuardedPlatformStore>,
) -> Result<Response, ApiError> {
    let stats = store.channel_stats(&session.user.id)?;
    Ok(api_response(
        StatusCode::OK,
        stats,
        "Channel stats fetched successfully.",
    ))
}

async fn channel_videos(
    session: Session,
    State(store): State<GuardedPlatformStore>,
) -> Result<Response, ApiError> {
    let videos = store.channel_videos(&session.user.id)?;
    if videos.is_empty() {
        return Err(ApiError::NotFound("No video found.".to_string()));
    }

    Ok(api_response(
        StatusCode::OK,
        videos,
        "Channel videos fetched successfully.",
    ))
}

pub fn dashboard_routes(state: ServerState) -> Router {
    Router::new()
        .route("/stats", get(channel_stats))
        .route("/videos", get(channel_videos))
        .with_state(state)
}
