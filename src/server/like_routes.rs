//! Like toggles and the liked-videos listing.
//!
//! A like row's existence is the liked state: toggling deletes the row
//! when present and inserts (then re-reads through the join pipeline)
//! when absent.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::error::{api_response, ApiError};
use super::session::Session;
use super::state::{GuardedPlatformStore, ServerState};
use crate::store::{Like, LikeTarget, RecordId};

/// Shared toggle: present → delete + 200 with an empty object; absent →
/// insert + 201 with the joined payload built by the caller from the
/// fresh like row.
fn toggle_like(
    store: &GuardedPlatformStore,
    session: &Session,
    target: &LikeTarget,
    unliked_message: &str,
    liked_message: &str,
    joined: impl FnOnce(&GuardedPlatformStore, Like) -> Result<serde_json::Value, ApiError>,
) -> Result<Response, ApiError> {
    match store.find_like(&session.user.id, target)? {
        Some(like) => {
            store.delete_like(&like.id)?;
            Ok(api_response(StatusCode::OK, json!({}), unliked_message))
        }
        None => {
            let like = store.insert_like(&session.user.id, target)?;
            let data = joined(store, like)?;
            Ok(api_response(StatusCode::CREATED, data, liked_message))
        }
    }
}

async fn toggle_video_like(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(video_id): Path<String>,
) -> Result<Response, ApiError> {
    let video_id = RecordId::parse(&video_id)?;
    let video = store
        .get_video_with_owner(&video_id)?
        .ok_or_else(|| ApiError::NotFound("Video does not exist".to_string()))?;

    let user_id = session.user.id.clone();
    toggle_like(
        &store,
        &session,
        &LikeTarget::Video(video_id),
        "Video unliked successfully.",
        "Video liked successfully.",
        move |store, like| {
            // Re-read through the liked-videos join so the response shape
            // matches the listing.
            let entry = store
                .liked_videos(&user_id)?
                .into_iter()
                .find(|entry| entry.like_id == like.id);
            match entry {
                Some(entry) => Ok(serde_json::to_value(entry).map_err(anyhow::Error::from)?),
                None => Ok(json!({ "like": like, "video": video })),
            }
        },
    )
}

async fn toggle_comment_like(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(comment_id): Path<String>,
) -> Result<Response, ApiError> {
    let comment_id = RecordId::parse(&comment_id)?;
    let comment = store
        .get_comment(&comment_id)?
        .ok_or_else(|| ApiError::NotFound("Comment does not exist.".to_string()))?;

    toggle_like(
        &store,
        &session,
        &LikeTarget::Comment(comment_id),
        "Comment unliked successfully.",
        "Comment liked successfully.",
        move |_store, like| Ok(json!({ "like": like, "comment": comment })),
    )
}

async fn toggle_tweet_like(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(tweet_id): Path<String>,
) -> Result<Response, ApiError> {
    let tweet_id = RecordId::parse(&tweet_id)?;
    let tweet = store
        .get_tweet(&tweet_id)?
        .ok_or_else(|| ApiError::NotFound("Tweet does not exist".to_string()))?;

    toggle_like(
        &store,
        &session,
        &LikeTarget::Tweet(tweet_id),
        "Tweet unliked successfully.",
        "Tweet liked successfully.",
        move |_store, like| Ok(json!({ "like": like, "tweet": tweet })),
    )
}

async fn liked_videos(
    session: Session,
    State(store): State<GuardedPlatformStore>,
) -> Result<Response, ApiError> {
    let liked = store.liked_videos(&session.user.id)?;
    if liked.is_empty() {
        // Empty lists are a 404 by contract.
        return Err(ApiError::NotFound("No liked video found.".to_string()));
    }

    Ok(api_response(
        StatusCode::OK,
        liked,
        "User liked videos fetched successfully.",
    ))
}

pub fn like_routes(state: ServerState) -> Router {
    Router::new()
        .route("/video/{videoId}", post(toggle_video_like))
        .route("/comment/{commentId}", post(toggle_comment_like))
        .route("/tweet/{tweetId}", post(toggle_tweet_like))
        .route("/videos", get(liked_videos))
        .with_state(state)
}
