//! Subscription toggle and the subscriber/channel listings.

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
use crate::store::RecordId;
use crate::user::OwnerSummary;

async fn toggle_subscription(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(channel_id): Path<String>,
) -> Result<Response, ApiError> {
    let channel_id = RecordId::parse(&channel_id)?;

    if channel_id == session.user.id {
        return Err(ApiError::InvalidArgument(
            "Cannot subscribe to your own channel".to_string(),
        ));
    }

    let channel = store
        .get_user(&channel_id)?
        .ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))?;

    match store.find_subscription(&session.user.id, &channel_id)? {
        Some(subscription) => {
            store.delete_subscription(&subscription.id)?;
            Ok(api_response(
                StatusCode::OK,
                json!({}),
                "Channel unsubscribed successfully.",
            ))
        }
        None => {
            let subscription = store.insert_subscription(&session.user.id, &channel_id)?;
            let channel = OwnerSummary {
                id: channel.id,
                username: channel.username,
                full_name: channel.full_name,
                avatar_url: channel.avatar_url,
            };
            Ok(api_response(
                StatusCode::CREATED,
                json!({ "subscription": subscription, "channel": channel }),
                "Channel subscribed successfully.",
            ))
        }
    }
}

async fn channel_subscribers(
    _session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(channel_id): Path<String>,
) -> Result<Response, ApiError> {
    let channel_id = RecordId::parse(&channel_id)?;

    let subscribers = store.channel_subscribers(&channel_id)?;
    if subscribers.is_empty() {
        return Err(ApiError::NotFound("No subscriber found.".to_string()));
    }

    Ok(api_response(
        StatusCode::OK,
        subscribers,
        "Channel subscribers fetched successfully.",
    ))
}

async fn subscribed_channels(
    _session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(subscriber_id): Path<String>,
) -> Result<Response, ApiError> {
    let subscriber_id = RecordId::parse(&subscriber_id)?;

    let channels = store.subscribed_channels(&subscriber_id)?;
    if channels.is_empty() {
        return Err(ApiError::NotFound(
            "No channels found for this subscriber.".to_string(),
        ));
    }

    Ok(api_response(
        StatusCode::OK,
        channels,
        "Subscribed channels fetched successfully.",
    ))
}

pub fn subscription_routes(state: ServerState) -> Router {
    Router::new()
        .route("/{channelId}", post(toggle_subscription))
        .route("/subscribers/{channelId}", get(channel_subscribers))
        .route("/channels/{subscriberId}", get(subscribed_channels))
        .with_state(state)
}
