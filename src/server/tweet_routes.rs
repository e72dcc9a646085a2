//! Tweet endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use super::error::{api_response, ApiError};
use super::session::Session;
use super::state::{GuardedPlatformStore, ServerState};
use crate::store::{RecordId, Tweet};

#[derive(Deserialize, Debug)]
struct TweetBody {
    content: Option<String>,
}

fn required_content(body: TweetBody) -> Result<String, ApiError> {
    body.content
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ApiError::InvalidArgument("Tweet content is required".to_string()))
}

fn owned_tweet(
    store: &GuardedPlatformStore,
    session: &Session,
    tweet_id: &RecordId,
) -> Result<Tweet, ApiError> {
    let tweet = store
        .get_tweet(tweet_id)?
        .ok_or_else(|| ApiError::NotFound("Tweet does not exist".to_string()))?;
    if tweet.owner_id != session.user.id {
        return Err(ApiError::NotFound("Tweet does not exist".to_string()));
    }
    Ok(tweet)
}

async fn create_tweet(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Json(body): Json<TweetBody>,
) -> Result<Response, ApiError> {
    let content = required_content(body)?;

    let tweet = store.create_tweet(&session.user.id, &content)?;
    Ok(api_response(
        StatusCode::CREATED,
        tweet,
        "Tweet created successfully.",
    ))
}

async fn user_tweets(
    _session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id = RecordId::parse(&user_id)?;

    let tweets = store.user_tweets(&user_id)?;
    if tweets.is_empty() {
        return Err(ApiError::NotFound("No tweet found.".to_string()));
    }

    Ok(api_response(
        StatusCode::OK,
        tweets,
        "User tweets fetched successfully.",
    ))
}

async fn update_tweet(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(tweet_id): Path<String>,
    Json(body): Json<TweetBody>,
) -> Result<Response, ApiError> {
    let tweet_id = RecordId::parse(&tweet_id)?;
    let content = required_content(body)?;
    owned_tweet(&store, &session, &tweet_id)?;

    let tweet = store
        .update_tweet(&tweet_id, &content)?
        .ok_or_else(|| ApiError::NotFound("Tweet does not exist".to_string()))?;
    Ok(api_response(StatusCode::OK, tweet, "Tweet updated"))
}

async fn delete_tweet(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(tweet_id): Path<String>,
) -> Result<Response, ApiError> {
    let tweet_id = RecordId::parse(&tweet_id)?;
    owned_tweet(&store, &session, &tweet_id)?;

    let tweet = store
        .delete_tweet(&tweet_id)?
        .ok_or_else(|| ApiError::NotFound("Tweet does not exist".to_string()))?;
    Ok(api_response(StatusCode::OK, tweet, "Tweet deleted"))
}

pub fn tweet_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", post(create_tweet))
        .route("/user/{userId}", get(user_tweets))
        .route("/{tweetId}", patch(update_tweet).delete(delete_tweet))
        .with_state(state)
}
