//! End-to-end tests for tweets.

mod common;

use common::{body_json, TestClient, TestServer};
use reqwest::StatusCode;

#[tokio::test]
async fn test_tweet_crud() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let user_id = server.test_user.id.to_string();

    let response = client.create_tweet("hello world").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let tweet_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["content"], "hello world");
    assert_eq!(body["data"]["owner"]["username"], "testuser");

    let body = body_json(client.user_tweets(&user_id).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let body = body_json(client.update_tweet(&tweet_id, "edited").await).await;
    assert_eq!(body["data"]["content"], "edited");

    let response = client.delete_tweet(&tweet_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Empty tweet listing is a 404 by contract.
    let response = client.user_tweets(&user_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tweets_are_listed_newest_first() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let user_id = server.test_user.id.to_string();

    for content in ["one", "two", "three"] {
        let response = client.create_tweet(content).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body = body_json(client.user_tweets(&user_id).await).await;
    let tweets = body["data"].as_array().unwrap();
    assert_eq!(tweets.len(), 3);
}

#[tokio::test]
async fn test_empty_tweet_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.create_tweet("").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_foreign_tweet_cannot_be_mutated() {
    let server = TestServer::spawn().await;
    let owner = TestClient::authenticated(server.base_url.clone()).await;
    let other = TestClient::authenticated_creator(server.base_url.clone()).await;

    let tweet = body_json(owner.create_tweet("mine").await).await;
    let tweet_id = tweet["data"]["id"].as_str().unwrap().to_string();

    let response = other.update_tweet(&tweet_id, "hijacked").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = other.delete_tweet(&tweet_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tweets_with_malformed_user_id() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.user_tweets("short").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
