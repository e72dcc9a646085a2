//! End-to-end tests for subscription toggles and the two listings.

mod common;

use common::{body_json, TestClient, TestServer};
use reqwest::StatusCode;

#[tokio::test]
async fn test_subscription_toggle_roundtrip() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let channel_id = server.creator_user.id.to_string();
    let subscriber_id = server.test_user.id.to_string();

    // Absent -> present.
    let response = client.toggle_subscription(&channel_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["channel"]["username"], "creator");
    assert_eq!(body["data"]["subscription"]["channelId"], channel_id.as_str());

    let body = body_json(client.channel_subscribers(&channel_id).await).await;
    let subscribers = body["data"].as_array().unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["username"], "testuser");

    let body = body_json(client.subscribed_channels(&subscriber_id).await).await;
    let channels = body["data"].as_array().unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0]["username"], "creator");

    // Present -> absent.
    let response = client.toggle_subscription(&channel_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Empty listings are a 404 by contract.
    let response = client.channel_subscribers(&channel_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = client.subscribed_channels(&subscriber_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_self_subscription_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let own_id = server.test_user.id.to_string();
    let response = client.toggle_subscription(&own_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscription_to_unknown_channel() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.toggle_subscription("abcdefgh12345678").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscription_with_malformed_channel_id() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.toggle_subscription("bogus id").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was written.
    let own_id = server.test_user.id.to_string();
    let response = client.subscribed_channels(&own_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
