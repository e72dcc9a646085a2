//! End-to-end tests for comments: CRUD, joined response shape and
//! pagination.

mod common;

use common::{body_json, TestClient, TestServer};
use reqwest::StatusCode;

async fn publish(client: &TestClient, title: &str) -> String {
    let body = body_json(client.publish_video(title, "description").await).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_add_comment_returns_joined_shape() {
    let server = TestServer::spawn().await;
    let creator = TestClient::authenticated_creator(server.base_url.clone()).await;
    let viewer = TestClient::authenticated(server.base_url.clone()).await;

    let video_id = publish(&creator, "video with comments").await;

    let response = viewer.add_comment(&video_id, "nice one").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["content"], "nice one");
    assert_eq!(body["data"]["video"]["title"], "video with comments");
    assert_eq!(body["data"]["owner"]["username"], "testuser");
}

#[tokio::test]
async fn test_comment_list_pagination() {
    let server = TestServer::spawn().await;
    let creator = TestClient::authenticated_creator(server.base_url.clone()).await;

    let video_id = publish(&creator, "busy video").await;
    for i in 0..5 {
        let response = creator.add_comment(&video_id, &format!("comment {}", i)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body = body_json(
        creator
            .video_comments(&video_id, &[("page", "1"), ("limit", "3")])
            .await,
    )
    .await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["totalItems"], 5);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["hasNextPage"], true);

    // An uncommented video paginates to an empty 200 page.
    let other_video = publish(&creator, "quiet video").await;
    let response = creator.video_comments(&other_video, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["totalItems"], 0);
}

#[tokio::test]
async fn test_comment_on_missing_video() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.add_comment("abcdefgh12345678", "hello?").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_with_malformed_video_id() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.add_comment("nope", "hello?").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_comment_is_rejected() {
    let server = TestServer::spawn().await;
    let creator = TestClient::authenticated_creator(server.base_url.clone()).await;

    let video_id = publish(&creator, "strict video").await;
    let response = creator.add_comment(&video_id, "   ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_delete_own_comment() {
    let server = TestServer::spawn().await;
    let creator = TestClient::authenticated_creator(server.base_url.clone()).await;

    let video_id = publish(&creator, "editable comments").await;
    let comment = body_json(creator.add_comment(&video_id, "v1").await).await;
    let comment_id = comment["data"]["id"].as_str().unwrap().to_string();

    let body = body_json(creator.update_comment(&comment_id, "v2").await).await;
    assert_eq!(body["data"]["content"], "v2");

    let response = creator.delete_comment(&comment_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = creator.update_comment(&comment_id, "v3").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_foreign_comment_cannot_be_mutated() {
    let server = TestServer::spawn().await;
    let creator = TestClient::authenticated_creator(server.base_url.clone()).await;
    let viewer = TestClient::authenticated(server.base_url.clone()).await;

    let video_id = publish(&creator, "contested video").await;
    let comment = body_json(creator.add_comment(&video_id, "mine").await).await;
    let comment_id = comment["data"]["id"].as_str().unwrap().to_string();

    let response = viewer.update_comment(&comment_id, "hijacked").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = viewer.delete_comment(&comment_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
