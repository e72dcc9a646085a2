//! End-to-end tests for video publishing, listing, pagination, views and
//! the watch history side effects.

mod common;

use common::{body_json, TestClient, TestServer};
use reqwest::StatusCode;

async fn publish(client: &TestClient, title: &str) -> String {
    let response = client.publish_video(title, "some description").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_publish_and_read_share_one_shape() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.publish_video("Shape check", "same shape").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;

    let video_id = created["data"]["id"].as_str().unwrap();
    let read = body_json(client.get_video(video_id).await).await;

    // The create response and a later read expose the same field set.
    let created_keys: Vec<&str> = created["data"].as_object().unwrap().keys().map(String::as_str).collect();
    let read_keys: Vec<&str> = read["data"].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(created_keys, read_keys);

    assert_eq!(read["data"]["title"], "Shape check");
    assert_eq!(read["data"]["owner"]["username"], "testuser");
    assert!(read["data"]["videoUrl"].as_str().unwrap().starts_with("/media/"));
}

#[tokio::test]
async fn test_get_video_with_malformed_id() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_video("not-a-valid-id").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Validation short-circuits before any store access: nothing was
    // recorded in the watch history.
    let body = body_json(client.watch_history().await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_get_missing_video() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_video("abcdefgh12345678").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_pagination_metadata() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    for i in 0..3 {
        publish(&client, &format!("video {}", i)).await;
    }

    let body = body_json(client.list_videos(&[("page", "1"), ("limit", "2")]).await).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["totalItems"], 3);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["hasNextPage"], true);
    assert_eq!(body["data"]["hasPrevPage"], false);

    let body = body_json(client.list_videos(&[("page", "2"), ("limit", "2")]).await).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["hasNextPage"], false);
    assert_eq!(body["data"]["hasPrevPage"], true);
}

#[tokio::test]
async fn test_list_defaults_on_garbage_pagination_input() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    publish(&client, "lonely video").await;

    let body = body_json(
        client
            .list_videos(&[("page", "abc"), ("limit", "-5")])
            .await,
    )
    .await;
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["limit"], 10);
}

#[tokio::test]
async fn test_list_empty_is_ok_with_empty_page() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.list_videos(&[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["totalItems"], 0);
    assert_eq!(body["data"]["totalPages"], 0);
}

#[tokio::test]
async fn test_list_rejects_unknown_sort_field() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.list_videos(&[("sortBy", "owner_id; DROP")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_filters_by_owner_and_search() {
    let server = TestServer::spawn().await;
    let viewer = TestClient::authenticated(server.base_url.clone()).await;
    let creator = TestClient::authenticated_creator(server.base_url.clone()).await;

    publish(&viewer, "viewer video").await;
    publish(&creator, "creator special video").await;

    let creator_id = server.creator_user.id.to_string();
    let body = body_json(viewer.list_videos(&[("userId", &creator_id)]).await).await;
    assert_eq!(body["data"]["totalItems"], 1);
    assert_eq!(body["data"]["items"][0]["owner"]["username"], "creator");

    let body = body_json(viewer.list_videos(&[("query", "special")]).await).await;
    assert_eq!(body["data"]["totalItems"], 1);
    assert_eq!(body["data"]["items"][0]["title"], "creator special video");
}

#[tokio::test]
async fn test_views_increment_and_watch_history() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let video_id = publish(&client, "watched video").await;

    let first = body_json(client.get_video(&video_id).await).await;
    assert_eq!(first["data"]["views"], 1);
    let second = body_json(client.get_video(&video_id).await).await;
    assert_eq!(second["data"]["views"], 2);

    let history = body_json(client.watch_history().await).await;
    let entries = history["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], video_id.as_str());
    assert_eq!(entries[0]["owner"]["username"], "testuser");
}

#[tokio::test]
async fn test_update_delete_and_toggle_publish() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let video_id = publish(&client, "mutable video").await;

    let body = body_json(client.update_video_title(&video_id, "renamed").await).await;
    assert_eq!(body["data"]["title"], "renamed");

    let body = body_json(client.toggle_publish(&video_id).await).await;
    assert_eq!(body["data"]["published"], false);
    let body = body_json(client.toggle_publish(&video_id).await).await;
    assert_eq!(body["data"]["published"], true);

    let response = client.delete_video(&video_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get_video(&video_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_foreign_video_cannot_be_mutated() {
    let server = TestServer::spawn().await;
    let viewer = TestClient::authenticated(server.base_url.clone()).await;
    let creator = TestClient::authenticated_creator(server.base_url.clone()).await;

    let video_id = publish(&creator, "creator's video").await;

    let response = viewer.update_video_title(&video_id, "hijacked").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = viewer.delete_video(&video_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Still there for its owner.
    let response = creator.get_video(&video_id).await;
    assert_eq!(response.status(), StatusCode::OK);
}
