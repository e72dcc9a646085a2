//! HTTP client for end-to-end tests
//!
//! A high-level client wrapping reqwest with one method per endpoint.
//! Sessions ride on the Authorization header: the login cookies carry the
//! Secure attribute, which a strict cookie jar refuses to replay over
//! plain http, so the client stashes the token pair from the login body
//! instead. When routes or request formats change, update only this file.

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;

use super::constants::*;

/// Reads a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    response.json().await.expect("Response body was not JSON")
}

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    access_token: Mutex<Option<String>>,
    refresh_token: Mutex<Option<String>>,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            access_token: Mutex::new(None),
            refresh_token: Mutex::new(None),
        }
    }

    /// Creates a client pre-authenticated as the seeded regular user.
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        let client = Self::new(base_url);
        client.login_session(TEST_USER, TEST_PASS).await;
        client
    }

    /// Creates a client pre-authenticated as the seeded creator user.
    pub async fn authenticated_creator(base_url: String) -> Self {
        let client = Self::new(base_url);
        client.login_session(CREATOR_USER, CREATOR_PASS).await;
        client
    }

    /// Logs in and stashes the returned token pair for later requests.
    /// Returns the login response body.
    pub async fn login_session(&self, username: &str, password: &str) -> serde_json::Value {
        let response = self.login(username, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Authentication as {} failed",
            username
        );
        let body = body_json(response).await;

        let access = body["data"]["accessToken"]
            .as_str()
            .expect("Login body had no accessToken")
            .to_string();
        let refresh = body["data"]["refreshToken"]
            .as_str()
            .expect("Login body had no refreshToken")
            .to_string();
        *self.access_token.lock().unwrap() = Some(access);
        *self.refresh_token.lock().unwrap() = Some(refresh);

        body
    }

    /// The currently stashed refresh token, if any.
    pub fn stashed_refresh_token(&self) -> Option<String> {
        self.refresh_token.lock().unwrap().clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.access_token.lock().unwrap().as_ref() {
            Some(token) => builder.header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token),
            ),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Response {
        self.authorize(builder)
            .send()
            .await
            .unwrap_or_else(|err| panic!("{} request failed: {}", what, err))
    }

    // ========================================================================
    // User & Session Endpoints
    // ========================================================================

    fn register_form(username: &str, email: &str, password: &str, with_cover: bool) -> Form {
        let mut form = Form::new()
            .text("username", username.to_string())
            .text("email", email.to_string())
            .text("fullName", format!("Full {}", username))
            .text("password", password.to_string())
            .part(
                "avatar",
                Part::bytes(TEST_IMAGE_BYTES.to_vec()).file_name("avatar.jpg"),
            );
        if with_cover {
            form = form.part(
                "coverImage",
                Part::bytes(TEST_IMAGE_BYTES.to_vec()).file_name("cover.jpg"),
            );
        }
        form
    }

    /// POST /api/v1/users/register
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Response {
        let builder = self
            .client
            .post(self.url("/users/register"))
            .multipart(Self::register_form(username, email, password, true));
        self.send(builder, "Register").await
    }

    /// POST /api/v1/users/register without the required avatar part
    pub async fn register_without_avatar(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Response {
        let form = Form::new()
            .text("username", username.to_string())
            .text("email", email.to_string())
            .text("fullName", format!("Full {}", username))
            .text("password", password.to_string());
        let builder = self.client.post(self.url("/users/register")).multipart(form);
        self.send(builder, "Register").await
    }

    /// POST /api/v1/users/login
    pub async fn login(&self, username: &str, password: &str) -> Response {
        let builder = self
            .client
            .post(self.url("/users/login"))
            .json(&json!({ "username": username, "password": password }));
        self.send(builder, "Login").await
    }

    /// POST /api/v1/users/logout
    pub async fn logout(&self) -> Response {
        let builder = self.client.post(self.url("/users/logout"));
        self.send(builder, "Logout").await
    }

    /// POST /api/v1/users/refresh-token (sends the stashed refresh token)
    pub async fn refresh_token(&self) -> Response {
        let refresh = self.stashed_refresh_token();
        let builder = self
            .client
            .post(self.url("/users/refresh-token"))
            .json(&json!({ "refreshToken": refresh }));
        self.send(builder, "Refresh").await
    }

    /// POST /api/v1/users/change-password
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Response {
        let builder = self
            .client
            .post(self.url("/users/change-password"))
            .json(&json!({ "oldPassword": old_password, "newPassword": new_password }));
        self.send(builder, "Change-password").await
    }

    /// GET /api/v1/users/me
    pub async fn me(&self) -> Response {
        self.send(self.client.get(self.url("/users/me")), "Me").await
    }

    /// PATCH /api/v1/users/me
    pub async fn update_profile(&self, full_name: &str, email: &str) -> Response {
        let builder = self
            .client
            .patch(self.url("/users/me"))
            .json(&json!({ "fullName": full_name, "email": email }));
        self.send(builder, "Update-profile").await
    }

    /// PATCH /api/v1/users/avatar
    pub async fn update_avatar(&self) -> Response {
        let form = Form::new().part(
            "avatar",
            Part::bytes(TEST_IMAGE_BYTES.to_vec()).file_name("avatar2.jpg"),
        );
        let builder = self.client.patch(self.url("/users/avatar")).multipart(form);
        self.send(builder, "Update-avatar").await
    }

    /// GET /api/v1/users/channel/{username}
    pub async fn channel(&self, username: &str) -> Response {
        let builder = self
            .client
            .get(self.url(&format!("/users/channel/{}", username)));
        self.send(builder, "Channel").await
    }

    /// GET /api/v1/users/history
    pub async fn watch_history(&self) -> Response {
        self.send(self.client.get(self.url("/users/history")), "History")
            .await
    }

    // ========================================================================
    // Video Endpoints
    // ========================================================================

    /// POST /api/v1/videos
    pub async fn publish_video(&self, title: &str, description: &str) -> Response {
        let form = Form::new()
            .text("title", title.to_string())
            .text("description", description.to_string())
            .text("duration", "12.5")
            .part(
                "videoFile",
                Part::bytes(TEST_VIDEO_BYTES.to_vec()).file_name("video.mp4"),
            )
            .part(
                "thumbnail",
                Part::bytes(TEST_IMAGE_BYTES.to_vec()).file_name("thumb.jpg"),
            );
        let builder = self.client.post(self.url("/videos")).multipart(form);
        self.send(builder, "Publish").await
    }

    /// GET /api/v1/videos with raw query parameters
    pub async fn list_videos(&self, query: &[(&str, &str)]) -> Response {
        let builder = self.client.get(self.url("/videos")).query(query);
        self.send(builder, "List-videos").await
    }

    /// GET /api/v1/videos/{id}
    pub async fn get_video(&self, video_id: &str) -> Response {
        let builder = self.client.get(self.url(&format!("/videos/{}", video_id)));
        self.send(builder, "Get-video").await
    }

    /// PATCH /api/v1/videos/{id}
    pub async fn update_video_title(&self, video_id: &str, title: &str) -> Response {
        let form = Form::new().text("title", title.to_string());
        let builder = self
            .client
            .patch(self.url(&format!("/videos/{}", video_id)))
            .multipart(form);
        self.send(builder, "Update-video").await
    }

    /// DELETE /api/v1/videos/{id}
    pub async fn delete_video(&self, video_id: &str) -> Response {
        let builder = self
            .client
            .delete(self.url(&format!("/videos/{}", video_id)));
        self.send(builder, "Delete-video").await
    }

    /// PATCH /api/v1/videos/{id}/toggle-publish
    pub async fn toggle_publish(&self, video_id: &str) -> Response {
        let builder = self
            .client
            .patch(self.url(&format!("/videos/{}/toggle-publish", video_id)));
        self.send(builder, "Toggle-publish").await
    }

    // ========================================================================
    // Comment Endpoints
    // ========================================================================

    /// GET /api/v1/comments/{videoId}
    pub async fn video_comments(&self, video_id: &str, query: &[(&str, &str)]) -> Response {
        let builder = self
            .client
            .get(self.url(&format!("/comments/{}", video_id)))
            .query(query);
        self.send(builder, "Comments").await
    }

    /// POST /api/v1/comments/{videoId}
    pub async fn add_comment(&self, video_id: &str, content: &str) -> Response {
        let builder = self
            .client
            .post(self.url(&format!("/comments/{}", video_id)))
            .json(&json!({ "content": content }));
        self.send(builder, "Add-comment").await
    }

    /// PATCH /api/v1/comments/{commentId}
    pub async fn update_comment(&self, comment_id: &str, content: &str) -> Response {
        let builder = self
            .client
            .patch(self.url(&format!("/comments/{}", comment_id)))
            .json(&json!({ "content": content }));
        self.send(builder, "Update-comment").await
    }

    /// DELETE /api/v1/comments/{commentId}
    pub async fn delete_comment(&self, comment_id: &str) -> Response {
        let builder = self
            .client
            .delete(self.url(&format!("/comments/{}", comment_id)));
        self.send(builder, "Delete-comment").await
    }

    // ========================================================================
    // Like Endpoints
    // ========================================================================

    /// POST /api/v1/likes/video/{id}
    pub async fn toggle_video_like(&self, video_id: &str) -> Response {
        let builder = self
            .client
            .post(self.url(&format!("/likes/video/{}", video_id)));
        self.send(builder, "Video-like").await
    }

    /// POST /api/v1/likes/comment/{id}
    pub async fn toggle_comment_like(&self, comment_id: &str) -> Response {
        let builder = self
            .client
            .post(self.url(&format!("/likes/comment/{}", comment_id)));
        self.send(builder, "Comment-like").await
    }

    /// POST /api/v1/likes/tweet/{id}
    pub async fn toggle_tweet_like(&self, tweet_id: &str) -> Response {
        let builder = self
            .client
            .post(self.url(&format!("/likes/tweet/{}", tweet_id)));
        self.send(builder, "Tweet-like").await
    }

    /// GET /api/v1/likes/videos
    pub async fn liked_videos(&self) -> Response {
        self.send(self.client.get(self.url("/likes/videos")), "Liked-videos")
            .await
    }

    // ========================================================================
    // Subscription Endpoints
    // ========================================================================

    /// POST /api/v1/subscriptions/{channelId}
    pub async fn toggle_subscription(&self, channel_id: &str) -> Response {
        let builder = self
            .client
            .post(self.url(&format!("/subscriptions/{}", channel_id)));
        self.send(builder, "Subscription").await
    }

    /// GET /api/v1/subscriptions/subscribers/{channelId}
    pub async fn channel_subscribers(&self, channel_id: &str) -> Response {
        let builder = self
            .client
            .get(self.url(&format!("/subscriptions/subscribers/{}", channel_id)));
        self.send(builder, "Subscribers").await
    }

    /// GET /api/v1/subscriptions/channels/{subscriberId}
    pub async fn subscribed_channels(&self, subscriber_id: &str) -> Response {
        let builder = self
            .client
            .get(self.url(&format!("/subscriptions/channels/{}", subscriber_id)));
        self.send(builder, "Channels").await
    }

    // ========================================================================
    // Playlist Endpoints
    // ========================================================================

    /// POST /api/v1/playlists
    pub async fn create_playlist(&self, name: &str, description: Option<&str>) -> Response {
        let builder = self
            .client
            .post(self.url("/playlists"))
            .json(&json!({ "name": name, "description": description }));
        self.send(builder, "Create-playlist").await
    }

    /// GET /api/v1/playlists/user/{userId}
    pub async fn user_playlists(&self, user_id: &str) -> Response {
        let builder = self
            .client
            .get(self.url(&format!("/playlists/user/{}", user_id)));
        self.send(builder, "User-playlists").await
    }

    /// GET /api/v1/playlists/{id}
    pub async fn get_playlist(&self, playlist_id: &str) -> Response {
        let builder = self
            .client
            .get(self.url(&format!("/playlists/{}", playlist_id)));
        self.send(builder, "Get-playlist").await
    }

    /// PATCH /api/v1/playlists/{id}
    pub async fn update_playlist(&self, playlist_id: &str, name: &str) -> Response {
        let builder = self
            .client
            .patch(self.url(&format!("/playlists/{}", playlist_id)))
            .json(&json!({ "name": name }));
        self.send(builder, "Update-playlist").await
    }

    /// DELETE /api/v1/playlists/{id}
    pub async fn delete_playlist(&self, playlist_id: &str) -> Response {
        let builder = self
            .client
            .delete(self.url(&format!("/playlists/{}", playlist_id)));
        self.send(builder, "Delete-playlist").await
    }

    /// PATCH /api/v1/playlists/{playlistId}/add/{videoId}
    pub async fn add_playlist_video(&self, playlist_id: &str, video_id: &str) -> Response {
        let builder = self
            .client
            .patch(self.url(&format!("/playlists/{}/add/{}", playlist_id, video_id)));
        self.send(builder, "Add-playlist-video").await
    }

    /// PATCH /api/v1/playlists/{playlistId}/remove/{videoId}
    pub async fn remove_playlist_video(&self, playlist_id: &str, video_id: &str) -> Response {
        let builder = self.client.patch(self.url(&format!(
            "/playlists/{}/remove/{}",
            playlist_id, video_id
        )));
        self.send(builder, "Remove-playlist-video").await
    }

    // ========================================================================
    // Tweet Endpoints
    // ========================================================================

    /// POST /api/v1/tweets
    pub async fn create_tweet(&self, content: &str) -> Response {
        let builder = self
            .client
            .post(self.url("/tweets"))
            .json(&json!({ "content": content }));
        self.send(builder, "Create-tweet").await
    }

    /// GET /api/v1/tweets/user/{userId}
    pub async fn user_tweets(&self, user_id: &str) -> Response {
        let builder = self
            .client
            .get(self.url(&format!("/tweets/user/{}", user_id)));
        self.send(builder, "User-tweets").await
    }

    /// PATCH /api/v1/tweets/{id}
    pub async fn update_tweet(&self, tweet_id: &str, content: &str) -> Response {
        let builder = self
            .client
            .patch(self.url(&format!("/tweets/{}", tweet_id)))
            .json(&json!({ "content": content }));
        self.send(builder, "Update-tweet").await
    }

    /// DELETE /api/v1/tweets/{id}
    pub async fn delete_tweet(&self, tweet_id: &str) -> Response {
        let builder = self
            .client
            .delete(self.url(&format!("/tweets/{}", tweet_id)));
        self.send(builder, "Delete-tweet").await
    }

    // ========================================================================
    // Dashboard & Healthcheck Endpoints
    // ========================================================================

    /// GET /api/v1/dashboard/stats
    pub async fn dashboard_stats(&self) -> Response {
        self.send(self.client.get(self.url("/dashboard/stats")), "Stats")
            .await
    }

    /// GET /api/v1/dashboard/videos
    pub async fn dashboard_videos(&self) -> Response {
        self.send(
            self.client.get(self.url("/dashboard/videos")),
            "Dashboard-videos",
        )
        .await
    }

    /// GET /api/v1/healthcheck
    pub async fn healthcheck(&self) -> Response {
        self.send(self.client.get(self.url("/healthcheck")), "Healthcheck")
            .await
    }
}
