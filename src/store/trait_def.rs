//! Storage traits, one per resource family, composed into [`PlatformStore`].
//!
//! Handlers receive an `Arc<dyn PlatformStore>`; the concrete SQLite
//! implementation lives in `store.rs`. All methods are synchronous and
//! return `anyhow::Result`; typed API errors are the transport layer's
//! concern.

use anyhow::Result;

use super::models::{
    ChannelStats, Comment, CommentSortKey, CommentWithRefs, Like, LikeTarget, LikedVideoEntry,
    NewVideo, Playlist, RecordId, Tweet, TweetWithOwner, Video, VideoListQuery, VideoUpdate,
    VideoWithOwner,
};
use super::pipeline::{Page, PageParams, SortDirection};
use crate::user::auth::{PasswordCredentials, SessionToken, SessionTokenValue};
use crate::user::{ChannelProfile, NewUser, OwnerSummary, User};

pub trait UserAccountStore: Send + Sync {
    /// Creates the user row and its password credentials in one
    /// transaction, returning the stored user.
    fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: &RecordId) -> Result<Option<User>>;

    /// Exact match on username or email, whichever hits first.
    fn find_by_username_or_email(&self, username: &str, email: &str) -> Result<Option<User>>;

    fn get_credentials(&self, user_id: &RecordId) -> Result<Option<PasswordCredentials>>;

    fn set_password(&self, credentials: &PasswordCredentials) -> Result<()>;

    fn update_profile(
        &self,
        user_id: &RecordId,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>>;

    fn set_avatar(&self, user_id: &RecordId, avatar_url: &str) -> Result<Option<User>>;

    fn set_cover_image(&self, user_id: &RecordId, cover_image_url: &str) -> Result<Option<User>>;

    /// `None` clears the stored refresh token (logout).
    fn set_refresh_token(&self, user_id: &RecordId, refresh_token: Option<&str>) -> Result<()>;

    fn find_user_by_refresh_token(&self, refresh_token: &str) -> Result<Option<User>>;

    /// Public channel profile with subscriber/subscription counts and the
    /// viewer's membership flag. Returns Ok(None) for an unknown username.
    fn channel_profile(
        &self,
        username: &str,
        viewer: Option<&RecordId>,
    ) -> Result<Option<ChannelProfile>>;

    /// Appends a video to the user's watch history.
    fn record_watch(&self, user_id: &RecordId, video_id: &RecordId) -> Result<()>;

    /// The user's watch history, most recent first, each entry joined with
    /// the video's owner.
    fn watch_history(&self, user_id: &RecordId) -> Result<Vec<VideoWithOwner>>;
}

pub trait SessionTokenStore: Send + Sync {
    fn add_session_token(&self, user_id: &RecordId, value: &SessionTokenValue) -> Result<()>;

    /// Returns Ok(None) if the token does not exist.
    fn get_session_token(&self, value: &SessionTokenValue) -> Result<Option<SessionToken>>;

    fn touch_session_token(&self, value: &SessionTokenValue) -> Result<()>;

    fn delete_session_token(&self, value: &SessionTokenValue) -> Result<Option<SessionToken>>;
}

pub trait VideoStore: Send + Sync {
    /// Inserts the video and returns it re-read through the owner join, so
    /// the create response and a later read share one shape.
    fn create_video(&self, new_video: NewVideo) -> Result<VideoWithOwner>;

    fn get_video_with_owner(&self, video_id: &RecordId) -> Result<Option<VideoWithOwner>>;

    fn list_videos(
        &self,
        query: &VideoListQuery,
        page: &PageParams,
    ) -> Result<Page<VideoWithOwner>>;

    fn update_video(
        &self,
        video_id: &RecordId,
        update: &VideoUpdate,
    ) -> Result<Option<VideoWithOwner>>;

    /// Deletes the row and returns it, so the caller can both answer the
    /// request and clean up the referenced blobs.
    fn delete_video(&self, video_id: &RecordId) -> Result<Option<Video>>;

    fn toggle_publish(&self, video_id: &RecordId) -> Result<Option<VideoWithOwner>>;

    fn increment_views(&self, video_id: &RecordId) -> Result<()>;

    /// Total number of stored videos, used to seed the metrics gauge.
    fn video_count(&self) -> Result<usize>;

    /// Owner-scoped aggregates for the dashboard.
    fn channel_stats(&self, user_id: &RecordId) -> Result<ChannelStats>;

    fn channel_videos(&self, user_id: &RecordId) -> Result<Vec<Video>>;
}

pub trait CommentStore: Send + Sync {
    fn add_comment(
        &self,
        video_id: &RecordId,
        owner_id: &RecordId,
        content: &str,
    ) -> Result<CommentWithRefs>;

    fn video_comments(
        &self,
        video_id: &RecordId,
        sort_key: CommentSortKey,
        direction: SortDirection,
        page: &PageParams,
    ) -> Result<Page<CommentWithRefs>>;

    fn get_comment(&self, comment_id: &RecordId) -> Result<Option<Comment>>;

    fn update_comment(&self, comment_id: &RecordId, content: &str)
        -> Result<Option<CommentWithRefs>>;

    fn delete_comment(&self, comment_id: &RecordId) -> Result<Option<Comment>>;
}

pub trait LikeStore: Send + Sync {
    fn find_like(&self, user_id: &RecordId, target: &LikeTarget) -> Result<Option<Like>>;

    fn insert_like(&self, user_id: &RecordId, target: &LikeTarget) -> Result<Like>;

    fn delete_like(&self, like_id: &RecordId) -> Result<Option<Like>>;

    /// The user's liked videos, newest like first, each joined with the
    /// video and its owner.
    fn liked_videos(&self, user_id: &RecordId) -> Result<Vec<LikedVideoEntry>>;
}

pub trait SubscriptionStore: Send + Sync {
    fn find_subscription(
        &self,
        subscriber_id: &RecordId,
        channel_id: &RecordId,
    ) -> Result<Option<super::models::Subscription>>;

    fn insert_subscription(
        &self,
        subscriber_id: &RecordId,
        channel_id: &RecordId,
    ) -> Result<super::models::Subscription>;

    fn delete_subscription(&self, subscription_id: &RecordId) -> Result<()>;

    /// Profiles of the users subscribed to a channel.
    fn channel_subscribers(&self, channel_id: &RecordId) -> Result<Vec<OwnerSummary>>;

    /// Profiles of the channels a user has subscribed to.
    fn subscribed_channels(&self, subscriber_id: &RecordId) -> Result<Vec<OwnerSummary>>;
}

pub trait PlaylistStore: Send + Sync {
    fn create_playlist(
        &self,
        owner_id: &RecordId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Playlist>;

    fn get_playlist(&self, playlist_id: &RecordId) -> Result<Option<Playlist>>;

    fn user_playlists(&self, owner_id: &RecordId) -> Result<Vec<Playlist>>;

    fn update_playlist(
        &self,
        playlist_id: &RecordId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Playlist>>;

    fn delete_playlist(&self, playlist_id: &RecordId) -> Result<Option<Playlist>>;

    /// Set-like add: adding a video that is already a member leaves the
    /// playlist unchanged.
    fn add_playlist_video(
        &self,
        playlist_id: &RecordId,
        video_id: &RecordId,
    ) -> Result<Option<Playlist>>;

    fn remove_playlist_video(
        &self,
        playlist_id: &RecordId,
        video_id: &RecordId,
    ) -> Result<Option<Playlist>>;
}

pub trait TweetStore: Send + Sync {
    fn create_tweet(&self, owner_id: &RecordId, content: &str) -> Result<TweetWithOwner>;

    fn user_tweets(&self, owner_id: &RecordId) -> Result<Vec<TweetWithOwner>>;

    fn get_tweet(&self, tweet_id: &RecordId) -> Result<Option<Tweet>>;

    fn update_tweet(&self, tweet_id: &RecordId, content: &str) -> Result<Option<TweetWithOwner>>;

    fn delete_tweet(&self, tweet_id: &RecordId) -> Result<Option<TweetWithOwner>>;
}

pub trait HealthStore: Send + Sync {
    /// Store connectivity probe for the healthcheck endpoint.
    fn ping(&self) -> Result<()>;
}

/// The full storage surface handlers depend on.
pub trait PlatformStore:
    UserAccountStore
    + SessionTokenStore
    + VideoStore
    + CommentStore
    + LikeStore
    + SubscriptionStore
    + PlaylistStore
    + TweetStore
    + HealthStore
{
}

impl<T> PlatformStore for T where
    T: UserAccountStore
        + SessionTokenStore
        + VideoStore
        + CommentStore
        + LikeStore
        + SubscriptionStore
        + PlaylistStore
        + TweetStore
        + HealthStore
{
}
