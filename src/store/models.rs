//! Stored-content models and the record identifier type.

use rand::Rng;
use rand_distr::Alphanumeric;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::user::OwnerSummary;

pub const RECORD_ID_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid record id: {0:?}")]
pub struct InvalidRecordId(pub String);

/// Identifier of a stored record: exactly 16 ASCII alphanumerics.
///
/// Every caller-supplied id goes through [`RecordId::parse`] before it is
/// used in a query; anything else never reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn parse<S: AsRef<str>>(raw: S) -> Result<Self, InvalidRecordId> {
        let raw = raw.as_ref();
        if raw.len() == RECORD_ID_LEN && raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(RecordId(raw.to_string()))
        } else {
            Err(InvalidRecordId(raw.to_string()))
        }
    }

    /// A random A-z0-9 identifier.
    pub fn generate() -> Self {
        let bytes = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(RECORD_ID_LEN)
            .collect::<Vec<u8>>();
        RecordId(String::from_utf8_lossy(&bytes).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        RecordId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl ToSql for RecordId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for RecordId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = String::column_result(value)?;
        RecordId::parse(&raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub video_url: String,
    pub thumbnail_url: String,
    pub title: String,
    pub description: String,
    pub duration_secs: f64,
    pub views: i64,
    pub published: bool,
    pub created: i64,
    pub updated: Option<i64>,
}

/// A video with its owner flattened in through the reduced user projection.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithOwner {
    #[serde(flatten)]
    pub video: Video,
    pub owner: OwnerSummary,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub owner_id: RecordId,
    pub video_url: String,
    pub thumbnail_url: String,
    pub title: String,
    pub description: String,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Default)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Caller-selectable sort field for video listings. Parsing against this
/// enum is what keeps arbitrary field names out of the ORDER BY clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSortKey {
    #[default]
    Created,
    Views,
    Duration,
    Title,
}

impl VideoSortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" | "created" => Some(VideoSortKey::Created),
            "views" => Some(VideoSortKey::Views),
            "duration" => Some(VideoSortKey::Duration),
            "title" => Some(VideoSortKey::Title),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            VideoSortKey::Created => "v.created",
            VideoSortKey::Views => "v.views",
            VideoSortKey::Duration => "v.duration_secs",
            VideoSortKey::Title => "v.title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSortKey {
    #[default]
    Created,
    Updated,
}

impl CommentSortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" | "created" => Some(CommentSortKey::Created),
            "updatedAt" | "updated" => Some(CommentSortKey::Updated),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            CommentSortKey::Created => "c.created",
            CommentSortKey::Updated => "c.updated",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoListQuery {
    pub owner: Option<RecordId>,
    /// Case-insensitive substring over title and description.
    pub search: Option<String>,
    pub sort_key: VideoSortKey,
    pub direction: super::pipeline::SortDirection,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: RecordId,
    pub video_id: RecordId,
    pub owner_id: RecordId,
    pub content: String,
    pub created: i64,
    pub updated: Option<i64>,
}

/// Reduced video projection embedded in comment listings.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentVideoSummary {
    pub title: String,
    pub description: String,
    pub duration_secs: f64,
    pub thumbnail_url: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithRefs {
    pub id: RecordId,
    pub content: String,
    pub created: i64,
    pub video: CommentVideoSummary,
    pub owner: OwnerSummary,
}

/// The one-of-three target a like row points at. The row's existence is
/// the liked state; there is no boolean field anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeTarget {
    Video(RecordId),
    Comment(RecordId),
    Tweet(RecordId),
}

impl LikeTarget {
    pub fn column(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "video_id",
            LikeTarget::Comment(_) => "comment_id",
            LikeTarget::Tweet(_) => "tweet_id",
        }
    }

    pub fn id(&self) -> &RecordId {
        match self {
            LikeTarget::Video(id) | LikeTarget::Comment(id) | LikeTarget::Tweet(id) => id,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: RecordId,
    pub user_id: RecordId,
    pub video_id: Option<RecordId>,
    pub comment_id: Option<RecordId>,
    pub tweet_id: Option<RecordId>,
    pub created: i64,
}

/// One entry of a user's liked-videos listing: the like row plus the video
/// it points at, joined with the video's owner.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LikedVideoEntry {
    pub like_id: RecordId,
    pub liked_at: i64,
    pub video: VideoWithOwner,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: RecordId,
    pub subscriber_id: RecordId,
    pub channel_id: RecordId,
    pub created: i64,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub video_ids: Vec<RecordId>,
    pub created: i64,
    pub updated: Option<i64>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub content: String,
    pub created: i64,
    pub updated: Option<i64>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TweetWithOwner {
    #[serde(flatten)]
    pub tweet: Tweet,
    pub owner: OwnerSummary,
}

/// Owner-scoped aggregates for the dashboard.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_subscribers: i64,
    pub total_videos: i64,
    pub total_views: i64,
    pub total_likes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_accepts_generated_ids() {
        for _ in 0..32 {
            let id = RecordId::generate();
            assert_eq!(RecordId::parse(id.as_str()), Ok(id.clone()));
        }
    }

    #[test]
    fn record_id_rejects_malformed_input() {
        for raw in [
            "",
            "short",
            "way-too-long-for-a-record-id",
            "has spaces here!",
            "semi;colon-inject",
            "abcdefgh1234567", // 15 chars
            "abcdefgh12345678Z", // 17 chars
            "abcdefgh1234567_", // non-alphanumeric
        ] {
            assert!(RecordId::parse(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn video_sort_key_whitelist() {
        assert_eq!(VideoSortKey::parse("views"), Some(VideoSortKey::Views));
        assert_eq!(VideoSortKey::parse("createdAt"), Some(VideoSortKey::Created));
        assert_eq!(VideoSortKey::parse("owner_id; DROP TABLE video"), None);
        assert_eq!(VideoSortKey::parse("password"), None);
    }
}
