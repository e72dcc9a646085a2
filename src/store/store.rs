//! SQLite implementation of the platform storage traits.
//!
//! Writes are plain parameterized statements; every joined read goes
//! through the [`Pipeline`] so all resources share the same
//! filter/join/derive/reshape/sort skeleton.

use anyhow::{Context, Result};
use rusqlite::{params, types::Value, Connection, Row};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
};

use super::models::*;
use super::pipeline::{Page, PageParams, Pipeline, SortDirection};
use super::schema::VERSIONED_SCHEMAS;
use super::trait_def::*;
use crate::sqlite_persistence::open_versioned_database;
use crate::user::auth::{PasswordCredentials, SessionToken, SessionTokenValue, ViewVaultHasher};
use crate::user::{ChannelProfile, NewUser, OwnerSummary, User};

const NOW: &str = "cast(strftime('%s','now') as int)";

const USER_COLUMNS: &str =
    "id, username, email, full_name, avatar_url, cover_image_url, created, updated";

const VIDEO_COLUMNS: &str = "id, owner_id, video_url, thumbnail_url, title, description, \
     duration_secs, views, published, created, updated";

/// Reshape whitelist for a video joined with its owner's reduced
/// projection. The password hash, salt and refresh token are not
/// selectable here by construction.
const VIDEO_WITH_OWNER_COLUMNS: &[&str] = &[
    "v.id",
    "v.owner_id",
    "v.video_url",
    "v.thumbnail_url",
    "v.title",
    "v.description",
    "v.duration_secs",
    "v.views",
    "v.published",
    "v.created",
    "v.updated",
    "u.id",
    "u.username",
    "u.full_name",
    "u.avatar_url",
];

fn map_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        avatar_url: row.get(4)?,
        cover_image_url: row.get(5)?,
        created: row.get(6)?,
        updated: row.get(7)?,
    })
}

fn map_video_row(row: &Row) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        video_url: row.get(2)?,
        thumbnail_url: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        duration_secs: row.get(6)?,
        views: row.get(7)?,
        published: row.get::<_, i64>(8)? != 0,
        created: row.get(9)?,
        updated: row.get(10)?,
    })
}

// Columns 0..=10 are the video, 11..=14 the owner projection.
fn map_video_with_owner_row(row: &Row) -> rusqlite::Result<VideoWithOwner> {
    Ok(VideoWithOwner {
        video: map_video_row(row)?,
        owner: OwnerSummary {
            id: row.get(11)?,
            username: row.get(12)?,
            full_name: row.get(13)?,
            avatar_url: row.get(14)?,
        },
    })
}

fn map_like_row(row: &Row) -> rusqlite::Result<Like> {
    Ok(Like {
        id: row.get(0)?,
        user_id: row.get(1)?,
        video_id: row.get(2)?,
        comment_id: row.get(3)?,
        tweet_id: row.get(4)?,
        created: row.get(5)?,
    })
}

fn map_owner_summary_row(row: &Row) -> rusqlite::Result<OwnerSummary> {
    Ok(OwnerSummary {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        avatar_url: row.get(3)?,
    })
}

#[derive(Clone)]
pub struct SqlitePlatformStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePlatformStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_database(db_path.as_ref(), VERSIONED_SCHEMAS)?;
        Ok(SqlitePlatformStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Fresh in-memory store with the latest schema, for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        VERSIONED_SCHEMAS
            .last()
            .expect("at least one schema version")
            .create(&conn)?;
        Ok(SqlitePlatformStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn video_with_owner_pipeline() -> Pipeline {
        Pipeline::over("video", "v")
            .reshape(VIDEO_WITH_OWNER_COLUMNS)
            .join_one("user", "u", "u.id = v.owner_id")
    }

    fn comment_with_refs_pipeline() -> Pipeline {
        Pipeline::over("comment", "c")
            .reshape(&[
                "c.id",
                "c.content",
                "c.created",
                "v.title",
                "v.description",
                "v.duration_secs",
                "v.thumbnail_url",
                "u.id",
                "u.username",
                "u.full_name",
                "u.avatar_url",
            ])
            .join_one("video", "v", "v.id = c.video_id")
            .join_one("user", "u", "u.id = c.owner_id")
    }

    fn map_comment_with_refs_row(row: &Row) -> rusqlite::Result<CommentWithRefs> {
        Ok(CommentWithRefs {
            id: row.get(0)?,
            content: row.get(1)?,
            created: row.get(2)?,
            video: CommentVideoSummary {
                title: row.get(3)?,
                description: row.get(4)?,
                duration_secs: row.get(5)?,
                thumbnail_url: row.get(6)?,
            },
            owner: OwnerSummary {
                id: row.get(7)?,
                username: row.get(8)?,
                full_name: row.get(9)?,
                avatar_url: row.get(10)?,
            },
        })
    }

    fn tweet_with_owner_pipeline() -> Pipeline {
        Pipeline::over("tweet", "t")
            .reshape(&[
                "t.id",
                "t.owner_id",
                "t.content",
                "t.created",
                "t.updated",
                "u.id",
                "u.username",
                "u.full_name",
                "u.avatar_url",
            ])
            .join_one("user", "u", "u.id = t.owner_id")
    }

    fn map_tweet_with_owner_row(row: &Row) -> rusqlite::Result<TweetWithOwner> {
        Ok(TweetWithOwner {
            tweet: Tweet {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                content: row.get(2)?,
                created: row.get(3)?,
                updated: row.get(4)?,
            },
            owner: OwnerSummary {
                id: row.get(5)?,
                username: row.get(6)?,
                full_name: row.get(7)?,
                avatar_url: row.get(8)?,
            },
        })
    }

    fn load_playlist(conn: &Connection, playlist_id: &RecordId) -> Result<Option<Playlist>> {
        let row = conn
            .query_row(
                "SELECT id, owner_id, name, description, created, updated \
                 FROM user_playlist WHERE id = ?1",
                params![playlist_id],
                |row| {
                    Ok((
                        row.get::<_, RecordId>(0)?,
                        row.get::<_, RecordId>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;

        let (id, owner_id, name, description, created, updated) = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            "SELECT video_id FROM user_playlist_video WHERE playlist_id = ?1 ORDER BY position",
        )?;
        let video_ids = stmt
            .query_map(params![id], |row| row.get::<_, RecordId>(0))?
            .collect::<Result<Vec<RecordId>, _>>()?;

        Ok(Some(Playlist {
            id,
            owner_id,
            name,
            description,
            video_ids,
            created,
            updated,
        }))
    }
}

impl UserAccountStore for SqlitePlatformStore {
    fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO user (id, username, email, full_name, avatar_url, cover_image_url) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new_user.id,
                new_user.username,
                new_user.email,
                new_user.full_name,
                new_user.avatar_url,
                new_user.cover_image_url,
            ],
        )
        .with_context(|| format!("Failed to create user {}", new_user.username))?;

        let credentials = &new_user.credentials;
        tx.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new_user.id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
            ],
        )?;

        let user = tx.query_row(
            &format!("SELECT {} FROM user WHERE id = ?1", USER_COLUMNS),
            params![new_user.id],
            map_user_row,
        )?;
        tx.commit()?;
        Ok(user)
    }

    fn get_user(&self, user_id: &RecordId) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                &format!("SELECT {} FROM user WHERE id = ?1", USER_COLUMNS),
                params![user_id],
                map_user_row,
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        Ok(user)
    }

    fn find_by_username_or_email(&self, username: &str, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM user WHERE username = ?1 OR email = ?2 LIMIT 1",
                    USER_COLUMNS
                ),
                params![username, email],
                map_user_row,
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        Ok(user)
    }

    fn get_credentials(&self, user_id: &RecordId) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let credentials = conn
            .query_row(
                "SELECT user_id, salt, hash, hasher FROM user_password_credentials \
                 WHERE user_id = ?1",
                params![user_id],
                |row| {
                    let hasher_raw: String = row.get(3)?;
                    let hasher = ViewVaultHasher::from_str(&hasher_raw).map_err(|err| {
                        rusqlite::Error::FromSqlConversionFailure(
                            3,
                            rusqlite::types::Type::Text,
                            err.into(),
                        )
                    })?;
                    Ok(PasswordCredentials {
                        user_id: row.get(0)?,
                        salt: row.get(1)?,
                        hash: row.get(2)?,
                        hasher,
                    })
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        Ok(credentials)
    }

    fn set_password(&self, credentials: &PasswordCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(user_id) DO UPDATE SET \
               salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
            ],
        )?;
        Ok(())
    }

    fn update_profile(
        &self,
        user_id: &RecordId,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn.execute(
                &format!(
                    "UPDATE user SET full_name = ?1, email = ?2, updated = {} WHERE id = ?3",
                    NOW
                ),
                params![full_name, email, user_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        self.get_user(user_id)
    }

    fn set_avatar(&self, user_id: &RecordId, avatar_url: &str) -> Result<Option<User>> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn.execute(
                &format!(
                    "UPDATE user SET avatar_url = ?1, updated = {} WHERE id = ?2",
                    NOW
                ),
                params![avatar_url, user_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        self.get_user(user_id)
    }

    fn set_cover_image(&self, user_id: &RecordId, cover_image_url: &str) -> Result<Option<User>> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn.execute(
                &format!(
                    "UPDATE user SET cover_image_url = ?1, updated = {} WHERE id = ?2",
                    NOW
                ),
                params![cover_image_url, user_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        self.get_user(user_id)
    }

    fn set_refresh_token(&self, user_id: &RecordId, refresh_token: Option<&str>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user SET refresh_token = ?1 WHERE id = ?2",
            params![refresh_token, user_id],
        )?;
        Ok(())
    }

    fn find_user_by_refresh_token(&self, refresh_token: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM user WHERE refresh_token = ?1",
                    USER_COLUMNS
                ),
                params![refresh_token],
                map_user_row,
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        Ok(user)
    }

    fn channel_profile(
        &self,
        username: &str,
        viewer: Option<&RecordId>,
    ) -> Result<Option<ChannelProfile>> {
        let conn = self.conn.lock().unwrap();

        let mut pipeline = Pipeline::over("user", "u")
            .reshape(&[
                "u.id",
                "u.username",
                "u.email",
                "u.full_name",
                "u.avatar_url",
                "u.cover_image_url",
            ])
            .derive(
                "SELECT COUNT(*) FROM subscription s WHERE s.channel_id = u.id",
                "subscriber_count",
                std::iter::empty::<Value>(),
            )
            .derive(
                "SELECT COUNT(*) FROM subscription s WHERE s.subscriber_id = u.id",
                "subscriptions",
                std::iter::empty::<Value>(),
            );
        pipeline = match viewer {
            Some(viewer) => pipeline.derive(
                "SELECT EXISTS(SELECT 1 FROM subscription s \
                 WHERE s.channel_id = u.id AND s.subscriber_id = ?)",
                "is_subscribed",
                [Value::from(viewer.to_string())],
            ),
            None => pipeline.derive("SELECT 0", "is_subscribed", std::iter::empty::<Value>()),
        };
        pipeline = pipeline.filter("u.username = ?", [Value::from(username.to_string())]);

        pipeline.fetch_one(&conn, |row| {
            Ok(ChannelProfile {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                full_name: row.get(3)?,
                avatar_url: row.get(4)?,
                cover_image_url: row.get(5)?,
                subscriber_count: row.get(6)?,
                subscriptions: row.get(7)?,
                is_subscribed: row.get::<_, i64>(8)? != 0,
            })
        })
    }

    fn record_watch(&self, user_id: &RecordId, video_id: &RecordId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO watch_history (user_id, video_id) VALUES (?1, ?2)",
            params![user_id, video_id],
        )?;
        Ok(())
    }

    fn watch_history(&self, user_id: &RecordId) -> Result<Vec<VideoWithOwner>> {
        let conn = self.conn.lock().unwrap();
        Pipeline::over("watch_history", "w")
            .reshape(VIDEO_WITH_OWNER_COLUMNS)
            .join_one("video", "v", "v.id = w.video_id")
            .join_one("user", "u", "u.id = v.owner_id")
            .filter("w.user_id = ?", [Value::from(user_id.to_string())])
            .sort("w.id", SortDirection::Descending)
            .fetch(&conn, map_video_with_owner_row)
    }
}

impl SessionTokenStore for SqlitePlatformStore {
    fn add_session_token(&self, user_id: &RecordId, value: &SessionTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value) VALUES (?1, ?2)",
            params![user_id, value.0],
        )?;
        Ok(())
    }

    fn get_session_token(&self, value: &SessionTokenValue) -> Result<Option<SessionToken>> {
        let conn = self.conn.lock().unwrap();
        let token = conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![value.0],
                |row| {
                    Ok(SessionToken {
                        user_id: row.get(0)?,
                        value: SessionTokenValue(row.get(1)?),
                        created: row.get(2)?,
                        last_used: row.get(3)?,
                    })
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        Ok(token)
    }

    fn touch_session_token(&self, value: &SessionTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE auth_token SET last_used = {} WHERE value = ?1",
                NOW
            ),
            params![value.0],
        )?;
        Ok(())
    }

    fn delete_session_token(&self, value: &SessionTokenValue) -> Result<Option<SessionToken>> {
        let token = self.get_session_token(value)?;
        if token.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM auth_token WHERE value = ?1", params![value.0])?;
        }
        Ok(token)
    }
}

impl VideoStore for SqlitePlatformStore {
    fn create_video(&self, new_video: NewVideo) -> Result<VideoWithOwner> {
        let video_id = RecordId::generate();
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO video \
                 (id, owner_id, video_url, thumbnail_url, title, description, duration_secs) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    video_id,
                    new_video.owner_id,
                    new_video.video_url,
                    new_video.thumbnail_url,
                    new_video.title,
                    new_video.description,
                    new_video.duration_secs,
                ],
            )
            .with_context(|| format!("Failed to create video {:?}", new_video.title))?;
        }
        self.get_video_with_owner(&video_id)?
            .context("Video row missing right after insert")
    }

    fn get_video_with_owner(&self, video_id: &RecordId) -> Result<Option<VideoWithOwner>> {
        let conn = self.conn.lock().unwrap();
        Self::video_with_owner_pipeline()
            .filter("v.id = ?", [Value::from(video_id.to_string())])
            .fetch_one(&conn, map_video_with_owner_row)
    }

    fn list_videos(
        &self,
        query: &VideoListQuery,
        page: &PageParams,
    ) -> Result<Page<VideoWithOwner>> {
        let conn = self.conn.lock().unwrap();

        let mut pipeline = Self::video_with_owner_pipeline();
        if let Some(owner) = &query.owner {
            pipeline = pipeline.filter("v.owner_id = ?", [Value::from(owner.to_string())]);
        }
        if let Some(search) = &query.search {
            let needle = format!("%{}%", search);
            pipeline = pipeline.filter(
                "v.title LIKE ? OR v.description LIKE ?",
                [Value::from(needle.clone()), Value::from(needle)],
            );
        }
        pipeline = pipeline.sort(query.sort_key.column(), query.direction);

        pipeline.paginate(&conn, page, map_video_with_owner_row)
    }

    fn update_video(
        &self,
        video_id: &RecordId,
        update: &VideoUpdate,
    ) -> Result<Option<VideoWithOwner>> {
        {
            let conn = self.conn.lock().unwrap();

            let mut assignments: Vec<String> = Vec::new();
            let mut values: Vec<Value> = Vec::new();
            if let Some(title) = &update.title {
                assignments.push(format!("title = ?{}", values.len() + 1));
                values.push(Value::from(title.clone()));
            }
            if let Some(description) = &update.description {
                assignments.push(format!("description = ?{}", values.len() + 1));
                values.push(Value::from(description.clone()));
            }
            if let Some(thumbnail_url) = &update.thumbnail_url {
                assignments.push(format!("thumbnail_url = ?{}", values.len() + 1));
                values.push(Value::from(thumbnail_url.clone()));
            }
            assignments.push(format!("updated = {}", NOW));
            values.push(Value::from(video_id.to_string()));

            let changed = conn.execute(
                &format!(
                    "UPDATE video SET {} WHERE id = ?{}",
                    assignments.join(", "),
                    values.len()
                ),
                rusqlite::params_from_iter(values.iter()),
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        self.get_video_with_owner(video_id)
    }

    fn delete_video(&self, video_id: &RecordId) -> Result<Option<Video>> {
        let conn = self.conn.lock().unwrap();
        let video = conn
            .query_row(
                &format!("SELECT {} FROM video WHERE id = ?1", VIDEO_COLUMNS),
                params![video_id],
                map_video_row,
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;

        if video.is_some() {
            // Comments, likes, playlist memberships and watch-history rows
            // cascade at the storage layer.
            conn.execute("DELETE FROM video WHERE id = ?1", params![video_id])?;
        }
        Ok(video)
    }

    fn toggle_publish(&self, video_id: &RecordId) -> Result<Option<VideoWithOwner>> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn.execute(
                &format!(
                    "UPDATE video SET published = 1 - published, updated = {} WHERE id = ?1",
                    NOW
                ),
                params![video_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        self.get_video_with_owner(video_id)
    }

    fn increment_views(&self, video_id: &RecordId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE video SET views = views + 1 WHERE id = ?1",
            params![video_id],
        )?;
        Ok(())
    }

    fn video_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM video", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn channel_stats(&self, user_id: &RecordId) -> Result<ChannelStats> {
        let conn = self.conn.lock().unwrap();

        let total_subscribers: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subscription WHERE channel_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let (total_videos, total_views): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(views), 0) FROM video WHERE owner_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let total_likes: i64 = conn.query_row(
            "SELECT COUNT(*) FROM user_like l \
             INNER JOIN video v ON v.id = l.video_id \
             WHERE v.owner_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(ChannelStats {
            total_subscribers,
            total_videos,
            total_views,
            total_likes,
        })
    }

    fn channel_videos(&self, user_id: &RecordId) -> Result<Vec<Video>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM video WHERE owner_id = ?1 ORDER BY created DESC",
            VIDEO_COLUMNS
        ))?;
        let videos = stmt
            .query_map(params![user_id], map_video_row)?
            .collect::<Result<Vec<Video>, _>>()?;
        Ok(videos)
    }
}

impl CommentStore for SqlitePlatformStore {
    fn add_comment(
        &self,
        video_id: &RecordId,
        owner_id: &RecordId,
        content: &str,
    ) -> Result<CommentWithRefs> {
        let comment_id = RecordId::generate();
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO comment (id, video_id, owner_id, content) VALUES (?1, ?2, ?3, ?4)",
                params![comment_id, video_id, owner_id, content],
            )?;
        }
        let conn = self.conn.lock().unwrap();
        Self::comment_with_refs_pipeline()
            .filter("c.id = ?", [Value::from(comment_id.to_string())])
            .fetch_one(&conn, Self::map_comment_with_refs_row)?
            .context("Comment row missing right after insert")
    }

    fn video_comments(
        &self,
        video_id: &RecordId,
        sort_key: CommentSortKey,
        direction: SortDirection,
        page: &PageParams,
    ) -> Result<Page<CommentWithRefs>> {
        let conn = self.conn.lock().unwrap();
        Self::comment_with_refs_pipeline()
            .filter("c.video_id = ?", [Value::from(video_id.to_string())])
            .sort(sort_key.column(), direction)
            .paginate(&conn, page, Self::map_comment_with_refs_row)
    }

    fn get_comment(&self, comment_id: &RecordId) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        let comment = conn
            .query_row(
                "SELECT id, video_id, owner_id, content, created, updated \
                 FROM comment WHERE id = ?1",
                params![comment_id],
                |row| {
                    Ok(Comment {
                        id: row.get(0)?,
                        video_id: row.get(1)?,
                        owner_id: row.get(2)?,
                        content: row.get(3)?,
                        created: row.get(4)?,
                        updated: row.get(5)?,
                    })
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        Ok(comment)
    }

    fn update_comment(
        &self,
        comment_id: &RecordId,
        content: &str,
    ) -> Result<Option<CommentWithRefs>> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn.execute(
                &format!(
                    "UPDATE comment SET content = ?1, updated = {} WHERE id = ?2",
                    NOW
                ),
                params![content, comment_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        let conn = self.conn.lock().unwrap();
        Self::comment_with_refs_pipeline()
            .filter("c.id = ?", [Value::from(comment_id.to_string())])
            .fetch_one(&conn, Self::map_comment_with_refs_row)
    }

    fn delete_comment(&self, comment_id: &RecordId) -> Result<Option<Comment>> {
        let comment = self.get_comment(comment_id)?;
        if comment.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM comment WHERE id = ?1", params![comment_id])?;
        }
        Ok(comment)
    }
}

impl LikeStore for SqlitePlatformStore {
    fn find_like(&self, user_id: &RecordId, target: &LikeTarget) -> Result<Option<Like>> {
        let conn = self.conn.lock().unwrap();
        let like = conn
            .query_row(
                &format!(
                    "SELECT id, user_id, video_id, comment_id, tweet_id, created \
                     FROM user_like WHERE user_id = ?1 AND {} = ?2",
                    target.column()
                ),
                params![user_id, target.id()],
                map_like_row,
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        Ok(like)
    }

    fn insert_like(&self, user_id: &RecordId, target: &LikeTarget) -> Result<Like> {
        let like_id = RecordId::generate();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO user_like (id, user_id, {}) VALUES (?1, ?2, ?3)",
                target.column()
            ),
            params![like_id, user_id, target.id()],
        )
        .context("Failed to insert like")?;

        conn.query_row(
            "SELECT id, user_id, video_id, comment_id, tweet_id, created \
             FROM user_like WHERE id = ?1",
            params![like_id],
            map_like_row,
        )
        .context("Like row missing right after insert")
    }

    fn delete_like(&self, like_id: &RecordId) -> Result<Option<Like>> {
        let conn = self.conn.lock().unwrap();
        let like = conn
            .query_row(
                "SELECT id, user_id, video_id, comment_id, tweet_id, created \
                 FROM user_like WHERE id = ?1",
                params![like_id],
                map_like_row,
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        if like.is_some() {
            conn.execute("DELETE FROM user_like WHERE id = ?1", params![like_id])?;
        }
        Ok(like)
    }

    fn liked_videos(&self, user_id: &RecordId) -> Result<Vec<LikedVideoEntry>> {
        let conn = self.conn.lock().unwrap();

        let mut columns = vec!["l.id", "l.created"];
        columns.extend_from_slice(VIDEO_WITH_OWNER_COLUMNS);

        Pipeline::over("user_like", "l")
            .reshape(&columns)
            .join_one("video", "v", "v.id = l.video_id")
            .join_one("user", "u", "u.id = v.owner_id")
            .filter("l.user_id = ?", [Value::from(user_id.to_string())])
            .sort("l.created", SortDirection::Descending)
            .fetch(&conn, |row| {
                Ok(LikedVideoEntry {
                    like_id: row.get(0)?,
                    liked_at: row.get(1)?,
                    video: VideoWithOwner {
                        video: Video {
                            id: row.get(2)?,
                            owner_id: row.get(3)?,
                            video_url: row.get(4)?,
                            thumbnail_url: row.get(5)?,
                            title: row.get(6)?,
                            description: row.get(7)?,
                            duration_secs: row.get(8)?,
                            views: row.get(9)?,
                            published: row.get::<_, i64>(10)? != 0,
                            created: row.get(11)?,
                            updated: row.get(12)?,
                        },
                        owner: OwnerSummary {
                            id: row.get(13)?,
                            username: row.get(14)?,
                            full_name: row.get(15)?,
                            avatar_url: row.get(16)?,
                        },
                    },
                })
            })
    }
}

impl SubscriptionStore for SqlitePlatformStore {
    fn find_subscription(
        &self,
        subscriber_id: &RecordId,
        channel_id: &RecordId,
    ) -> Result<Option<Subscription>> {
        let conn = self.conn.lock().unwrap();
        let subscription = conn
            .query_row(
                "SELECT id, subscriber_id, channel_id, created FROM subscription \
                 WHERE subscriber_id = ?1 AND channel_id = ?2",
                params![subscriber_id, channel_id],
                |row| {
                    Ok(Subscription {
                        id: row.get(0)?,
                        subscriber_id: row.get(1)?,
                        channel_id: row.get(2)?,
                        created: row.get(3)?,
                    })
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        Ok(subscription)
    }

    fn insert_subscription(
        &self,
        subscriber_id: &RecordId,
        channel_id: &RecordId,
    ) -> Result<Subscription> {
        let subscription_id = RecordId::generate();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO subscription (id, subscriber_id, channel_id) VALUES (?1, ?2, ?3)",
            params![subscription_id, subscriber_id, channel_id],
        )
        .context("Failed to insert subscription")?;

        conn.query_row(
            "SELECT id, subscriber_id, channel_id, created FROM subscription WHERE id = ?1",
            params![subscription_id],
            |row| {
                Ok(Subscription {
                    id: row.get(0)?,
                    subscriber_id: row.get(1)?,
                    channel_id: row.get(2)?,
                    created: row.get(3)?,
                })
            },
        )
        .context("Subscription row missing right after insert")
    }

    fn delete_subscription(&self, subscription_id: &RecordId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM subscription WHERE id = ?1",
            params![subscription_id],
        )?;
        Ok(())
    }

    fn channel_subscribers(&self, channel_id: &RecordId) -> Result<Vec<OwnerSummary>> {
        let conn = self.conn.lock().unwrap();
        Pipeline::over("subscription", "s")
            .reshape(&["u.id", "u.username", "u.full_name", "u.avatar_url"])
            .join_one("user", "u", "u.id = s.subscriber_id")
            .filter("s.channel_id = ?", [Value::from(channel_id.to_string())])
            .sort("s.created", SortDirection::Descending)
            .fetch(&conn, map_owner_summary_row)
    }

    fn subscribed_channels(&self, subscriber_id: &RecordId) -> Result<Vec<OwnerSummary>> {
        let conn = self.conn.lock().unwrap();
        Pipeline::over("subscription", "s")
            .reshape(&["u.id", "u.username", "u.full_name", "u.avatar_url"])
            .join_one("user", "u", "u.id = s.channel_id")
            .filter(
                "s.subscriber_id = ?",
                [Value::from(subscriber_id.to_string())],
            )
            .sort("s.created", SortDirection::Descending)
            .fetch(&conn, map_owner_summary_row)
    }
}

impl PlaylistStore for SqlitePlatformStore {
    fn create_playlist(
        &self,
        owner_id: &RecordId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Playlist> {
        let playlist_id = RecordId::generate();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_playlist (id, owner_id, name, description) VALUES (?1, ?2, ?3, ?4)",
            params![playlist_id, owner_id, name, description],
        )
        .context("Could not create playlist")?;

        Self::load_playlist(&conn, &playlist_id)?
            .context("Playlist row missing right after insert")
    }

    fn get_playlist(&self, playlist_id: &RecordId) -> Result<Option<Playlist>> {
        let conn = self.conn.lock().unwrap();
        Self::load_playlist(&conn, playlist_id)
    }

    fn user_playlists(&self, owner_id: &RecordId) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id FROM user_playlist WHERE owner_id = ?1 ORDER BY created DESC",
        )?;
        let ids = stmt
            .query_map(params![owner_id], |row| row.get::<_, RecordId>(0))?
            .collect::<Result<Vec<RecordId>, _>>()?;

        let mut playlists = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(playlist) = Self::load_playlist(&conn, id)? {
                playlists.push(playlist);
            }
        }
        Ok(playlists)
    }

    fn update_playlist(
        &self,
        playlist_id: &RecordId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Playlist>> {
        let conn = self.conn.lock().unwrap();

        let mut assignments: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(name) = name {
            assignments.push(format!("name = ?{}", values.len() + 1));
            values.push(Value::from(name.to_string()));
        }
        if let Some(description) = description {
            assignments.push(format!("description = ?{}", values.len() + 1));
            values.push(Value::from(description.to_string()));
        }
        assignments.push(format!("updated = {}", NOW));
        values.push(Value::from(playlist_id.to_string()));

        let changed = conn.execute(
            &format!(
                "UPDATE user_playlist SET {} WHERE id = ?{}",
                assignments.join(", "),
                values.len()
            ),
            rusqlite::params_from_iter(values.iter()),
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Self::load_playlist(&conn, playlist_id)
    }

    fn delete_playlist(&self, playlist_id: &RecordId) -> Result<Option<Playlist>> {
        let conn = self.conn.lock().unwrap();
        let playlist = Self::load_playlist(&conn, playlist_id)?;
        if playlist.is_some() {
            conn.execute(
                "DELETE FROM user_playlist WHERE id = ?1",
                params![playlist_id],
            )?;
        }
        Ok(playlist)
    }

    fn add_playlist_video(
        &self,
        playlist_id: &RecordId,
        video_id: &RecordId,
    ) -> Result<Option<Playlist>> {
        let conn = self.conn.lock().unwrap();
        if Self::load_playlist(&conn, playlist_id)?.is_none() {
            return Ok(None);
        }

        // Set-like membership: the UNIQUE(playlist_id, video_id) constraint
        // turns a duplicate add into a no-op.
        conn.execute(
            "INSERT OR IGNORE INTO user_playlist_video (playlist_id, video_id, position) \
             VALUES (?1, ?2, \
               (SELECT COALESCE(MAX(position), -1) + 1 FROM user_playlist_video \
                WHERE playlist_id = ?1))",
            params![playlist_id, video_id],
        )?;

        Self::load_playlist(&conn, playlist_id)
    }

    fn remove_playlist_video(
        &self,
        playlist_id: &RecordId,
        video_id: &RecordId,
    ) -> Result<Option<Playlist>> {
        let conn = self.conn.lock().unwrap();
        if Self::load_playlist(&conn, playlist_id)?.is_none() {
            return Ok(None);
        }

        conn.execute(
            "DELETE FROM user_playlist_video WHERE playlist_id = ?1 AND video_id = ?2",
            params![playlist_id, video_id],
        )?;

        Self::load_playlist(&conn, playlist_id)
    }
}

impl TweetStore for SqlitePlatformStore {
    fn create_tweet(&self, owner_id: &RecordId, content: &str) -> Result<TweetWithOwner> {
        let tweet_id = RecordId::generate();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tweet (id, owner_id, content) VALUES (?1, ?2, ?3)",
            params![tweet_id, owner_id, content],
        )?;

        Self::tweet_with_owner_pipeline()
            .filter("t.id = ?", [Value::from(tweet_id.to_string())])
            .fetch_one(&conn, Self::map_tweet_with_owner_row)?
            .context("Tweet row missing right after insert")
    }

    fn user_tweets(&self, owner_id: &RecordId) -> Result<Vec<TweetWithOwner>> {
        let conn = self.conn.lock().unwrap();
        Self::tweet_with_owner_pipeline()
            .filter("t.owner_id = ?", [Value::from(owner_id.to_string())])
            .sort("t.created", SortDirection::Descending)
            .fetch(&conn, Self::map_tweet_with_owner_row)
    }

    fn get_tweet(&self, tweet_id: &RecordId) -> Result<Option<Tweet>> {
        let conn = self.conn.lock().unwrap();
        let tweet = conn
            .query_row(
                "SELECT id, owner_id, content, created, updated FROM tweet WHERE id = ?1",
                params![tweet_id],
                |row| {
                    Ok(Tweet {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        content: row.get(2)?,
                        created: row.get(3)?,
                        updated: row.get(4)?,
                    })
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                err => Err(err),
            })?;
        Ok(tweet)
    }

    fn update_tweet(&self, tweet_id: &RecordId, content: &str) -> Result<Option<TweetWithOwner>> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            &format!(
                "UPDATE tweet SET content = ?1, updated = {} WHERE id = ?2",
                NOW
            ),
            params![content, tweet_id],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        Self::tweet_with_owner_pipeline()
            .filter("t.id = ?", [Value::from(tweet_id.to_string())])
            .fetch_one(&conn, Self::map_tweet_with_owner_row)
    }

    fn delete_tweet(&self, tweet_id: &RecordId) -> Result<Option<TweetWithOwner>> {
        let conn = self.conn.lock().unwrap();
        let tweet = Self::tweet_with_owner_pipeline()
            .filter("t.id = ?", [Value::from(tweet_id.to_string())])
            .fetch_one(&conn, Self::map_tweet_with_owner_row)?;
        if tweet.is_some() {
            conn.execute("DELETE FROM tweet WHERE id = ?1", params![tweet_id])?;
        }
        Ok(tweet)
    }
}

impl HealthStore for SqlitePlatformStore {
    fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}
