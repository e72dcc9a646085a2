//! User data models.
//!
//! [`User`] is already the reshaped public contract: the password hash,
//! salt and refresh token live in their own tables/columns and are never
//! selected into it.

use serde::Serialize;

use super::auth::PasswordCredentials;
use crate::store::RecordId;

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created: i64,
    pub updated: Option<i64>,
}

/// Reduced user projection attached wherever another resource joins its
/// owner in.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: RecordId,
    pub username: String,
    pub full_name: String,
    pub avatar_url: String,
}

/// Public channel profile: the user plus derived subscription aggregates.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub subscriber_count: i64,
    pub subscriptions: i64,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub credentials: PasswordCredentials,
}
