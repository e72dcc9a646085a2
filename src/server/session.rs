//! Current-user request context, attached by extracting and resolving the
//! access token from the request.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use super::error::ApiError;
use super::state::ServerState;
use crate::user::auth::SessionTokenValue;
use crate::user::User;

pub const COOKIE_ACCESS_TOKEN_KEY: &str = "accessToken";
pub const COOKIE_REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: SessionTokenValue,
}

async fn extract_token_from_cookies(parts: &mut Parts, ctx: &ServerState) -> Option<String> {
    CookieJar::from_request_parts(parts, ctx)
        .await
        .ok()?
        .get(COOKIE_ACCESS_TOKEN_KEY)
        .map(|cookie| cookie.value().to_string())
}

fn extract_token_from_headers(parts: &mut Parts) -> Option<String> {
    let raw = parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)?
        .to_str()
        .ok()?;
    Some(raw.strip_prefix("Bearer ").unwrap_or(raw).to_string())
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<Session> {
    let token = match extract_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_token_from_headers(parts))
    {
        None => {
            debug!("No access token in cookies nor headers");
            return None;
        }
        Some(token) => token,
    };

    let token_value = SessionTokenValue(token);
    match ctx.user_manager.session(&token_value) {
        Ok(Some((user, token))) => Some(Session {
            user,
            token: token.value,
        }),
        Ok(None) => {
            debug!("Access token not found in database");
            None
        }
        Err(err) => {
            debug!("Failed to resolve session: {}", err);
            None
        }
    }
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".to_string()))
    }
}

impl OptionalFromRequestParts<ServerState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(extract_session_from_request_parts(parts, ctx).await)
    }
}
