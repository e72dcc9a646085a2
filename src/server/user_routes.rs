//! Account, session and profile endpoints.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::error::{api_response, ApiError};
use super::metrics::record_login_attempt;
use super::session::{Session, COOKIE_ACCESS_TOKEN_KEY, COOKIE_REFRESH_TOKEN_KEY};
use super::state::{GuardedMediaStore, GuardedPlatformStore, GuardedUserManager, ServerState};
use super::uploads::UploadForm;
use crate::media::stage_and_store;
use crate::user::{AuthError, LoginOutcome, RegisterRequest, User};

#[derive(Deserialize, Debug)]
struct LoginBody {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponseData {
    user: User,
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordBody {
    old_password: String,
    new_password: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileBody {
    full_name: Option<String>,
    email: Option<String>,
}

fn session_cookie(key: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((key, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

fn expired_cookie(key: &'static str) -> Cookie<'static> {
    Cookie::build((key, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .build()
}

fn with_session_cookies(jar: CookieJar, outcome: &LoginOutcome) -> CookieJar {
    jar.add(session_cookie(
        COOKIE_ACCESS_TOKEN_KEY,
        outcome.access_token.0.clone(),
    ))
    .add(session_cookie(
        COOKIE_REFRESH_TOKEN_KEY,
        outcome.refresh_token.clone(),
    ))
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    State(media): State<GuardedMediaStore>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;

    let avatar_bytes = form
        .file("avatar")
        .ok_or_else(|| ApiError::InvalidArgument("Avatar file is required".to_string()))?;
    let avatar = stage_and_store(media.as_ref(), avatar_bytes)
        .ok_or_else(|| ApiError::InvalidArgument("Avatar file is required".to_string()))?;

    let cover_image_url = form
        .file("coverImage")
        .and_then(|bytes| stage_and_store(media.as_ref(), bytes))
        .map(|blob| blob.url);

    let user = user_manager.register(RegisterRequest {
        username: form.text("username").unwrap_or_default().to_string(),
        email: form.text("email").unwrap_or_default().to_string(),
        full_name: form.text("fullName").unwrap_or_default().to_string(),
        password: form.text("password").unwrap_or_default().to_string(),
        avatar_url: avatar.url,
        cover_image_url,
    })?;

    Ok(api_response(
        StatusCode::CREATED,
        user,
        "User created successfully.",
    ))
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<(CookieJar, Response), ApiError> {
    let identifier = body
        .username
        .or(body.email)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            ApiError::InvalidArgument("Username or email is required".to_string())
        })?;
    let password = body.password.unwrap_or_default();

    let outcome = match user_manager.login(&identifier, &password) {
        Ok(outcome) => {
            record_login_attempt(true);
            outcome
        }
        Err(err) => {
            record_login_attempt(false);
            return Err(err.into());
        }
    };

    let jar = with_session_cookies(jar, &outcome);
    let data = LoginResponseData {
        access_token: outcome.access_token.0,
        refresh_token: outcome.refresh_token,
        user: outcome.user,
    };
    Ok((
        jar,
        api_response(StatusCode::OK, data, "User logged in successfully."),
    ))
}

async fn logout(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), ApiError> {
    user_manager.logout(&session.user.id, &session.token)?;

    let jar = jar
        .add(expired_cookie(COOKIE_ACCESS_TOKEN_KEY))
        .add(expired_cookie(COOKIE_REFRESH_TOKEN_KEY));
    Ok((jar, api_response(StatusCode::OK, json!({}), "User logged out.")))
}

async fn refresh_token(
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    body: axum::body::Bytes,
) -> Result<(CookieJar, Response), ApiError> {
    // The refresh token arrives in the cookie or, failing that, the body.
    let body_token = serde_json::from_slice::<RefreshBody>(&body)
        .ok()
        .and_then(|body| body.refresh_token);
    let incoming = jar
        .get(COOKIE_REFRESH_TOKEN_KEY)
        .map(|cookie| cookie.value().to_string())
        .or(body_token)
        .ok_or_else(|| ApiError::InvalidArgument("Refresh token is required".to_string()))?;

    let outcome = user_manager.refresh_session(&incoming)?;

    let jar = with_session_cookies(jar, &outcome);
    let data = json!({
        "accessToken": outcome.access_token.0,
        "refreshToken": outcome.refresh_token,
    });
    Ok((
        jar,
        api_response(StatusCode::OK, data, "Tokens refreshed successfully."),
    ))
}

async fn change_password(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<ChangePasswordBody>,
) -> Result<Response, ApiError> {
    user_manager.change_password(&session.user.id, &body.old_password, &body.new_password)?;
    Ok(api_response(
        StatusCode::OK,
        json!({}),
        "Password updated successfully.",
    ))
}

async fn current_user(session: Session) -> Response {
    api_response(StatusCode::OK, session.user, "User fetched successfully.")
}

async fn update_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<UpdateProfileBody>,
) -> Result<Response, ApiError> {
    let (full_name, email) = match (body.full_name, body.email) {
        (Some(full_name), Some(email)) => (full_name, email),
        _ => {
            return Err(AuthError::InvalidInput(
                "Full name and email are required".to_string(),
            )
            .into())
        }
    };

    let user = user_manager.update_profile(&session.user.id, &full_name, &email)?;
    Ok(api_response(
        StatusCode::OK,
        user,
        "User details updated successfully.",
    ))
}

/// Replaces a stored profile image: upload the new blob first, then drop
/// the replaced one. A failed delete only logs; the new image is already
/// live.
fn replace_blob(media: &GuardedMediaStore, old_url: Option<&str>) {
    if let Some(old_url) = old_url {
        if let Err(err) = media.delete_blob(old_url) {
            warn!("Failed to delete replaced blob {}: {}", old_url, err);
        }
    }
}

async fn update_avatar(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    State(media): State<GuardedMediaStore>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let bytes = form
        .file("avatar")
        .ok_or_else(|| ApiError::InvalidArgument("Avatar file is required".to_string()))?;
    let blob = stage_and_store(media.as_ref(), bytes)
        .ok_or_else(|| ApiError::InvalidArgument("Error while uploading avatar".to_string()))?;

    replace_blob(&media, Some(session.user.avatar_url.as_str()));

    let user = store
        .set_avatar(&session.user.id, &blob.url)?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;
    Ok(api_response(
        StatusCode::OK,
        user,
        "User avatar updated successfully.",
    ))
}

async fn update_cover_image(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    State(media): State<GuardedMediaStore>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let bytes = form
        .file("coverImage")
        .ok_or_else(|| ApiError::InvalidArgument("Cover image file is required".to_string()))?;
    let blob = stage_and_store(media.as_ref(), bytes).ok_or_else(|| {
        ApiError::InvalidArgument("Error while uploading cover image".to_string())
    })?;

    replace_blob(&media, session.user.cover_image_url.as_deref());

    let user = store
        .set_cover_image(&session.user.id, &blob.url)?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;
    Ok(api_response(
        StatusCode::OK,
        user,
        "User cover image updated successfully.",
    ))
}

async fn channel_profile(
    viewer: Option<Session>,
    State(store): State<GuardedPlatformStore>,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::InvalidArgument(
            "Please provide a username".to_string(),
        ));
    }

    let viewer_id = viewer.map(|session| session.user.id);
    let profile = store
        .channel_profile(&username, viewer_id.as_ref())?
        .ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))?;

    Ok(api_response(
        StatusCode::OK,
        profile,
        "User channel fetched successfully.",
    ))
}

async fn watch_history(
    session: Session,
    State(store): State<GuardedPlatformStore>,
) -> Result<Response, ApiError> {
    let history = store.watch_history(&session.user.id)?;
    Ok(api_response(
        StatusCode::OK,
        history,
        "Watch history fetched successfully.",
    ))
}

pub fn user_routes(state: ServerState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/change-password", post(change_password))
        .route("/me", get(current_user))
        .route("/me", patch(update_profile))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover_image))
        .route("/channel/{username}", get(channel_profile))
        .route("/history", get(watch_history))
        .with_state(state)
}
