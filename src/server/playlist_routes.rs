//! Playlist management including set-like video membership.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use super::error::{api_response, ApiError};
use super::session::Session;
use super::state::{GuardedPlatformStore, ServerState};
use crate::store::{Playlist, RecordId};

#[derive(Deserialize, Debug)]
struct CreatePlaylistBody {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UpdatePlaylistBody {
    name: Option<String>,
    description: Option<String>,
}

fn owned_playlist(
    store: &GuardedPlatformStore,
    session: &Session,
    playlist_id: &RecordId,
) -> Result<Playlist, ApiError> {
    let playlist = store
        .get_playlist(playlist_id)?
        .ok_or_else(|| ApiError::NotFound("Playlist does not exist.".to_string()))?;
    if playlist.owner_id != session.user.id {
        return Err(ApiError::NotFound("Playlist does not exist.".to_string()));
    }
    Ok(playlist)
}

async fn create_playlist(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Json(body): Json<CreatePlaylistBody>,
) -> Result<Response, ApiError> {
    let name = body
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::InvalidArgument("Playlist name is required".to_string()))?;

    let playlist = store.create_playlist(&session.user.id, &name, body.description.as_deref())?;
    Ok(api_response(
        StatusCode::CREATED,
        playlist,
        "Playlist created successfully.",
    ))
}

async fn user_playlists(
    _session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id = RecordId::parse(&user_id)?;

    let playlists = store.user_playlists(&user_id)?;
    if playlists.is_empty() {
        return Err(ApiError::NotFound("No playlist found.".to_string()));
    }

    Ok(api_response(
        StatusCode::OK,
        playlists,
        "User playlists fetched successfully.",
    ))
}

async fn get_playlist(
    _session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(playlist_id): Path<String>,
) -> Result<Response, ApiError> {
    let playlist_id = RecordId::parse(&playlist_id)?;

    let playlist = store
        .get_playlist(&playlist_id)?
        .ok_or_else(|| ApiError::NotFound("Playlist does not exist.".to_string()))?;
    Ok(api_response(StatusCode::OK, playlist, "Playlist fetched."))
}

async fn update_playlist(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(playlist_id): Path<String>,
    Json(body): Json<UpdatePlaylistBody>,
) -> Result<Response, ApiError> {
    let playlist_id = RecordId::parse(&playlist_id)?;
    owned_playlist(&store, &session, &playlist_id)?;

    let playlist = store
        .update_playlist(
            &playlist_id,
            body.name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
            body.description.as_deref(),
        )?
        .ok_or_else(|| ApiError::NotFound("Playlist does not exist.".to_string()))?;
    Ok(api_response(StatusCode::OK, playlist, "Playlist updated."))
}

async fn delete_playlist(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(playlist_id): Path<String>,
) -> Result<Response, ApiError> {
    let playlist_id = RecordId::parse(&playlist_id)?;
    owned_playlist(&store, &session, &playlist_id)?;

    let playlist = store
        .delete_playlist(&playlist_id)?
        .ok_or_else(|| ApiError::NotFound("Playlist does not exist.".to_string()))?;
    Ok(api_response(
        StatusCode::OK,
        playlist,
        "Playlist deleted successfully.",
    ))
}

async fn add_playlist_video(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let playlist_id = RecordId::parse(&playlist_id)?;
    let video_id = RecordId::parse(&video_id)?;
    owned_playlist(&store, &session, &playlist_id)?;

    if store.get_video_with_owner(&video_id)?.is_none() {
        return Err(ApiError::NotFound("Video does not exist".to_string()));
    }

    let playlist = store
        .add_playlist_video(&playlist_id, &video_id)?
        .ok_or_else(|| ApiError::NotFound("Playlist does not exist.".to_string()))?;
    Ok(api_response(
        StatusCode::OK,
        playlist,
        "Video added to playlist successfully.",
    ))
}

async fn remove_playlist_video(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let playlist_id = RecordId::parse(&playlist_id)?;
    let video_id = RecordId::parse(&video_id)?;
    owned_playlist(&store, &session, &playlist_id)?;

    let playlist = store
        .remove_playlist_video(&playlist_id, &video_id)?
        .ok_or_else(|| ApiError::NotFound("Playlist does not exist.".to_string()))?;
    Ok(api_response(
        StatusCode::OK,
        playlist,
        "Video removed from playlist.",
    ))
}

pub fn playlist_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", post(create_playlist))
        .route("/user/{userId}", get(user_playlists))
        .route(
            "/{playlistId}",
            get(get_playlist).patch(update_playlist).delete(delete_playlist),
        )
        .route("/{playlistId}/add/{videoId}", patch(add_playlist_video))
        .route(
            "/{playlistId}/remove/{videoId}",
            patch(remove_playlist_video),
        )
        .with_state(state)
}
