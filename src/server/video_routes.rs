//! Video CRUD, listing and publish-toggle endpoints.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use serde::Deserialize;
use tracing::warn;

use super::error::{api_response, ApiError};
use super::metrics::{record_video_added, record_video_removed};
use super::session::Session;
use super::state::{GuardedMediaStore, GuardedPlatformStore, ServerState};
use super::uploads::UploadForm;
use crate::media::stage_and_store;
use crate::store::{
    NewVideo, PageParams, RecordId, SortDirection, VideoListQuery, VideoSortKey, VideoUpdate,
    VideoWithOwner,
};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct VideoListParams {
    page: Option<String>,
    limit: Option<String>,
    query: Option<String>,
    sort_by: Option<String>,
    sort_type: Option<String>,
    user_id: Option<String>,
}

fn parse_sorting(
    sort_by: Option<&str>,
    sort_type: Option<&str>,
) -> Result<(VideoSortKey, SortDirection), ApiError> {
    let sort_key = match sort_by {
        Some(raw) => VideoSortKey::parse(raw)
            .ok_or_else(|| ApiError::InvalidArgument(format!("Unknown sort field {:?}", raw)))?,
        None => VideoSortKey::default(),
    };
    let direction = match sort_type {
        Some(raw) => SortDirection::parse(raw)
            .ok_or_else(|| ApiError::InvalidArgument(format!("Unknown sort type {:?}", raw)))?,
        None => SortDirection::default(),
    };
    Ok((sort_key, direction))
}

async fn list_videos(
    _session: Session,
    State(store): State<GuardedPlatformStore>,
    Query(params): Query<VideoListParams>,
) -> Result<Response, ApiError> {
    let page = PageParams::from_raw(params.page.as_deref(), params.limit.as_deref());
    let (sort_key, direction) = parse_sorting(params.sort_by.as_deref(), params.sort_type.as_deref())?;

    let owner = match &params.user_id {
        Some(raw) => Some(RecordId::parse(raw)?),
        None => None,
    };

    let videos = store.list_videos(
        &VideoListQuery {
            owner,
            search: params.query.clone().filter(|q| !q.trim().is_empty()),
            sort_key,
            direction,
        },
        &page,
    )?;

    Ok(api_response(
        StatusCode::OK,
        videos,
        "Videos fetched successfully",
    ))
}

async fn publish_video(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    State(media): State<GuardedMediaStore>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;

    let title = form.text("title").unwrap_or_default().trim().to_string();
    let description = form
        .text("description")
        .unwrap_or_default()
        .trim()
        .to_string();
    if title.is_empty() || description.is_empty() {
        return Err(ApiError::InvalidArgument(
            "Title and description are required".to_string(),
        ));
    }

    let duration_secs = form
        .text("duration")
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| {
            ApiError::InvalidArgument("Video duration in seconds is required".to_string())
        })?;

    let video_bytes = form
        .file("videoFile")
        .ok_or_else(|| ApiError::InvalidArgument("Video file is required".to_string()))?;
    let thumbnail_bytes = form
        .file("thumbnail")
        .ok_or_else(|| ApiError::InvalidArgument("Thumbnail is required".to_string()))?;

    let video_blob = stage_and_store(media.as_ref(), video_bytes)
        .ok_or_else(|| ApiError::InvalidArgument("Video file is required".to_string()))?;
    let thumbnail_blob = stage_and_store(media.as_ref(), thumbnail_bytes)
        .ok_or_else(|| ApiError::InvalidArgument("Thumbnail is required".to_string()))?;

    let video = store.create_video(NewVideo {
        owner_id: session.user.id,
        video_url: video_blob.url,
        thumbnail_url: thumbnail_blob.url,
        title,
        description,
        duration_secs,
    })?;
    record_video_added();

    Ok(api_response(
        StatusCode::CREATED,
        video,
        "Video uploaded successfully.",
    ))
}

async fn get_video(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(video_id): Path<String>,
) -> Result<Response, ApiError> {
    let video_id = RecordId::parse(&video_id)?;

    if store.get_video_with_owner(&video_id)?.is_none() {
        return Err(ApiError::NotFound("Video does not exist".to_string()));
    }

    store.increment_views(&video_id)?;
    store.record_watch(&session.user.id, &video_id)?;

    let video = store
        .get_video_with_owner(&video_id)?
        .ok_or_else(|| ApiError::NotFound("Video does not exist".to_string()))?;
    Ok(api_response(StatusCode::OK, video, "Video fetched"))
}

/// Loads a video and checks the session user owns it; a foreign video is
/// indistinguishable from a missing one.
fn owned_video(
    store: &GuardedPlatformStore,
    session: &Session,
    video_id: &RecordId,
) -> Result<VideoWithOwner, ApiError> {
    let video = store
        .get_video_with_owner(video_id)?
        .ok_or_else(|| ApiError::NotFound("Video does not exist".to_string()))?;
    if video.video.owner_id != session.user.id {
        return Err(ApiError::NotFound("Video does not exist".to_string()));
    }
    Ok(video)
}

async fn update_video(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    State(media): State<GuardedMediaStore>,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let video_id = RecordId::parse(&video_id)?;
    let existing = owned_video(&store, &session, &video_id)?;

    let form = UploadForm::read(multipart).await?;
    let mut update = VideoUpdate {
        title: form.text("title").map(|s| s.to_string()),
        description: form.text("description").map(|s| s.to_string()),
        thumbnail_url: None,
    };

    if let Some(bytes) = form.file("thumbnail") {
        if let Some(blob) = stage_and_store(media.as_ref(), bytes) {
            if let Err(err) = media.delete_blob(&existing.video.thumbnail_url) {
                warn!(
                    "Failed to delete replaced thumbnail {}: {}",
                    existing.video.thumbnail_url, err
                );
            }
            update.thumbnail_url = Some(blob.url);
        }
    }

    let video = store
        .update_video(&video_id, &update)?
        .ok_or_else(|| ApiError::NotFound("Video does not exist".to_string()))?;
    Ok(api_response(StatusCode::OK, video, "Video updated"))
}

async fn delete_video(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    State(media): State<GuardedMediaStore>,
    Path(video_id): Path<String>,
) -> Result<Response, ApiError> {
    let video_id = RecordId::parse(&video_id)?;
    owned_video(&store, &session, &video_id)?;

    let deleted = store
        .delete_video(&video_id)?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;
    record_video_removed();

    // The row is gone; a failed blob delete leaves an orphaned blob, which
    // is accepted and logged rather than rolled back.
    for url in [&deleted.video_url, &deleted.thumbnail_url] {
        if let Err(err) = media.delete_blob(url) {
            warn!("Failed to delete blob {} of deleted video: {}", url, err);
        }
    }

    Ok(api_response(StatusCode::OK, deleted, "Video deleted"))
}

async fn toggle_publish(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(video_id): Path<String>,
) -> Result<Response, ApiError> {
    let video_id = RecordId::parse(&video_id)?;
    owned_video(&store, &session, &video_id)?;

    let video = store
        .toggle_publish(&video_id)?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;
    Ok(api_response(
        StatusCode::OK,
        video,
        "Video publish status updated successfully.",
    ))
}

pub fn video_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_videos))
        .route("/", post(publish_video))
        .route("/{videoId}", get(get_video))
        .route("/{videoId}", patch(update_video))
        .route("/{videoId}", delete(delete_video))
        .route("/{videoId}/toggle-publish", patch(toggle_publish))
        .with_state(state)
}
