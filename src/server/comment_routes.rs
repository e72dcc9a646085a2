//! Comment endpoints, keyed by video for reads and by comment for writes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::error::{api_response, ApiError};
use super::session::Session;
use super::state::{GuardedPlatformStore, ServerState};
use crate::store::{Comment, CommentSortKey, PageParams, RecordId, SortDirection};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct CommentListParams {
    page: Option<String>,
    limit: Option<String>,
    sort_by: Option<String>,
    sort_type: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CommentBody {
    content: Option<String>,
}

fn required_content(body: CommentBody) -> Result<String, ApiError> {
    body.content
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ApiError::InvalidArgument("Comment content is required".to_string()))
}

async fn video_comments(
    _session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(video_id): Path<String>,
    Query(params): Query<CommentListParams>,
) -> Result<Response, ApiError> {
    let video_id = RecordId::parse(&video_id)?;
    let page = PageParams::from_raw(params.page.as_deref(), params.limit.as_deref());

    let sort_key = match params.sort_by.as_deref() {
        Some(raw) => CommentSortKey::parse(raw)
            .ok_or_else(|| ApiError::InvalidArgument(format!("Unknown sort field {:?}", raw)))?,
        None => CommentSortKey::default(),
    };
    let direction = match params.sort_type.as_deref() {
        Some(raw) => SortDirection::parse(raw)
            .ok_or_else(|| ApiError::InvalidArgument(format!("Unknown sort type {:?}", raw)))?,
        None => SortDirection::default(),
    };

    let comments = store.video_comments(&video_id, sort_key, direction, &page)?;
    Ok(api_response(
        StatusCode::OK,
        comments,
        "Comments fetched successfully",
    ))
}

async fn add_comment(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(video_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<Response, ApiError> {
    let video_id = RecordId::parse(&video_id)?;
    let content = required_content(body)?;

    if store.get_video_with_owner(&video_id)?.is_none() {
        return Err(ApiError::NotFound("Video does not exist".to_string()));
    }

    let comment = store.add_comment(&video_id, &session.user.id, &content)?;
    Ok(api_response(
        StatusCode::CREATED,
        comment,
        "Comment added to a video.",
    ))
}

fn owned_comment(
    store: &GuardedPlatformStore,
    session: &Session,
    comment_id: &RecordId,
) -> Result<Comment, ApiError> {
    let comment = store
        .get_comment(comment_id)?
        .ok_or_else(|| ApiError::NotFound("Comment does not exist.".to_string()))?;
    if comment.owner_id != session.user.id {
        return Err(ApiError::NotFound("Comment does not exist.".to_string()));
    }
    Ok(comment)
}

async fn update_comment(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(comment_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<Response, ApiError> {
    let comment_id = RecordId::parse(&comment_id)?;
    let content = required_content(body)?;
    owned_comment(&store, &session, &comment_id)?;

    let comment = store
        .update_comment(&comment_id, &content)?
        .ok_or_else(|| ApiError::NotFound("Comment does not exist.".to_string()))?;
    Ok(api_response(StatusCode::OK, comment, "Comment updated."))
}

async fn delete_comment(
    session: Session,
    State(store): State<GuardedPlatformStore>,
    Path(comment_id): Path<String>,
) -> Result<Response, ApiError> {
    let comment_id = RecordId::parse(&comment_id)?;
    owned_comment(&store, &session, &comment_id)?;

    let comment = store
        .delete_comment(&comment_id)?
        .ok_or_else(|| ApiError::NotFound("Comment does not exist.".to_string()))?;
    Ok(api_response(StatusCode::OK, comment, "Comment deleted."))
}

pub fn comment_routes(state: ServerState) -> Router {
    // GET and POST address the video, PATCH and DELETE the comment itself.
    Router::new()
        .route(
            "/{id}",
            get(video_comments)
                .post(add_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
        .with_state(state)
}
