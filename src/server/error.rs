//! API error taxonomy and the response envelope.
//!
//! Handlers raise [`ApiError`]; the `IntoResponse` impl below is the single
//! point where any raised error becomes the standard failure envelope
//! `{success, code, message}`. Successes go through [`api_response`] and the
//! `{statusCode, data, message, success}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::InvalidRecordId;
use crate::user::AuthError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                "Something went wrong".to_string()
            }
            other => other.to_string(),
        };
        let body = json!({
            "success": false,
            "code": status.as_u16(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

impl From<InvalidRecordId> for ApiError {
    fn from(err: InvalidRecordId) -> Self {
        ApiError::InvalidArgument(format!("Invalid id {:?}", err.0))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => ApiError::InvalidArgument(msg),
            AuthError::Conflict(msg) => ApiError::Conflict(msg),
            AuthError::NotFound(msg) => ApiError::NotFound(msg),
            AuthError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            AuthError::Internal(err) => ApiError::Internal(err),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponseBody<T: Serialize> {
    status_code: u16,
    data: T,
    message: String,
    success: bool,
}

/// Success envelope shared by every endpoint.
pub fn api_response<T: Serialize>(status: StatusCode, data: T, message: &str) -> Response {
    (
        status,
        Json(ApiResponseBody {
            status_code: status.as_u16(),
            data,
            message: message.to_string(),
            success: true,
        }),
    )
        .into_response()
}
