use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::services::ServeDir;
use tracing::info;

use super::comment_routes::comment_routes;
use super::dashboard_routes::dashboard_routes;
use super::error::{api_response, ApiError};
use super::like_routes::like_routes;
use super::metrics::run_metrics_server;
use super::playlist_routes::playlist_routes;
use super::state::{GuardedMediaStore, GuardedPlatformStore, ServerState};
use super::subscription_routes::subscription_routes;
use super::tweet_routes::tweet_routes;
use super::user_routes::user_routes;
use super::video_routes::video_routes;
use super::{log_requests, ServerConfig};
use crate::media::MediaStore;
use crate::store::PlatformStore;
use crate::user::UserManager;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> Json<ServerStats> {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    })
}

async fn healthcheck(State(store): State<GuardedPlatformStore>) -> Result<Response, ApiError> {
    store.ping().context("Store connectivity probe failed")?;

    Ok(api_response(
        StatusCode::OK,
        json!({ "status": "Server is up", "database": "Connected" }),
        "Healthcheck passed.",
    ))
}

async fn get_media(
    State(media): State<GuardedMediaStore>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = media
        .open_blob(&name)?
        .ok_or_else(|| ApiError::NotFound("Media not found".to_string()))?;

    let content_type = infer::get(&bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(bytes.into())
        .context("Failed to build media response")
        .map_err(ApiError::Internal)
}

pub fn make_app(
    config: ServerConfig,
    store: Arc<dyn PlatformStore>,
    user_manager: Arc<UserManager>,
    media: Arc<dyn MediaStore>,
) -> Router {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        store,
        user_manager,
        media,
        hash: env!("GIT_HASH").to_string(),
    };

    let api_routes = Router::new()
        .nest("/users", user_routes(state.clone()))
        .nest("/videos", video_routes(state.clone()))
        .nest("/comments", comment_routes(state.clone()))
        .nest("/likes", like_routes(state.clone()))
        .nest("/subscriptions", subscription_routes(state.clone()))
        .nest("/playlists", playlist_routes(state.clone()))
        .nest("/tweets", tweet_routes(state.clone()))
        .nest("/dashboard", dashboard_routes(state.clone()))
        .merge(
            Router::new()
                .route("/healthcheck", get(healthcheck))
                .with_state(state.clone()),
        );

    let media_routes = Router::new()
        .route("/media/{name}", get(get_media))
        .with_state(state.clone());

    let home_router: Router = match &config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .nest("/api/v1", api_routes)
        .merge(media_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(
    config: ServerConfig,
    store: Arc<dyn PlatformStore>,
    user_manager: Arc<UserManager>,
    media: Arc<dyn MediaStore>,
    metrics_port: u16,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, store, user_manager, media);

    tokio::spawn(async move {
        if let Err(err) = run_metrics_server(metrics_port).await {
            tracing::error!("Metrics server failed: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    info!("Serving on port {}", port);
    Ok(axum::serve(listener, app).await?)
}
