//! Per-request logging at a caller-selected verbosity level. Metrics are
//! recorded regardless of the level.

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use std::time::Instant;
use tracing::{info, warn};

use super::super::metrics::record_http_request;
use super::super::state::ServerState;

/// How much of each request to log.
#[derive(PartialEq, PartialOrd, Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    /// Nothing at all.
    None,
    /// One line per request: method, path, status, latency.
    #[default]
    Path,
    /// Additionally the request and response headers.
    Headers,
    /// Additionally small request bodies.
    Body,
}

impl RequestsLoggingLevel {
    fn logs_requests(self) -> bool {
        self > RequestsLoggingLevel::None
    }

    fn logs_headers(self) -> bool {
        self >= RequestsLoggingLevel::Headers
    }

    fn logs_bodies(self) -> bool {
        self >= RequestsLoggingLevel::Body
    }
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestsLoggingLevel::None => "none",
            RequestsLoggingLevel::Path => "path",
            RequestsLoggingLevel::Headers => "headers",
            RequestsLoggingLevel::Body => "body",
        };
        f.write_str(name)
    }
}

/// Bodies above this size are summarized instead of dumped.
const BODY_LOG_LIMIT: usize = 1024;

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Buffers a small request body so it can be both logged and replayed
/// downstream. Oversized or unsized bodies are summarized untouched.
async fn buffer_loggable_body(
    request: Request<Body>,
) -> Result<(Request<Body>, Option<String>), StatusCode> {
    let declared = match content_length(request.headers()) {
        Some(len) if len < BODY_LOG_LIMIT => len,
        Some(len) => {
            let summary = format!("({:#} body not logged)", byte_unit::Byte::from(len as u64));
            return Ok((request, Some(summary)));
        }
        None => return Ok((request, None)),
    };

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, declared)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    Ok((Request::from_parts(parts, Body::from(bytes)), Some(text)))
}

fn log_headers(direction: &str, headers: &HeaderMap) {
    for (name, value) in headers.iter() {
        info!("  {} header {}: {:?}", direction, name, value);
    }
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let level = state.config.requests_logging_level;
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let started = Instant::now();

    if level.logs_headers() {
        log_headers("request", request.headers());
    }

    let request = if level.logs_bodies() {
        match buffer_loggable_body(request).await {
            Ok((request, body)) => {
                if let Some(body) = body {
                    info!("{} {} body: {}", method, uri, body);
                }
                request
            }
            Err(status) => {
                warn!("Failed to buffer request body of {} {}", method, uri);
                return status.into_response();
            }
        }
    } else {
        request
    };

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed = started.elapsed();
    if level.logs_requests() {
        info!("{} {} -> {} in {}ms", method, uri, status, elapsed.as_millis());
    }
    if level.logs_headers() {
        log_headers("response", response.headers());
    }

    record_http_request(&method, &uri, status, elapsed);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_thresholds() {
        assert!(!RequestsLoggingLevel::None.logs_requests());
        assert!(RequestsLoggingLevel::Path.logs_requests());
        assert!(!RequestsLoggingLevel::Path.logs_headers());
        assert!(RequestsLoggingLevel::Headers.logs_headers());
        assert!(!RequestsLoggingLevel::Headers.logs_bodies());
        assert!(RequestsLoggingLevel::Body.logs_bodies());
    }

    #[test]
    fn content_length_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), None);

        headers.insert(header::CONTENT_LENGTH, "42".parse().unwrap());
        assert_eq!(content_length(&headers), Some(42));

        headers.insert(header::CONTENT_LENGTH, "not-a-number".parse().unwrap());
        assert_eq!(content_length(&headers), None);
    }
}
