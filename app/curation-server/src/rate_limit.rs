//! Token-bucket throttling (§[SUPPLEMENT] rate limiting) applied as axum
//! middleware in front of `/api/import`, `/api/batch-import`, and
//! `/api/search*` — the routes that can push real work (a fetch, an LLM
//! call, a full-text scan) onto the backend from a single client request.
//! Keyed by client IP so one caller's burst doesn't throttle everyone else
//! behind the same reverse proxy; falls back to a constant key when no
//! peer address is available (e.g. behind a unix socket).

use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;

use curation_core::{CurationError, ErrorKind};

use crate::error::ApiError;
use crate::state::AppState;

const UNKEYED_BUCKET: &str = "unknown";

pub async fn per_client_import_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let key = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKEYED_BUCKET.to_string());

    if state.import_limiter.check_key(&key).is_err() {
        return ApiError(CurationError::new(
            ErrorKind::RateLimitExceeded,
            "import rate limit exceeded, retry later",
        ))
        .into_response();
    }

    next.run(request).await
}

pub async fn global_limit(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if state.global_limiter.check().is_err() {
        return ApiError(CurationError::new(
            ErrorKind::RateLimitExceeded,
            "server is at capacity, retry later",
        ))
        .into_response();
    }

    next.run(request).await
}
