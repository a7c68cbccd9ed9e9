//! Axum router and all HTTP handlers for mw-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Tests in `tests/` compose the bare router directly.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    api_types::{ClearResponse, ErrorResponse, HealthResponse, MonitorResponse, StatusResponse},
    state::AppState,
};

const INDEX_HTML: &str = include_str!("index.html");

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).fallback(not_found))
        .route("/monitor", get(monitor).fallback(not_found))
        .route("/status", get(status_handler).fallback(not_found))
        .route("/clear", post(clear).fallback(not_found))
        .route("/health", get(health).fallback(not_found))
        // unknown paths and wrong methods both answer 404
        .fallback(not_found)
        .with_state(state)
}

/// JSON body with `Cache-Control: no-cache`.
fn json_no_cache<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, [(header::CACHE_CONTROL, "no-cache")], Json(body)).into_response()
}

/// Internal failure surfaced as 500 with a JSON body.
pub struct ApiError(String);

impl<E: std::fmt::Display> From<E> for ApiError {
    fn from(e: E) -> Self {
        ApiError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        json_no_cache(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                error: "Internal Server Error",
                message: self.0,
            },
        )
    }
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub(crate) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> Response {
    json_no_cache(
        StatusCode::OK,
        HealthResponse {
            status: "healthy",
            timestamp: Utc::now(),
            version: st.build.version,
            config_hash: st.config_hash.clone(),
        },
    )
}

// ---------------------------------------------------------------------------
// GET /monitor
// ---------------------------------------------------------------------------

/// Run one full cycle and return its summary. Per-source failures are part
/// of the body, not an HTTP error.
///
/// The cycle runs on its own task: a client that disconnects mid-cycle drops
/// only this handler, and the cycle still completes.
pub(crate) async fn monitor(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    info!("manual cycle triggered");
    let orchestrator = Arc::clone(&st.orchestrator);
    let report = tokio::spawn(async move { orchestrator.run().await }).await?;
    Ok(json_no_cache(
        StatusCode::OK,
        MonitorResponse {
            success: true,
            cycle_id: report.cycle_id,
            timestamp: report.finished_at,
            summary: report.summary(),
            results: report.outcomes,
            skipped: report.skipped,
        },
    ))
}

// ---------------------------------------------------------------------------
// GET /status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let report = st.orchestrator.status().await?;
    Ok(json_no_cache(
        StatusCode::OK,
        StatusResponse {
            success: true,
            timestamp: report.timestamp,
            cycle: report.cycle,
            providers: report.providers,
        },
    ))
}

// ---------------------------------------------------------------------------
// POST /clear
// ---------------------------------------------------------------------------

pub(crate) async fn clear(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let removed = st.orchestrator.clear_all().await?;
    info!(removed, "clear requested");
    Ok(json_no_cache(
        StatusCode::OK,
        ClearResponse {
            success: true,
            message: "All cached data cleared",
            removed,
            timestamp: Utc::now(),
        },
    ))
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

pub(crate) async fn not_found() -> Response {
    json_no_cache(
        StatusCode::NOT_FOUND,
        ErrorResponse {
            error: "Not Found",
            message: "The requested endpoint does not exist".to_string(),
        },
    )
}
