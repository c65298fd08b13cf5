//! HTTP surface.
//!
//! - `POST /api/classify`: run the pipeline for the caller named by `x-user-id`
//! - `GET /health`: liveness plus a database probe
//!
//! Authentication happens upstream; the gateway forwards the caller id in
//! the `x-user-id` header and requests without it are rejected with 401.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, info, warn};

use crate::pipeline::{ClassifyRequest, ClassifyResponse, Pipeline, PipelineError};

/// Header carrying the authenticated caller id.
pub const CALLER_HEADER: &str = "x-user-id";

/// State shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Classification pipeline.
    pub pipeline: Arc<Pipeline>,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/classify", post(classify))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await
        .context("server error")
}

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

/// Caller id taken from the [`CALLER_HEADER`] header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_owned()))
            .ok_or(ApiError::Unauthorized)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No caller id.
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed body or no usable content.
    #[error("{0}")]
    BadRequest(String),

    /// Unhandled or persistence failure.
    #[error("{0}")]
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyContent => Self::BadRequest(err.to_string()),
            PipelineError::Store(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to classify content", "details": details }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn classify(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    body: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let today = chrono::Local::now().date_naive();

    match state.pipeline.handle(&user_id, request, today).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            match &err {
                PipelineError::EmptyContent => {}
                PipelineError::Store(e) => error!(user_id = %user_id, error = %e, "classification failed"),
            }
            Err(err.into())
        }
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match crate::store::ping(state.pipeline.pool()).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "database": "ok" }))),
        Err(e) => {
            warn!(error = %e, "health check database probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable" })),
            )
        }
    }
}
