//! HTTP surface: webhook intake and build browsing.
//!
//! `POST /webhook` runs exactly one pipeline to completion before
//! responding; the response carries the pipeline report. Build history
//! is browsable as plain text.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use drydock_core::{Pipeline, PipelineReport, PushPayload};
use drydock_store::{BuildLedger, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub history: Arc<dyn BuildLedger>,
}

/// Create the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(handle_webhook))
        .route("/builds", get(list_builds))
        .route("/builds/:id", get(get_build))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

/// POST /webhook
///
/// Decode the push payload and run the pipeline for its head commit.
/// Pushes with nothing to build (branch deletions) are rejected with
/// 400 before any pipeline work starts.
async fn handle_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PushPayload>,
) -> Result<Json<PipelineReport>, ApiError> {
    let Some(event) = payload.into_event() else {
        return Err(ApiError::BadRequest(
            "push carries no buildable commit".to_string(),
        ));
    };

    tracing::info!(sha = %event.commit_sha, repo = %event.repository_name, "webhook accepted");
    let report = state.pipeline.run(&event).await;
    Ok(Json(report))
}

/// GET /builds
async fn list_builds(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let ids = state.history.list().await?;
    Ok(Json(ids))
}

/// GET /builds/{id}
async fn get_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    match state.history.read(&id).await {
        Ok(text) => Ok(text),
        Err(StoreError::NotFound(id)) | Err(StoreError::InvalidId(id)) => {
            Err(ApiError::NotFound(id))
        }
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) | StoreError::InvalidId(id) => ApiError::NotFound(id),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, format!("no build named {id}")),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, message).into_response()
    }
}
