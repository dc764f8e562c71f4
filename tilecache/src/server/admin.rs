//! Cache administration routes, mounted under `/cache` when enabled.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::service::ServiceError;

use super::AppState;

/// Default number of entries returned by `/cache/popular`.
pub const DEFAULT_POPULAR_LIMIT: u32 = 10;

/// Upper bound on `/cache/popular?limit=`.
pub const MAX_POPULAR_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PruneParams {
    pub max_entries: Option<u64>,
}

/// Count of entries affected by a maintenance call.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemovedResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// `GET /cache/stats`
pub async fn stats(State(state): State<AppState>) -> Response {
    match state.service.stats().await {
        Some(stats) => Json(stats).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Cache statistics unavailable").into_response(),
    }
}

/// `GET /cache/popular?limit=N`
pub async fn popular(
    State(state): State<AppState>,
    Query(params): Query<PopularParams>,
) -> impl IntoResponse {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .min(MAX_POPULAR_LIMIT);
    Json(state.service.popular_tiles(limit).await)
}

/// `POST /cache/cleanup`
pub async fn cleanup(State(state): State<AppState>) -> Json<RemovedResponse> {
    Json(RemovedResponse {
        removed: state.service.cleanup_expired().await,
    })
}

/// `POST /cache/prune?max_entries=N`; falls back to the configured cap.
pub async fn prune(State(state): State<AppState>, Query(params): Query<PruneParams>) -> Response {
    let Some(max_entries) = params.max_entries.or(state.max_entries) else {
        return (StatusCode::BAD_REQUEST, "max_entries is required").into_response();
    };
    Json(RemovedResponse {
        removed: state.service.prune(max_entries).await,
    })
    .into_response()
}

/// `DELETE /cache/tiles/:zoom/:x/:y`
pub async fn invalidate_tile(
    State(state): State<AppState>,
    Path((zoom, x, y)): Path<(u8, u32, u32)>,
) -> Result<Json<DeletedResponse>, ServiceError> {
    let deleted = state.service.invalidate_tile(zoom, x, y).await?;
    Ok(Json(DeletedResponse { deleted }))
}

/// `DELETE /cache/zoom/:zoom`
pub async fn invalidate_zoom(
    State(state): State<AppState>,
    Path(zoom): Path<u8>,
) -> Result<Json<RemovedResponse>, ServiceError> {
    let removed = state.service.invalidate_zoom(zoom).await?;
    Ok(Json(RemovedResponse { removed }))
}

/// `DELETE /cache`
pub async fn clear(State(state): State<AppState>) -> Json<RemovedResponse> {
    Json(RemovedResponse {
        removed: state.service.invalidate_all().await,
    })
}
