//! Orchestrator errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::cache::CacheError;
use crate::coord::CoordError;
use crate::generator::GeneratorError;

/// Errors surfaced by [`TileService::get_tile`](super::TileService::get_tile).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordError),

    #[error("Tile generation failed: {0}")]
    GenerationFailed(#[from] GeneratorError),

    #[error("Failed to store tile: {0}")]
    StoreWriteFailed(#[from] CacheError),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidCoordinate(_) => StatusCode::BAD_REQUEST,
            ServiceError::GenerationFailed(_) | ServiceError::StoreWriteFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServiceError::InvalidCoordinate(e) => e.to_string(),
            ServiceError::GenerationFailed(_) => "Failed to generate tile".to_string(),
            ServiceError::StoreWriteFailed(_) => "Failed to store tile".to_string(),
        };
        (status, body).into_response()
    }
}
