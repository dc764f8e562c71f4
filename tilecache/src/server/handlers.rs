//! Tile and metadata handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use tracing::error;

use crate::coord::{CoordError, TileAddress};
use crate::generator::is_gzip;
use crate::service::ServiceError;

use super::AppState;

/// Content type of served tiles.
pub const TILE_CONTENT_TYPE: &str = "application/x-protobuf";

/// Client-side caching directive for served tiles.
pub const TILE_CACHE_CONTROL: &str = "public, max-age=3600";

fn parse_segment<T: std::str::FromStr>(segment: &str) -> Result<T, ServiceError> {
    segment
        .parse()
        .map_err(|_| CoordError::InvalidPath(segment.to_string()).into())
}

/// Build the response for a served tile.
///
/// `Content-Encoding: gzip` is set only when the payload carries the gzip
/// magic bytes, so an empty payload is sent without it.
pub fn tile_response(data: Vec<u8>) -> Response {
    let compressed = is_gzip(&data);
    let mut response = Response::new(Body::from(Bytes::from(data)));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TILE_CONTENT_TYPE));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(TILE_CACHE_CONTROL));
    if compressed {
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }
    response
}

/// `GET /tiles/:zoom/:x/:tile` where `tile` is `{y}.mvt`.
///
/// Generation and the cache write run in their own task so a client
/// disconnect only drops the response.
pub async fn get_tile(
    State(state): State<AppState>,
    Path((zoom, x, tile)): Path<(String, String, String)>,
) -> Response {
    let coords = parse_segment::<u8>(&zoom).and_then(|zoom| {
        let x = parse_segment::<u32>(&x)?;
        let y = TileAddress::parse_row_segment(&tile)?;
        Ok((zoom, x, y))
    });
    let (zoom, x, y) = match coords {
        Ok(coords) => coords,
        Err(e) => return e.into_response(),
    };

    let service = state.service.clone();
    let task = tokio::spawn(async move { service.get_tile(zoom, x, y).await });

    match task.await {
        Ok(Ok(data)) => tile_response(data),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            error!(zoom, x, y, error = %e, "Tile task aborted");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /tiles/tiles.json`
pub async fn tilejson(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.tilejson.as_ref().clone())
}
