//! HTTP surface.
//!
//! - `GET /tiles/{z}/{x}/{y}.mvt` - serve a tile
//! - `GET /tiles/tiles.json` - TileJSON metadata
//! - `/cache/...` - administration, only when enabled

pub mod admin;
mod handlers;
mod tilejson;

use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::TileService;

pub use handlers::{tile_response, TILE_CACHE_CONTROL, TILE_CONTENT_TYPE};
pub use tilejson::{TileJson, ATTRIBUTION};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: TileService,
    pub tilejson: Arc<TileJson>,
    /// Cap used by `/cache/prune` when the request names none.
    pub max_entries: Option<u64>,
}

impl AppState {
    pub fn new(service: TileService, tilejson: TileJson) -> Self {
        Self {
            service,
            tilejson: Arc::new(tilejson),
            max_entries: None,
        }
    }

    pub fn with_max_entries(mut self, max_entries: Option<u64>) -> Self {
        self.max_entries = max_entries;
        self
    }
}

/// Public tile routes may be fetched from any origin.
fn tile_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}

/// Build the router. Admin routes are mounted only when `admin_enabled`
/// and are not covered by the CORS layer.
pub fn router(state: AppState, admin_enabled: bool) -> Router {
    let mut router = Router::new()
        .route("/tiles/tiles.json", get(handlers::tilejson))
        .route("/tiles/:zoom/:x/:tile", get(handlers::get_tile))
        .layer(tile_cors_layer());

    if admin_enabled {
        router = router
            .route("/cache", delete(admin::clear))
            .route("/cache/stats", get(admin::stats))
            .route("/cache/popular", get(admin::popular))
            .route("/cache/cleanup", post(admin::cleanup))
            .route("/cache/prune", post(admin::prune))
            .route("/cache/tiles/:zoom/:x/:y", delete(admin::invalidate_tile))
            .route("/cache/zoom/:zoom", delete(admin::invalidate_zoom));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryTileStore, TileCache};
    use crate::service::tests::CountingGenerator;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    fn app(generator: Arc<CountingGenerator>, admin: bool) -> (Router, Arc<MemoryTileStore>) {
        let store = Arc::new(MemoryTileStore::new());
        let service = TileService::new(generator).with_cache(TileCache::new(store.clone()));
        let state = AppState::new(service, TileJson::new("http://tiles.test"));
        (router(state, admin), store)
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_serves_tile_with_headers() {
        let generator = Arc::new(CountingGenerator::returning(b"\x1f\x8bdata"));
        let (app, store) = app(generator.clone(), false);

        let response = app
            .oneshot(request(Method::GET, "/tiles/14/8192/8191.mvt"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], TILE_CONTENT_TYPE);
        assert_eq!(headers[header::CONTENT_ENCODING], "gzip");
        assert_eq!(headers[header::CACHE_CONTROL], TILE_CACHE_CONTROL);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"\x1f\x8bdata");
        assert!(store.contains_row("tile:14:8192:8191"));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_plain_payload_is_not_labelled_gzip() {
        let (app, _) = app(Arc::new(CountingGenerator::returning(b"\x1a\x0b\x0a\x05roads")), false);

        let response = app
            .oneshot(request(Method::GET, "/tiles/5/1/1.mvt"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn test_tile_routes_answer_cors_preflight() {
        let (app, _) = app(Arc::new(CountingGenerator::returning(b"")), false);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/tiles/3/1/1.mvt")
                    .header(header::ORIGIN, "https://map.example.org")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_empty_tile_has_no_encoding() {
        let (app, _) = app(Arc::new(CountingGenerator::returning(b"")), false);

        let response = app
            .oneshot(request(Method::GET, "/tiles/3/1/1.mvt"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_bad_coordinates_are_400() {
        let generator = Arc::new(CountingGenerator::returning(b"x"));
        let (app, _) = app(generator.clone(), false);

        for uri in [
            "/tiles/2/4/0.mvt",
            "/tiles/31/0/0.mvt",
            "/tiles/a/0/0.mvt",
            "/tiles/3/0/zz.mvt",
            "/tiles/3/-1/0.mvt",
        ] {
            let response = app.clone().oneshot(request(Method::GET, uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_is_500() {
        let (app, store) = app(Arc::new(CountingGenerator::failing()), false);

        let response = app
            .oneshot(request(Method::GET, "/tiles/5/1/1.mvt"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_tilejson() {
        let (app, _) = app(Arc::new(CountingGenerator::returning(b"")), false);

        let response = app
            .oneshot(request(Method::GET, "/tiles/tiles.json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["tilejson"], "3.0.0");
        assert_eq!(json["tiles"][0], "http://tiles.test/tiles/{z}/{x}/{y}.mvt");
    }

    #[tokio::test]
    async fn test_admin_routes_hidden_by_default() {
        let (app, _) = app(Arc::new(CountingGenerator::returning(b"")), false);

        let response = app
            .oneshot(request(Method::GET, "/cache/stats"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_stats_and_popular() {
        let (app, _) = app(Arc::new(CountingGenerator::returning(b"t")), true);

        for _ in 0..3 {
            app.clone()
                .oneshot(request(Method::GET, "/tiles/4/2/2.mvt"))
                .await
                .unwrap();
        }
        app.clone()
            .oneshot(request(Method::GET, "/tiles/4/1/1.mvt"))
            .await
            .unwrap();

        let stats = body_json(
            app.clone()
                .oneshot(request(Method::GET, "/cache/stats"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(stats["total_entries"], 2);
        assert_eq!(stats["total_hits"], 2);

        let popular = body_json(
            app.oneshot(request(Method::GET, "/cache/popular?limit=1"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(popular.as_array().unwrap().len(), 1);
        assert_eq!(popular[0]["key"], "tile:4:2:2");
    }

    #[tokio::test]
    async fn test_admin_invalidation() {
        let (app, store) = app(Arc::new(CountingGenerator::returning(b"t")), true);

        for uri in ["/tiles/6/1/1.mvt", "/tiles/6/2/2.mvt", "/tiles/7/1/1.mvt"] {
            app.clone().oneshot(request(Method::GET, uri)).await.unwrap();
        }

        let deleted = body_json(
            app.clone()
                .oneshot(request(Method::DELETE, "/cache/tiles/6/1/1"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(deleted["deleted"], true);

        let removed = body_json(
            app.clone()
                .oneshot(request(Method::DELETE, "/cache/zoom/6"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(removed["removed"], 1);
        assert!(store.contains_row("tile:7:1:1"));

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, "/cache/tiles/6/64/0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let cleared = body_json(
            app.oneshot(request(Method::DELETE, "/cache"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(cleared["removed"], 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_admin_prune_and_cleanup() {
        let (app, store) = app(Arc::new(CountingGenerator::returning(b"t")), true);

        for uri in ["/tiles/2/0/0.mvt", "/tiles/2/1/1.mvt", "/tiles/2/1/1.mvt"] {
            app.clone().oneshot(request(Method::GET, uri)).await.unwrap();
        }

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/cache/prune"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let pruned = body_json(
            app.clone()
                .oneshot(request(Method::POST, "/cache/prune?max_entries=1"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(pruned["removed"], 1);
        assert!(store.contains_row("tile:2:1:1"));

        let cleaned = body_json(
            app.oneshot(request(Method::POST, "/cache/cleanup"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(cleaned["removed"], 0);
    }
}
