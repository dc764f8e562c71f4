//! Application bootstrap implementation.
//!
//! `TileServerApp` wires the components in dependency order:
//! 1. Connection pool (only when a component needs the database)
//! 2. Cache store and client
//! 3. Tile generator
//! 4. Orchestrator and reclaimer
//!
//! and tears them down in reverse on shutdown.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use deadpool_postgres::Pool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::config::{AppConfig, CacheBackend, GeneratorKind};
use super::error::AppError;
use crate::cache::{MemoryTileStore, PostgresTileStore, TileCache, TileStore};
use crate::db;
use crate::generator::{
    LocalTileGenerator, PostgisFeatureSource, ProxyTileGenerator, ReqwestClient, TileGenerator,
};
use crate::reclaimer::{CacheReclaimer, ReclaimerHandle};
use crate::server::{self, AppState, TileJson};
use crate::service::TileService;

/// Tile server with its background tasks.
pub struct TileServerApp {
    config: AppConfig,
    service: TileService,
    reclaimer: Option<ReclaimerHandle>,
    pool_maintenance: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

/// Create the pool when `config` needs one, with its maintenance task.
fn open_pool(
    config: &AppConfig,
    shutdown: &CancellationToken,
) -> Result<Option<(Pool, JoinHandle<()>)>, AppError> {
    if !config.needs_database() {
        return Ok(None);
    }
    let pool = db::create_pool(&config.database)?;
    let maintenance = db::spawn_pool_maintenance(pool.clone(), &config.database, shutdown.clone());
    Ok(Some((pool, maintenance)))
}

/// Build the configured cache client over an optional pool.
///
/// Returns `None` when caching is disabled.
pub async fn open_cache(config: &AppConfig, pool: Option<&Pool>) -> Result<Option<TileCache>, AppError> {
    if !config.cache.enabled {
        return Ok(None);
    }

    let store: Arc<dyn TileStore> = match (config.cache.backend, pool) {
        (CacheBackend::Memory, _) => Arc::new(MemoryTileStore::new()),
        (CacheBackend::Postgres, Some(pool)) => {
            let store = PostgresTileStore::new(pool.clone());
            store.ensure_schema().await.map_err(AppError::Schema)?;
            Arc::new(store)
        }
        (CacheBackend::Postgres, None) => {
            let pool = db::create_pool(&config.database)?;
            let store = PostgresTileStore::new(pool);
            store.ensure_schema().await.map_err(AppError::Schema)?;
            Arc::new(store)
        }
    };

    Ok(Some(TileCache::new(store)))
}

fn build_generator(config: &AppConfig, pool: Option<&Pool>) -> Result<Arc<dyn TileGenerator>, AppError> {
    match (config.generator.kind, pool) {
        (GeneratorKind::Local, Some(pool)) => {
            let source = Arc::new(PostgisFeatureSource::new(pool.clone()));
            Ok(Arc::new(
                LocalTileGenerator::new(source).with_query_timeout(config.generator.query_timeout),
            ))
        }
        (GeneratorKind::Local, None) => {
            let pool = db::create_pool(&config.database)?;
            let source = Arc::new(PostgisFeatureSource::new(pool));
            Ok(Arc::new(
                LocalTileGenerator::new(source).with_query_timeout(config.generator.query_timeout),
            ))
        }
        (GeneratorKind::Proxy, _) => {
            let client = ReqwestClient::with_timeout(config.generator.upstream_timeout)
                .map_err(AppError::Generator)?;
            Ok(Arc::new(ProxyTileGenerator::new(
                Arc::new(client),
                config.generator.upstream_url.clone(),
            )))
        }
    }
}

impl TileServerApp {
    /// Start every component described by `config`.
    ///
    /// # Errors
    ///
    /// Fails when the pool cannot be built, the cache table cannot be
    /// verified, or the generator cannot be constructed.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let shutdown = CancellationToken::new();

        let (pool, pool_maintenance) = match open_pool(&config, &shutdown)? {
            Some((pool, task)) => (Some(pool), Some(task)),
            None => (None, None),
        };

        let cache = open_cache(&config, pool.as_ref()).await?;
        let generator = build_generator(&config, pool.as_ref())?;

        let mut service = TileService::new(generator.clone()).with_ttl(config.cache.ttl);
        let reclaimer = match cache {
            Some(cache) => {
                service = service.with_cache(cache.clone());
                Some(CacheReclaimer::start(cache, config.cache.cleanup_interval))
            }
            None => None,
        };

        info!(
            generator = generator.name(),
            caching = config.cache.enabled,
            backend = ?config.cache.backend,
            admin = config.server.admin_enabled,
            "Tile server started"
        );

        Ok(Self {
            config,
            service,
            reclaimer,
            pool_maintenance,
            shutdown,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn service(&self) -> &TileService {
        &self.service
    }

    /// HTTP router over this app's service.
    pub fn router(&self) -> Router {
        let state = AppState::new(self.service.clone(), TileJson::new(&self.config.server.public_url))
            .with_max_entries(self.config.cache.max_entries);
        server::router(state, self.config.server.admin_enabled)
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, AppError> {
        let address = self.config.server.bind_address();
        TcpListener::bind(&address)
            .await
            .map_err(|e| AppError::Bind(format!("{}: {}", address, e)))
    }

    /// Serve HTTP on `listener` until `signal` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, signal: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(address) = listener.local_addr() {
            info!(address = %address, "Listening for tile requests");
        }
        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| AppError::Serve(e.to_string()))
    }

    /// Stop background tasks.
    pub async fn shutdown(self) {
        info!("Shutting down tile server");
        if let Some(reclaimer) = self.reclaimer {
            reclaimer.shutdown().await;
        }
        self.shutdown.cancel();
        if let Some(task) = self.pool_maintenance {
            if let Err(e) = task.await {
                warn!(error = %e, "Pool maintenance task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn memory_proxy_config() -> AppConfig {
        let mut config = AppConfig::default()
            .with_cache_backend(CacheBackend::Memory)
            .with_generator(GeneratorKind::Proxy);
        config.generator.upstream_url = "http://127.0.0.1:1".to_string();
        config
    }

    #[tokio::test]
    async fn test_start_without_database() {
        let app = TileServerApp::start(memory_proxy_config()).await.unwrap();
        assert!(app.service().caching_enabled());
        assert!(app.pool_maintenance.is_none());
        assert!(app.reclaimer.is_some());
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_cache_disabled_has_no_reclaimer() {
        let app = TileServerApp::start(memory_proxy_config().with_cache_enabled(false))
            .await
            .unwrap();
        assert!(!app.service().caching_enabled());
        assert!(app.reclaimer.is_none());
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_router_serves_tilejson() {
        let app = TileServerApp::start(memory_proxy_config()).await.unwrap();

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/tiles/tiles.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_500() {
        let app = TileServerApp::start(memory_proxy_config()).await.unwrap();

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/tiles/1/0/0.mvt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        app.shutdown().await;
    }
}
