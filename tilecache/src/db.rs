//! PostgreSQL connection pool.
//!
//! One pool serves both the cache table and the spatial dataset. TLS is
//! negotiated with rustls against the webpki root set when enabled.
//! deadpool does not expire connections on its own, so a maintenance task
//! periodically drops connections past their idle or lifetime bound.

use std::sync::Arc;
use std::time::Duration;

use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_postgres::NoTls;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::DatabaseConfig;

/// How often pooled connections are checked against their bounds.
pub const POOL_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30);

/// Pool construction errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to create database pool: {0}")]
    CreatePool(String),

    #[error("Failed to configure TLS: {0}")]
    Tls(String),
}

impl From<deadpool_postgres::CreatePoolError> for DbError {
    fn from(err: deadpool_postgres::CreatePoolError) -> Self {
        DbError::CreatePool(err.to_string())
    }
}

fn pool_config(config: &DatabaseConfig) -> Config {
    let mut cfg = Config::new();
    cfg.url = Some(config.url.clone());
    cfg.connect_timeout = Some(config.connect_timeout);
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let mut timeouts = Timeouts::default();
    timeouts.wait = Some(config.connect_timeout);
    timeouts.create = Some(config.connect_timeout);
    timeouts.recycle = Some(config.connect_timeout);

    let mut pool = PoolConfig::new(config.max_connections.max(1));
    pool.timeouts = timeouts;
    cfg.pool = Some(pool);
    cfg
}

fn rustls_connector() -> Result<tokio_postgres_rustls::MakeRustlsConnect, DbError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| DbError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(tokio_postgres_rustls::MakeRustlsConnect::new(tls))
}

/// Build the pool. Connections are opened lazily on first use.
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, DbError> {
    let cfg = pool_config(config);
    let pool = if config.tls {
        cfg.create_pool(Some(Runtime::Tokio1), rustls_connector()?)?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)?
    };

    info!(
        max_connections = config.max_connections,
        tls = config.tls,
        "Database pool created"
    );
    Ok(pool)
}

/// Spawn the task that retires idle and aged connections until `shutdown`.
pub fn spawn_pool_maintenance(
    pool: Pool,
    config: &DatabaseConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let idle_timeout = config.idle_timeout;
    let max_lifetime = config.max_lifetime;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(POOL_MAINTENANCE_INTERVAL);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let result = pool.retain(|_, metrics| {
                        keep_connection(metrics.age(), metrics.last_used(), max_lifetime, idle_timeout)
                    });
                    if !result.removed.is_empty() {
                        debug!(
                            retired = result.removed.len(),
                            remaining = result.retained,
                            "Retired pooled connections"
                        );
                    }
                }
            }
        }
        debug!("Pool maintenance stopped");
    })
}

/// A pooled connection survives while younger than `max_lifetime` and used
/// within `idle_timeout`.
fn keep_connection(
    age: Duration,
    idle_for: Duration,
    max_lifetime: Duration,
    idle_timeout: Duration,
) -> bool {
    age < max_lifetime && idle_for < idle_timeout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_connection_limits() {
        let lifetime = Duration::from_secs(1800);
        let idle = Duration::from_secs(600);
        let secs = Duration::from_secs;

        assert!(keep_connection(secs(60), secs(5), lifetime, idle));
        assert!(!keep_connection(secs(1800), secs(5), lifetime, idle));
        assert!(!keep_connection(secs(60), secs(600), lifetime, idle));
        assert!(!keep_connection(secs(3600), secs(900), lifetime, idle));
    }

    #[test]
    fn test_pool_config_carries_limits() {
        let config = DatabaseConfig {
            max_connections: 7,
            connect_timeout: Duration::from_secs(3),
            ..DatabaseConfig::default()
        };
        let cfg = pool_config(&config);

        let pool = cfg.pool.unwrap();
        assert_eq!(pool.max_size, 7);
        assert_eq!(pool.timeouts.wait, Some(Duration::from_secs(3)));
        assert_eq!(cfg.connect_timeout, Some(Duration::from_secs(3)));
        assert_eq!(cfg.url.as_deref(), Some(config.url.as_str()));
    }

    #[test]
    fn test_zero_pool_size_is_clamped() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..DatabaseConfig::default()
        };
        assert_eq!(pool_config(&config).pool.unwrap().max_size, 1);
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() {
        let config = DatabaseConfig {
            url: "postgresql://nobody@127.0.0.1:1/none".to_string(),
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).unwrap();
        assert_eq!(pool.status().size, 0);
    }

    #[tokio::test]
    async fn test_create_pool_with_tls() {
        let config = DatabaseConfig {
            url: "postgresql://nobody@127.0.0.1:1/none".to_string(),
            tls: true,
            ..DatabaseConfig::default()
        };
        assert!(create_pool(&config).is_ok());
    }

    #[tokio::test]
    async fn test_maintenance_stops_on_shutdown() {
        let config = DatabaseConfig {
            url: "postgresql://nobody@127.0.0.1:1/none".to_string(),
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).unwrap();
        let token = CancellationToken::new();
        let handle = spawn_pool_maintenance(pool, &config, token.clone());

        token.cancel();
        handle.await.unwrap();
    }
}
