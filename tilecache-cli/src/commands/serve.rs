//! `tilecache serve`

use clap::{Args, ValueEnum};
use tilecache::app::{AppConfig, CacheBackend, GeneratorKind, TileServerApp};
use tracing::info;

use crate::error::CliError;

/// Generation strategy for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum GeneratorArg {
    /// Build tiles from the osm2pgsql database
    Local,
    /// Forward to an upstream tile server
    Proxy,
}

impl From<GeneratorArg> for GeneratorKind {
    fn from(arg: GeneratorArg) -> Self {
        match arg {
            GeneratorArg::Local => GeneratorKind::Local,
            GeneratorArg::Proxy => GeneratorKind::Proxy,
        }
    }
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Tile generation strategy
    #[arg(long, value_enum)]
    pub generator: Option<GeneratorArg>,

    /// Upstream tile server base URL (proxy mode)
    #[arg(long)]
    pub upstream_url: Option<String>,

    /// Externally visible base URL advertised in TileJSON
    #[arg(long)]
    pub public_url: Option<String>,

    /// Serve without caching
    #[arg(long, conflicts_with = "memory_cache")]
    pub no_cache: bool,

    /// Keep the cache in process memory instead of PostgreSQL
    #[arg(long)]
    pub memory_cache: bool,

    /// Mount the /cache administration routes
    #[arg(long)]
    pub admin: bool,
}

impl ServeArgs {
    /// Apply command-line overrides on top of file and environment values.
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(generator) = self.generator {
            config = config.with_generator(generator.into());
        }
        if let Some(url) = &self.upstream_url {
            config.generator.upstream_url = url.clone();
        }
        if let Some(url) = &self.public_url {
            config.server.public_url = url.trim_end_matches('/').to_string();
        }
        if self.no_cache {
            config = config.with_cache_enabled(false);
        }
        if self.memory_cache {
            config = config.with_cache_backend(CacheBackend::Memory);
        }
        if self.admin {
            config.server.admin_enabled = true;
        }
        config
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Run the tile server until interrupted.
pub async fn run(args: ServeArgs, config: AppConfig) -> Result<(), CliError> {
    let config = args.apply(config);
    let app = TileServerApp::start(config).await?;

    let listener = app.bind().await?;
    let served = app.serve(listener, shutdown_signal()).await;
    app.shutdown().await;
    Ok(served?)
}
