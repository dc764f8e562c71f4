//! Cache management CLI commands.

use chrono::Utc;
use clap::Subcommand;
use tilecache::app::{open_cache, AppConfig, CacheBackend};
use tilecache::cache::{CacheStats, TileCache, TopEntry};
use tilecache::coord::TileAddress;

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,
    /// List the most requested tiles
    Top {
        /// Number of tiles to list
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
    /// Remove expired entries
    Cleanup,
    /// Trim live entries to a maximum, least used first
    Prune {
        /// Entries to keep; defaults to CACHE_MAX_ENTRIES
        #[arg(long)]
        max_entries: Option<u64>,
    },
    /// Drop one tile (zoom x y) or every tile at a zoom level (zoom)
    Invalidate {
        zoom: u8,
        x: Option<u32>,
        y: Option<u32>,
    },
    /// Remove every cached tile
    Clear,
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

fn print_stats(stats: &CacheStats) {
    println!("Tile cache");
    println!("  Entries:      {} ({} active, {} expired)", stats.total_entries, stats.active_entries, stats.expired_entries);
    println!("  Hits:         {} ({:.2} per entry)", stats.total_hits, stats.avg_hits_per_entry);
    if let Some(age) = stats.oldest_entry_age_secs {
        println!("  Oldest entry: {}s", age);
    }
    if let Some(last) = stats.last_access_time {
        println!("  Last access:  {}", last.to_rfc3339());
    }
    println!("  Size:         {}", format_size(stats.approximate_storage_size));
}

fn print_top(entries: &[TopEntry]) {
    if entries.is_empty() {
        println!("No cached tiles");
        return;
    }
    let now = Utc::now();
    println!("{:<28} {:>8} {:>10}  status", "key", "hits", "age");
    for entry in entries {
        let age = (now - entry.created_at).num_seconds();
        let status = if entry.is_active { "active" } else { "expired" };
        println!("{:<28} {:>8} {:>9}s  {}", entry.key, entry.hit_count, age, status);
    }
}

async fn execute(action: CacheAction, cache: &TileCache, config: &AppConfig) -> Result<(), CliError> {
    match action {
        CacheAction::Stats => {
            let stats = cache.stats().await.ok_or(CliError::StatsUnavailable)?;
            print_stats(&stats);
        }
        CacheAction::Top { limit } => print_top(&cache.top_entries(limit).await),
        CacheAction::Cleanup => {
            let removed = cache.cleanup_expired().await;
            println!("Removed {} expired entries", removed);
        }
        CacheAction::Prune { max_entries } => {
            let max_entries = max_entries.or(config.cache.max_entries).ok_or_else(|| {
                CliError::Usage("prune needs --max-entries or CACHE_MAX_ENTRIES".to_string())
            })?;
            let removed = cache.limit_size(max_entries).await;
            println!("Removed {} entries (limit {})", removed, max_entries);
        }
        CacheAction::Invalidate { zoom, x, y } => match (x, y) {
            (Some(x), Some(y)) => {
                let tile = TileAddress::new(zoom, x, y)?;
                if cache.delete(&tile.cache_key()).await {
                    println!("Invalidated {}", tile);
                } else {
                    println!("{} was not cached", tile);
                }
            }
            (None, None) => {
                TileAddress::new(zoom, 0, 0)?;
                let removed = cache.delete_by_pattern(&TileAddress::zoom_pattern(zoom)).await;
                println!("Invalidated {} tiles at zoom {}", removed, zoom);
            }
            _ => {
                return Err(CliError::Usage(
                    "invalidate takes either ZOOM or ZOOM X Y".to_string(),
                ))
            }
        },
        CacheAction::Clear => {
            let removed = cache.clear().await;
            println!("Removed {} entries", removed);
        }
    }
    Ok(())
}

/// Run a cache subcommand against the configured store.
///
/// Only the PostgreSQL backend outlives a server process, so the memory
/// backend is refused.
pub async fn run(action: CacheAction, config: AppConfig) -> Result<(), CliError> {
    if config.cache.backend == CacheBackend::Memory {
        return Err(CliError::Usage(
            "cache commands need the postgres backend; the memory cache lives inside `tilecache serve`"
                .to_string(),
        ));
    }
    let cache = open_cache(&config, None).await?.ok_or(CliError::CacheDisabled)?;
    execute(action, &cache, &config).await
}
