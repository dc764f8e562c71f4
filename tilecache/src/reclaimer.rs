//! Background removal of expired cache entries.
//!
//! The reclaimer wakes on a fixed interval and asks the cache to delete
//! every expired entry. Failures are logged and the schedule carries on;
//! a missed tick is delayed rather than bursted.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::TileCache;

/// Default cleanup interval.
pub const DEFAULT_RECLAIM_INTERVAL: Duration = Duration::from_secs(3600);

/// Shortest interval the reclaimer will run at.
pub const MIN_RECLAIM_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic expired-entry cleanup.
pub struct CacheReclaimer;

impl CacheReclaimer {
    /// Spawn the reclaimer on the current runtime.
    ///
    /// The first cleanup runs one full `interval` after start. Intervals
    /// below [`MIN_RECLAIM_INTERVAL`] are raised to it.
    pub fn start(cache: TileCache, interval: Duration) -> ReclaimerHandle {
        let interval = interval.max(MIN_RECLAIM_INTERVAL);
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            info!(interval_secs = interval.as_secs(), "Cache reclaimer started");

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,

                    _ = ticker.tick() => {
                        match cache.try_cleanup_expired().await {
                            Ok(count) => debug!(count, "Reclaim cycle complete"),
                            Err(e) => warn!(error = %e, "Reclaim cycle failed"),
                        }
                    }
                }
            }

            info!("Cache reclaimer stopped");
        });

        ReclaimerHandle { shutdown, task }
    }
}

/// Handle to a running reclaimer.
pub struct ReclaimerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ReclaimerHandle {
    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the reclaimer and wait for it to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Cache reclaimer task ended abnormally");
        }
    }
}
