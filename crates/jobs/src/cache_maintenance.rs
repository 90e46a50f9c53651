use rsdns_application::ports::CacheMaintenancePort;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Sweeps expired entries out of the response cache.
pub struct CacheMaintenanceJob {
    cache: Arc<dyn CacheMaintenancePort>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl CacheMaintenanceJob {
    pub fn new(cache: Arc<dyn CacheMaintenancePort>) -> Self {
        Self {
            cache,
            interval_secs: 60,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn run_once(&self) -> usize {
        let purged = self.cache.purge_expired();
        let stats = self.cache.stats();
        if purged > 0 {
            info!(
                purged,
                entries = stats.entries,
                capacity = stats.capacity,
                "CacheMaintenanceJob: expired entries purged"
            );
        } else {
            debug!(entries = stats.entries, hit_rate = stats.hit_rate(), "CacheMaintenanceJob: nothing to purge");
        }
        purged
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval_secs = self.interval_secs, "Starting cache maintenance job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("CacheMaintenanceJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.run_once();
                    }
                }
            }
        });
    }
}
