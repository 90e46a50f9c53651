use crate::{BlocklistSyncJob, CacheMaintenanceJob};
use std::sync::Arc;
use tracing::info;

/// Central orchestrator for all background jobs.
///
/// Use the builder pattern to register jobs, then call `.start()` once.
///
/// # Example
///
/// ```rust,ignore
/// JobRunner::new()
///     .with_blocklist_sync(BlocklistSyncJob::new(refresh).with_cancellation(token.clone()))
///     .with_cache_maintenance(CacheMaintenanceJob::new(cache).with_cancellation(token))
///     .start()
///     .await;
/// ```
#[derive(Default)]
pub struct JobRunner {
    blocklist_sync: Option<BlocklistSyncJob>,
    cache_maintenance: Option<CacheMaintenanceJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocklist_sync(mut self, job: BlocklistSyncJob) -> Self {
        self.blocklist_sync = Some(job);
        self
    }

    pub fn with_cache_maintenance(mut self, job: CacheMaintenanceJob) -> Self {
        self.cache_maintenance = Some(job);
        self
    }

    /// Start all registered background jobs.
    pub async fn start(self) {
        info!("Starting background job runner");

        if let Some(job) = self.blocklist_sync {
            Arc::new(job).start().await;
        }

        if let Some(job) = self.cache_maintenance {
            Arc::new(job).start().await;
        }

        info!("All background jobs started");
    }
}
