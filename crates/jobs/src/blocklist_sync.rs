use rsdns_application::use_cases::RefreshBlocklistsUseCase;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Downloads the configured list sources and swaps in a fresh block list.
///
/// The first refresh runs after `startup_delay_secs` plus up to 50% jitter,
/// so a fleet restarted together does not hit the list hosts at once.
pub struct BlocklistSyncJob {
    refresh: Arc<RefreshBlocklistsUseCase>,
    interval_secs: u64,
    startup_delay_secs: u64,
    shutdown: CancellationToken,
}

impl BlocklistSyncJob {
    pub fn new(refresh: Arc<RefreshBlocklistsUseCase>) -> Self {
        Self {
            refresh,
            interval_secs: 86400,
            startup_delay_secs: 1,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs.max(1);
        self
    }

    pub fn with_startup_delay(mut self, startup_delay_secs: u64) -> Self {
        self.startup_delay_secs = startup_delay_secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    fn startup_delay(&self) -> Duration {
        let base = Duration::from_secs(self.startup_delay_secs);
        let jitter_ms = (self.startup_delay_secs * 1000) / 2;
        base + Duration::from_millis(fastrand::u64(0..=jitter_ms))
    }

    /// One refresh; failures are logged and the old list stays active.
    pub async fn run_once(&self) {
        info!("BlocklistSyncJob: refreshing blocklists");
        match self.refresh.execute().await {
            Ok(stats) => info!(
                files = stats.files,
                blocked = stats.total_blocked(),
                "BlocklistSyncJob: refresh completed"
            ),
            Err(e) => error!(error = %e, "BlocklistSyncJob: refresh failed, keeping current list"),
        }
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            interval_secs = self.interval_secs,
            startup_delay_secs = self.startup_delay_secs,
            "Starting blocklist sync job"
        );

        tokio::spawn(async move {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("BlocklistSyncJob: shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.startup_delay()) => {}
            }
            self.run_once().await;

            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("BlocklistSyncJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => self.run_once().await,
                }
            }
        });
    }
}
