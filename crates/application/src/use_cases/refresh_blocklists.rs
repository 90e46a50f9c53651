use crate::ports::{BlockListPort, BlockListStats, BlocklistSourcePort};
use rsdns_domain::DomainError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Download the configured list sources, then rebuild the block list from
/// everything in the list directory.
///
/// A failed download is logged and the rebuild still runs, so hand-placed
/// files and lists fetched earlier keep working.
pub struct RefreshBlocklistsUseCase {
    sources: Arc<dyn BlocklistSourcePort>,
    block_list: Arc<dyn BlockListPort>,
    dir: PathBuf,
}

impl RefreshBlocklistsUseCase {
    pub fn new(
        sources: Arc<dyn BlocklistSourcePort>,
        block_list: Arc<dyn BlockListPort>,
        dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sources,
            block_list,
            dir: dir.into(),
        }
    }

    pub async fn execute(&self) -> Result<BlockListStats, DomainError> {
        match self.sources.update_blocklists(&self.dir).await {
            Ok(written) => info!(dir = %self.dir.display(), written, "Blocklist sources updated"),
            Err(e) => error!(dir = %self.dir.display(), error = %e, "Update blocklists failed"),
        }

        match self.block_list.refresh(&self.dir).await {
            Ok(stats) => {
                info!(
                    dir = %self.dir.display(),
                    files = stats.files,
                    blocked = stats.total_blocked(),
                    allowed = stats.allow_entries,
                    "Blocklists loaded"
                );
                Ok(stats)
            }
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "Read blocklists failed");
                Err(e)
            }
        }
    }
}
