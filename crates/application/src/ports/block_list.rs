use async_trait::async_trait;
use rsdns_domain::DomainError;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockListStats {
    pub files: usize,
    pub exact_entries: usize,
    pub wildcard_entries: usize,
    pub allow_entries: usize,
}

impl BlockListStats {
    pub fn total_blocked(&self) -> usize {
        self.exact_entries + self.wildcard_entries
    }
}

/// Application-layer port for the Block List.
///
/// `is_blocked` is synchronous and lock-free: it reads the current immutable
/// snapshot. `refresh` builds a new snapshot from the list files in a
/// directory and swaps it in whole; on error the active snapshot is kept.
#[async_trait]
pub trait BlockListPort: Send + Sync {
    fn is_blocked(&self, name: &str) -> bool;

    async fn refresh(&self, dir: &Path) -> Result<BlockListStats, DomainError>;

    fn stats(&self) -> BlockListStats;
}

/// Fetches raw list files from their remote sources into a directory.
#[async_trait]
pub trait BlocklistSourcePort: Send + Sync {
    /// Returns how many sources were written.
    async fn update_blocklists(&self, dir: &Path) -> Result<usize, DomainError>;
}
