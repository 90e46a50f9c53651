#![allow(dead_code)]

use async_trait::async_trait;
use rsdns_application::ports::{
    BlockListPort, BlockListStats, BlocklistSourcePort, CacheMaintenancePort, CacheStats,
};
use rsdns_domain::DomainError;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

// ============================================================================
// Mock CacheMaintenancePort
// ============================================================================

pub struct MockCache {
    purge_count: AtomicU64,
    expired_per_sweep: AtomicUsize,
}

impl MockCache {
    pub fn new(expired_per_sweep: usize) -> Self {
        Self {
            purge_count: AtomicU64::new(0),
            expired_per_sweep: AtomicUsize::new(expired_per_sweep),
        }
    }

    pub fn purge_count(&self) -> u64 {
        self.purge_count.load(Ordering::Relaxed)
    }
}

impl CacheMaintenancePort for MockCache {
    fn purge_expired(&self) -> usize {
        self.purge_count.fetch_add(1, Ordering::Relaxed);
        self.expired_per_sweep.load(Ordering::Relaxed)
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: 10,
            capacity: 1024,
            ..Default::default()
        }
    }
}

// ============================================================================
// Mock BlockListPort
// ============================================================================

pub struct MockBlockList {
    refresh_count: AtomicU64,
    fail_refresh: AtomicBool,
}

impl MockBlockList {
    pub fn new() -> Self {
        Self {
            refresh_count: AtomicU64::new(0),
            fail_refresh: AtomicBool::new(false),
        }
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl BlockListPort for MockBlockList {
    fn is_blocked(&self, _name: &str) -> bool {
        false
    }

    async fn refresh(&self, _dir: &Path) -> Result<BlockListStats, DomainError> {
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        if self.fail_refresh.load(Ordering::Relaxed) {
            return Err(DomainError::Blocklist("refresh failed".to_string()));
        }
        Ok(BlockListStats {
            files: 1,
            exact_entries: 3,
            ..Default::default()
        })
    }

    fn stats(&self) -> BlockListStats {
        BlockListStats::default()
    }
}

// ============================================================================
// Mock BlocklistSourcePort
// ============================================================================

pub struct MockBlocklistSource {
    call_count: AtomicU64,
}

impl MockBlocklistSource {
    pub fn new() -> Self {
        Self {
            call_count: AtomicU64::new(0),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BlocklistSourcePort for MockBlocklistSource {
    async fn update_blocklists(&self, _dir: &Path) -> Result<usize, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok(1)
    }
}
