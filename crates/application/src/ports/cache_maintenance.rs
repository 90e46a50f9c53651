#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub stale_hits: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.stale_hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            (self.hits + self.stale_hits) as f64 / lookups as f64
        }
    }
}

pub trait CacheMaintenancePort: Send + Sync {
    /// Drop every entry past its expiry (and past the stale window when
    /// stale serving is on). Returns how many were removed.
    fn purge_expired(&self) -> usize;

    fn stats(&self) -> CacheStats;
}
