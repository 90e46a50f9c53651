//! Response cache: LRU bounded by entry count, TTL checked on read.

pub mod entry;
pub mod key;
pub mod negative_ttl;

pub use entry::{AnswerKind, CachedAnswer};
pub use key::{from_wire_type, to_wire_type, wire_key};
pub use negative_ttl::NegativeTtl;

use entry::CacheEntry;
use lru::LruCache;
use rsdns_application::ports::{CacheMaintenancePort, CacheStats};
use rsdns_domain::config::{CacheConfig, MIN_CACHE_SIZE};
use rsdns_domain::QueryKey;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// TTL written into records served stale.
pub const STALE_TTL: u32 = 30;

#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub max_ttl: u32,
    pub serve_stale: bool,
    pub stale_window: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_ttl: 604_800,
            serve_stale: false,
            stale_window: Duration::from_secs(86_400),
        }
    }
}

impl CachePolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            max_ttl: config.max_ttl,
            serve_stale: config.serve_stale,
            stale_window: Duration::from_secs(config.stale_window_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CacheLookup {
    Fresh(CachedAnswer),
    /// Expired but inside the stale window; handed out once.
    Stale(CachedAnswer),
    Miss,
}

#[derive(Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_hits: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

pub struct ResponseCache {
    entries: Mutex<LruCache<QueryKey, CacheEntry>>,
    capacity: usize,
    policy: CachePolicy,
    metrics: CacheMetrics,
}

enum ReadDecision {
    Fresh(CachedAnswer),
    Stale(CachedAnswer),
    Expired,
    Absent,
}

impl ResponseCache {
    pub fn new(capacity: usize, policy: CachePolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            capacity,
            policy,
            metrics: CacheMetrics::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.size.max(MIN_CACHE_SIZE), CachePolicy::from_config(config))
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &QueryKey) -> CacheLookup {
        let now = Instant::now();
        let mut entries = self.lock();

        let decision = match entries.get_mut(key) {
            None => ReadDecision::Absent,
            Some(entry) if entry.is_fresh(now) => {
                ReadDecision::Fresh(entry.answer.aged(entry.elapsed_secs(now)))
            }
            Some(entry) => {
                let in_window = now < entry.expires_at + self.policy.stale_window;
                if self.policy.serve_stale && !entry.stale_served && in_window {
                    entry.stale_served = true;
                    ReadDecision::Stale(entry.answer.with_ttl(STALE_TTL))
                } else {
                    ReadDecision::Expired
                }
            }
        };

        match decision {
            ReadDecision::Fresh(answer) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Fresh(answer)
            }
            ReadDecision::Stale(answer) => {
                self.metrics.stale_hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Serving stale cache entry");
                CacheLookup::Stale(answer)
            }
            ReadDecision::Expired => {
                entries.pop(key);
                self.metrics.expirations.fetch_add(1, Ordering::Relaxed);
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Miss
            }
            ReadDecision::Absent => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Miss
            }
        }
    }

    /// Store `answer` for `ttl` seconds (capped at the policy's max TTL).
    /// A zero TTL is not cached.
    pub fn put(&self, key: QueryKey, answer: CachedAnswer, ttl: u32) {
        let ttl = ttl.min(self.policy.max_ttl);
        if ttl == 0 {
            return;
        }

        let now = Instant::now();
        let entry = CacheEntry {
            answer,
            inserted_at: now,
            expires_at: now + Duration::from_secs(u64::from(ttl)),
            stale_served: false,
        };

        let mut entries = self.lock();
        let displaced = entries.push(key.clone(), entry);
        drop(entries);

        self.metrics.insertions.fetch_add(1, Ordering::Relaxed);
        if let Some((old_key, _)) = displaced {
            if old_key != key {
                self.metrics.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        self.lock().pop(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove entries that can no longer be served, fresh or stale.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();

        let dead: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, entry)| {
                let mut limit = entry.expires_at;
                if self.policy.serve_stale && !entry.stale_served {
                    limit += self.policy.stale_window;
                }
                now >= limit
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &dead {
            entries.pop(key);
        }
        drop(entries);

        let removed = dead.len();
        self.metrics
            .expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            stale_hits: self.metrics.stale_hits.load(Ordering::Relaxed),
            insertions: self.metrics.insertions.load(Ordering::Relaxed),
            evictions: self.metrics.evictions.load(Ordering::Relaxed),
            expirations: self.metrics.expirations.load(Ordering::Relaxed),
        }
    }
}

impl CacheMaintenancePort for ResponseCache {
    fn purge_expired(&self) -> usize {
        ResponseCache::purge_expired(self)
    }

    fn stats(&self) -> CacheStats {
        ResponseCache::stats(self)
    }
}
