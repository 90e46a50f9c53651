#![allow(dead_code)]

use async_trait::async_trait;
use rsdns_application::ports::{
    AccessControlPort, BlockListPort, BlockListStats, BlocklistSourcePort, DnsResolver,
    Resolution,
};
use rsdns_domain::{DnsQuery, DomainError};
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// Mock AccessControlPort
// ============================================================================

pub struct MockAccessControl {
    allowed: HashSet<IpAddr>,
    call_count: AtomicU64,
}

impl MockAccessControl {
    pub fn allowing(ips: &[&str]) -> Self {
        Self {
            allowed: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
            call_count: AtomicU64::new(0),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl AccessControlPort for MockAccessControl {
    fn is_allowed(&self, client: IpAddr) -> bool {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.allowed.contains(&client)
    }
}

// ============================================================================
// Mock BlockListPort
// ============================================================================

pub struct MockBlockList {
    blocked: Mutex<HashSet<String>>,
    check_count: AtomicU64,
    refresh_count: AtomicU64,
    refreshed_dirs: Mutex<Vec<PathBuf>>,
    fail_refresh: AtomicBool,
}

impl MockBlockList {
    pub fn new() -> Self {
        Self::with_blocked(&[])
    }

    pub fn with_blocked(names: &[&str]) -> Self {
        Self {
            blocked: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
            check_count: AtomicU64::new(0),
            refresh_count: AtomicU64::new(0),
            refreshed_dirs: Mutex::new(Vec::new()),
            fail_refresh: AtomicBool::new(false),
        }
    }

    pub fn check_count(&self) -> u64 {
        self.check_count.load(Ordering::Relaxed)
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    pub fn refreshed_dirs(&self) -> Vec<PathBuf> {
        self.refreshed_dirs.lock().unwrap().clone()
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl BlockListPort for MockBlockList {
    fn is_blocked(&self, name: &str) -> bool {
        self.check_count.fetch_add(1, Ordering::Relaxed);
        self.blocked.lock().unwrap().contains(name)
    }

    async fn refresh(&self, dir: &Path) -> Result<BlockListStats, DomainError> {
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        self.refreshed_dirs.lock().unwrap().push(dir.to_path_buf());
        if self.fail_refresh.load(Ordering::Relaxed) {
            return Err(DomainError::Blocklist("refresh failed".to_string()));
        }
        Ok(BlockListStats {
            files: 1,
            exact_entries: self.blocked.lock().unwrap().len(),
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
    should_fail: AtomicBool,
}

impl MockBlocklistSource {
    pub fn new() -> Self {
        Self {
            call_count: AtomicU64::new(0),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let source = Self::new();
        source.should_fail.store(true, Ordering::Relaxed);
        source
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BlocklistSourcePort for MockBlocklistSource {
    async fn update_blocklists(&self, _dir: &Path) -> Result<usize, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::Blocklist("download failed".to_string()));
        }
        Ok(2)
    }
}

// ============================================================================
// Mock DnsResolver
// ============================================================================

pub enum ResolverBehavior {
    Answer(Vec<IpAddr>),
    Fail(DomainError),
    /// Sleep past the deadline, then report a timeout
    Hang,
}

pub struct MockResolver {
    behavior: ResolverBehavior,
    call_count: AtomicU64,
    last_deadline: Mutex<Option<Instant>>,
}

impl MockResolver {
    pub fn answering(ips: &[&str]) -> Self {
        Self::with_behavior(ResolverBehavior::Answer(
            ips.iter().map(|ip| ip.parse().unwrap()).collect(),
        ))
    }

    pub fn with_behavior(behavior: ResolverBehavior) -> Self {
        Self {
            behavior,
            call_count: AtomicU64::new(0),
            last_deadline: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_deadline(&self) -> Option<Instant> {
        *self.last_deadline.lock().unwrap()
    }
}

#[async_trait]
impl DnsResolver for MockResolver {
    type Answer = Vec<IpAddr>;

    async fn resolve(
        &self,
        _query: &DnsQuery,
        deadline: Instant,
    ) -> Result<Resolution<Vec<IpAddr>>, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_deadline.lock().unwrap() = Some(deadline);
        match &self.behavior {
            ResolverBehavior::Answer(ips) => Ok(Resolution::new(ips.clone())),
            ResolverBehavior::Fail(e) => Err(e.clone()),
            ResolverBehavior::Hang => {
                tokio::time::sleep_until(deadline + Duration::from_millis(1)).await;
                Err(DomainError::QueryTimeout)
            }
        }
    }
}
