//! Authoritative server registry: the configured server sets plus a health
//! cell for every server the resolver has talked to.

pub mod health;

pub use health::{HealthSnapshot, ServerHealth, INITIAL_RTT};

use dashmap::DashMap;
use rsdns_domain::config::{ResolverConfig, ServerSpec};
use rsdns_domain::DomainError;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerSet {
    Root,
    Root6,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFamily {
    V4,
    V6,
    #[default]
    Any,
}

impl AddressFamily {
    pub fn matches(&self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
            AddressFamily::Any => true,
        }
    }
}

/// An upstream server. Servers with a `tls_name` are reached over DNS-over-TLS.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthServer {
    pub addr: SocketAddr,
    pub tls_name: Option<Arc<str>>,
}

impl AuthServer {
    pub fn udp(addr: SocketAddr) -> Self {
        Self {
            addr,
            tls_name: None,
        }
    }

    pub fn tls(addr: SocketAddr, name: &str) -> Self {
        Self {
            addr,
            tls_name: Some(Arc::from(name)),
        }
    }

    pub fn uses_tls(&self) -> bool {
        self.tls_name.is_some()
    }
}

impl From<&ServerSpec> for AuthServer {
    fn from(spec: &ServerSpec) -> Self {
        match &spec.tls_name {
            Some(name) => AuthServer::tls(spec.addr, name),
            None => AuthServer::udp(spec.addr),
        }
    }
}

impl fmt::Display for AuthServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tls_name {
            Some(name) => write!(f, "tls://{}#{}", self.addr, name),
            None => write!(f, "{}", self.addr),
        }
    }
}

pub struct ServerRegistry {
    root: Vec<AuthServer>,
    root6: Vec<AuthServer>,
    fallback: Vec<AuthServer>,
    health: DashMap<SocketAddr, Arc<ServerHealth>, FxBuildHasher>,
    failure_threshold: u32,
    epoch: Instant,
}

impl ServerRegistry {
    pub fn new(root: Vec<AuthServer>, root6: Vec<AuthServer>, fallback: Vec<AuthServer>) -> Self {
        Self {
            root,
            root6,
            fallback,
            health: DashMap::with_hasher(FxBuildHasher),
            failure_threshold: 3,
            epoch: Instant::now(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self, DomainError> {
        let parse = |list: &[String]| -> Result<Vec<AuthServer>, DomainError> {
            list.iter()
                .map(|s| {
                    s.parse::<ServerSpec>()
                        .map(|spec| AuthServer::from(&spec))
                        .map_err(DomainError::InvalidIpAddress)
                })
                .collect()
        };

        Ok(Self::new(
            parse(&config.root_servers)?,
            parse(&config.root6_servers)?,
            parse(&config.fallback_servers)?,
        )
        .with_failure_threshold(config.failure_threshold))
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn servers(&self, set: ServerSet) -> &[AuthServer] {
        match set {
            ServerSet::Root => &self.root,
            ServerSet::Root6 => &self.root6,
            ServerSet::Fallback => &self.fallback,
        }
    }

    /// Best server of `set` restricted to `family`.
    pub fn select(&self, set: ServerSet, family: AddressFamily) -> Option<AuthServer> {
        self.candidates(set, family).into_iter().next()
    }

    /// Every server of `set` restricted to `family`, in the order the
    /// resolver should try them. The head is what `select` returns.
    pub fn candidates(&self, set: ServerSet, family: AddressFamily) -> Vec<AuthServer> {
        let servers: Vec<AuthServer> = self
            .servers(set)
            .iter()
            .filter(|s| family.matches(&s.addr))
            .cloned()
            .collect();
        self.rank(servers)
    }

    /// Order candidates for trying: servers below the failure threshold by
    /// smoothed RTT, then failing servers oldest-failure first. Both sorts
    /// are stable, so equal servers keep their given order.
    pub fn rank(&self, candidates: Vec<AuthServer>) -> Vec<AuthServer> {
        let (mut healthy, mut failing): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .map(|server| {
                let (rtt, failures, last_failure) = match self.health.get(&server.addr) {
                    Some(cell) => (
                        cell.smoothed_rtt(),
                        cell.consecutive_failures(),
                        cell.last_failure(),
                    ),
                    None => (INITIAL_RTT, 0, 0),
                };
                (server, rtt, failures, last_failure)
            })
            .partition(|(_, _, failures, _)| *failures < self.failure_threshold);

        healthy.sort_by_key(|(_, rtt, _, _)| *rtt);
        failing.sort_by_key(|(_, _, _, last_failure)| *last_failure);

        healthy
            .into_iter()
            .chain(failing)
            .map(|(server, _, _, _)| server)
            .collect()
    }

    pub fn record_outcome(&self, server: &AuthServer, success: bool, rtt: Duration) {
        let cell = self.cell(server.addr);
        let now = self.now();
        if success {
            cell.record_success(rtt, now);
        } else {
            cell.record_failure(now);
            debug!(
                server = %server,
                failures = cell.consecutive_failures(),
                "Upstream failure recorded"
            );
        }
    }

    pub fn health(&self, addr: &SocketAddr) -> Option<HealthSnapshot> {
        self.health.get(addr).map(|cell| cell.snapshot())
    }

    pub fn is_failing(&self, addr: &SocketAddr) -> bool {
        self.health
            .get(addr)
            .is_some_and(|cell| cell.consecutive_failures() >= self.failure_threshold)
    }

    fn cell(&self, addr: SocketAddr) -> Arc<ServerHealth> {
        self.health
            .entry(addr)
            .or_insert_with(|| Arc::new(ServerHealth::new()))
            .clone()
    }

    fn now(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64 + 1
    }
}
