use rsdns_domain::config::{DnssecConfig, ResolverConfig};
use std::time::Duration;

/// Tuning knobs of the recursive resolver.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Timeout of a single upstream exchange; never longer than what is
    /// left of the query deadline.
    pub upstream_timeout: Duration,

    /// Deadline given to background refreshes of stale entries
    pub refresh_timeout: Duration,

    /// Delegation steps per query: referrals, CNAME hops and glueless
    /// nameserver lookups all draw from the same budget.
    pub max_depth: usize,

    /// Start at the IPv6 root hints and try IPv6 nameserver addresses first
    pub prefer_ipv6: bool,

    /// EDNS0 payload advertised upstream; 0 sends no OPT record
    pub edns_payload: u16,

    /// Validate every answer, not only those asked for with DO
    pub validate_all: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_millis(800),
            refresh_timeout: Duration::from_secs(2),
            max_depth: 16,
            prefer_ipv6: false,
            edns_payload: 1232,
            validate_all: false,
        }
    }
}

impl ResolverSettings {
    pub fn from_config(resolver: &ResolverConfig, dnssec: &DnssecConfig) -> Self {
        Self {
            upstream_timeout: Duration::from_millis(resolver.upstream_timeout_ms),
            refresh_timeout: Duration::from_millis(resolver.query_timeout_ms),
            max_depth: resolver.max_depth,
            prefer_ipv6: resolver.prefer_ipv6,
            edns_payload: resolver.edns_payload,
            validate_all: dnssec.validate_all,
        }
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_prefer_ipv6(mut self, prefer: bool) -> Self {
        self.prefer_ipv6 = prefer;
        self
    }

    pub fn with_validate_all(mut self, validate_all: bool) -> Self {
        self.validate_all = validate_all;
        self
    }
}
