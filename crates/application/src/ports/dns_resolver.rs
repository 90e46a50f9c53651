use async_trait::async_trait;
use rsdns_domain::{DnsQuery, DomainError};
use std::fmt;
use tokio::time::Instant;

/// Outcome of DNSSEC validation for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnssecStatus {
    /// Signature chain verified up to a trust anchor.
    Secure,
    /// Provably unsigned: the chain ends at a delegation without DS.
    Insecure,
    /// Signatures present but they do not verify.
    Bogus,
    /// Validation was not attempted.
    Indeterminate,
}

impl DnssecStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnssecStatus::Secure => "secure",
            DnssecStatus::Insecure => "insecure",
            DnssecStatus::Bogus => "bogus",
            DnssecStatus::Indeterminate => "indeterminate",
        }
    }

    /// Combine statuses of the parts of one answer (CNAME hops).
    /// The weakest part decides.
    pub fn merge(self, other: DnssecStatus) -> DnssecStatus {
        use DnssecStatus::*;
        match (self, other) {
            (Bogus, _) | (_, Bogus) => Bogus,
            (Indeterminate, _) | (_, Indeterminate) => Indeterminate,
            (Insecure, _) | (_, Insecure) => Insecure,
            (Secure, Secure) => Secure,
        }
    }
}

impl fmt::Display for DnssecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    /// Served from an expired entry; a refresh was started.
    Stale,
    Miss,
}

/// A finished resolution. `answer` is whatever the resolver produces for the
/// transport layer to encode.
#[derive(Debug, Clone)]
pub struct Resolution<A> {
    pub answer: A,
    pub dnssec_status: DnssecStatus,
    pub cache_status: CacheStatus,
    /// Upstream exchanges spent on this resolution
    pub upstream_queries: u32,
}

impl<A> Resolution<A> {
    pub fn new(answer: A) -> Self {
        Self {
            answer,
            dnssec_status: DnssecStatus::Indeterminate,
            cache_status: CacheStatus::Miss,
            upstream_queries: 0,
        }
    }

    pub fn with_dnssec_status(mut self, status: DnssecStatus) -> Self {
        self.dnssec_status = status;
        self
    }

    pub fn with_cache_status(mut self, status: CacheStatus) -> Self {
        self.cache_status = status;
        self
    }

    pub fn with_upstream_queries(mut self, count: u32) -> Self {
        self.upstream_queries = count;
        self
    }

    pub fn is_cache_hit(&self) -> bool {
        self.cache_status != CacheStatus::Miss
    }
}

#[async_trait]
pub trait DnsResolver: Send + Sync {
    type Answer: Send + Sync;

    /// Resolve `query`, giving up with `DomainError::QueryTimeout` once
    /// `deadline` has passed. Nothing is cached for an unfinished resolution.
    async fn resolve(
        &self,
        query: &DnsQuery,
        deadline: Instant,
    ) -> Result<Resolution<Self::Answer>, DomainError>;
}
