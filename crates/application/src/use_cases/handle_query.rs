use crate::ports::{AccessControlPort, BlockListPort, DnsResolver, Resolution};
use rsdns_domain::{DnsQuery, DomainError};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// What the query server should answer.
#[derive(Debug)]
pub enum QueryOutcome<A> {
    /// Client address is not allowed to query.
    Refused,
    /// Name matched the block list; the resolver was not consulted.
    Blocked,
    Resolved(Resolution<A>),
    Failed(DomainError),
}

/// Gates a query through access control and the block list, then resolves it
/// under the fixed per-query deadline.
pub struct HandleQueryUseCase<A: Send + Sync + 'static> {
    access: Arc<dyn AccessControlPort>,
    block_list: Arc<dyn BlockListPort>,
    resolver: Arc<dyn DnsResolver<Answer = A>>,
    query_timeout: Duration,
    blocking_enabled: bool,
}

impl<A: Send + Sync + 'static> HandleQueryUseCase<A> {
    pub fn new(
        access: Arc<dyn AccessControlPort>,
        block_list: Arc<dyn BlockListPort>,
        resolver: Arc<dyn DnsResolver<Answer = A>>,
    ) -> Self {
        Self {
            access,
            block_list,
            resolver,
            query_timeout: Duration::from_secs(2),
            blocking_enabled: true,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_blocking(mut self, enabled: bool) -> Self {
        self.blocking_enabled = enabled;
        self
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub async fn execute(&self, client: IpAddr, query: &DnsQuery) -> QueryOutcome<A> {
        if !self.access.is_allowed(client) {
            debug!(client = %client, domain = %query.name, "Query refused by access list");
            return QueryOutcome::Refused;
        }

        if self.blocking_enabled && self.block_list.is_blocked(&query.name) {
            debug!(client = %client, domain = %query.name, "Query blocked");
            return QueryOutcome::Blocked;
        }

        let deadline = Instant::now() + self.query_timeout;
        match self.resolver.resolve(query, deadline).await {
            Ok(resolution) => {
                debug!(
                    client = %client,
                    domain = %query.name,
                    record_type = %query.record_type,
                    cache = ?resolution.cache_status,
                    dnssec = %resolution.dnssec_status,
                    upstream_queries = resolution.upstream_queries,
                    "Query resolved"
                );
                QueryOutcome::Resolved(resolution)
            }
            Err(e) => {
                debug!(
                    client = %client,
                    domain = %query.name,
                    record_type = %query.record_type,
                    error = %e,
                    "Query failed"
                );
                QueryOutcome::Failed(e)
            }
        }
    }
}
