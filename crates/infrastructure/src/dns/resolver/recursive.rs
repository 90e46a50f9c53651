use super::config::ResolverSettings;
use super::local_addrs::LocalAddresses;
use crate::dns::cache::{
    to_wire_type, wire_key, AnswerKind, CacheLookup, CachedAnswer, NegativeTtl, ResponseCache,
};
use crate::dns::dnssec::{ChainValidator, RecordFetcher};
use crate::dns::registry::{AddressFamily, AuthServer, ServerRegistry, ServerSet};
use crate::dns::transport::UpstreamExchanger;
use crate::dns::wire::{address_of, MessageBuilder, Referral, ResponseKind, ResponseParser};
use async_trait::async_trait;
use dashmap::DashSet;
use futures::future::{BoxFuture, FutureExt};
use hickory_proto::op::Message;
use hickory_proto::rr::{DNSClass, Name, Record, RecordType as WireType};
use rsdns_application::ports::{CacheStatus, DnsResolver, DnssecStatus, Resolution};
use rsdns_domain::{DnsQuery, DomainError, QueryKey, RecordClass};
use rustc_hash::FxBuildHasher;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const DNS_PORT: u16 = 53;

/// Per-resolution accounting shared by every sub-lookup of one query.
struct Budget {
    max_depth: usize,
    remaining: usize,
    upstream_queries: u32,
}

impl Budget {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            remaining: max_depth,
            upstream_queries: 0,
        }
    }

    fn spend(&mut self) -> Result<(), DomainError> {
        if self.remaining == 0 {
            return Err(DomainError::DelegationDepthExceeded(self.max_depth));
        }
        self.remaining -= 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Mode {
    /// Set DO on upstream queries so signatures come back
    dnssec_ok: bool,
    validate: bool,
}

/// A finished lookup of one name, ready for the cache.
struct Resolved {
    answer: CachedAnswer,
    ttl: u32,
}

/// Iterative resolver: walks delegations from the root hints, following
/// referrals, CNAMEs and glueless nameservers under one depth budget.
///
/// Clones share the cache, registry and exchanger.
#[derive(Clone)]
pub struct RecursiveResolver {
    cache: Arc<ResponseCache>,
    registry: Arc<ServerRegistry>,
    exchanger: Arc<dyn UpstreamExchanger>,
    validator: Option<Arc<ChainValidator>>,
    settings: ResolverSettings,
    negative_ttl: NegativeTtl,
    local: Arc<LocalAddresses>,
    refreshing: Arc<DashSet<QueryKey, FxBuildHasher>>,
}

impl RecursiveResolver {
    pub fn new(
        cache: Arc<ResponseCache>,
        registry: Arc<ServerRegistry>,
        exchanger: Arc<dyn UpstreamExchanger>,
        settings: ResolverSettings,
    ) -> Self {
        info!(
            max_depth = settings.max_depth,
            upstream_timeout_ms = settings.upstream_timeout.as_millis() as u64,
            prefer_ipv6 = settings.prefer_ipv6,
            "Recursive resolver created"
        );
        Self {
            cache,
            registry,
            exchanger,
            validator: None,
            settings,
            negative_ttl: NegativeTtl::default(),
            local: Arc::new(LocalAddresses::default()),
            refreshing: Arc::new(DashSet::with_hasher(FxBuildHasher)),
        }
    }

    /// Enable DNSSEC validation. Upstream queries then always carry DO.
    pub fn with_validator(mut self, validator: Arc<ChainValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_negative_ttl(mut self, negative_ttl: NegativeTtl) -> Self {
        self.negative_ttl = negative_ttl;
        self
    }

    /// Nameserver addresses that are this server's own listeners and must
    /// never be queried.
    pub fn with_local_addresses(mut self, local: LocalAddresses) -> Self {
        self.local = Arc::new(local);
        self
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    fn mode_for(&self, dnssec_ok: bool) -> Mode {
        Mode {
            dnssec_ok: self.validator.is_some(),
            validate: self.validator.is_some() && (dnssec_ok || self.settings.validate_all),
        }
    }

    /// Cached answer usable for `mode`. Answers stored without validation
    /// do not satisfy a validating query.
    fn usable(answer: &CachedAnswer, mode: Mode) -> bool {
        !mode.validate || answer.dnssec_status != DnssecStatus::Indeterminate
    }

    fn spawn_refresh(&self, key: QueryKey, name: Name, qtype: WireType, mode: Mode) {
        if !self.refreshing.insert(key.clone()) {
            return;
        }

        let this = self.clone();
        tokio::spawn(async move {
            let deadline = Instant::now() + this.settings.refresh_timeout;
            let mut budget = Budget::new(this.settings.max_depth);
            let result = tokio::time::timeout_at(
                deadline,
                this.resolve_uncached(key.clone(), name, qtype, mode, &mut budget, deadline),
            )
            .await;

            match result {
                Ok(Ok(_)) => debug!(key = %key, "Stale entry refreshed"),
                Ok(Err(e)) => debug!(key = %key, error = %e, "Stale refresh failed"),
                Err(_) => debug!(key = %key, "Stale refresh timed out"),
            }
            this.refreshing.remove(&key);
        });
    }

    /// Fresh cache entry or full resolution, for sub-lookups.
    fn resolve_name<'a>(
        &'a self,
        name: Name,
        qtype: WireType,
        mode: Mode,
        budget: &'a mut Budget,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<CachedAnswer, DomainError>> {
        async move {
            let key = wire_key(&name, qtype, DNSClass::IN);
            if let CacheLookup::Fresh(answer) = self.cache.get(&key) {
                if Self::usable(&answer, mode) {
                    return Ok(answer);
                }
            }
            self.resolve_uncached(key, name, qtype, mode, budget, deadline)
                .await
                .map(|resolved| resolved.answer)
        }
        .boxed()
    }

    /// Iterate for `name` and cache the outcome. Bogus answers are
    /// returned as errors and never cached.
    fn resolve_uncached<'a>(
        &'a self,
        key: QueryKey,
        name: Name,
        qtype: WireType,
        mode: Mode,
        budget: &'a mut Budget,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<Resolved, DomainError>> {
        async move {
            let resolved = self.iterate(&name, qtype, mode, budget, deadline).await?;

            if resolved.answer.dnssec_status == DnssecStatus::Bogus {
                warn!(name = %name, record_type = %qtype, "DNSSEC validation failed");
                return Err(DomainError::DnssecBogus(name.to_ascii()));
            }

            self.cache.put(key, resolved.answer.clone(), resolved.ttl);
            Ok(resolved)
        }
        .boxed()
    }

    fn root_candidates(&self) -> Vec<AuthServer> {
        let v6 = (ServerSet::Root6, AddressFamily::V6);
        let any = (ServerSet::Root, AddressFamily::Any);
        let ((first, first_family), (second, second_family)) = if self.settings.prefer_ipv6 {
            (v6, any)
        } else {
            (any, v6)
        };
        let preferred = self.registry.candidates(first, first_family);
        if preferred.is_empty() {
            self.registry.candidates(second, second_family)
        } else {
            preferred
        }
    }

    async fn iterate(
        &self,
        qname: &Name,
        qtype: WireType,
        mode: Mode,
        budget: &mut Budget,
        deadline: Instant,
    ) -> Result<Resolved, DomainError> {
        let mut zone = Name::root();
        let mut candidates = self.root_candidates();
        let mut recursion_desired = false;

        'levels: loop {
            budget.spend()?;
            debug!(name = %qname, zone = %zone, candidates = candidates.len(), "Querying zone servers");

            let current = std::mem::take(&mut candidates);
            for server in &current {
                let cut_short = deadline.saturating_duration_since(Instant::now())
                    < self.settings.upstream_timeout;
                let (reply, rtt) = match self
                    .ask(server, qname, qtype, recursion_desired, mode, budget, deadline)
                    .await
                {
                    Ok(exchange) => exchange,
                    Err(DomainError::QueryTimeout) => return Err(DomainError::QueryTimeout),
                    // The attempt ran into the caller's deadline, not the server's timeout.
                    Err(_) if cut_short && Instant::now() >= deadline => {
                        return Err(DomainError::QueryTimeout)
                    }
                    Err(e) => {
                        debug!(server = %server, error = %e, "Upstream exchange failed");
                        self.registry.record_outcome(server, false, Duration::ZERO);
                        continue;
                    }
                };

                match ResponseParser::classify(&reply, qname, qtype, &zone, recursion_desired) {
                    ResponseKind::Lame(reason) => {
                        debug!(server = %server, zone = %zone, reason = %reason, "Lame server");
                        self.registry.record_outcome(server, false, rtt);
                    }
                    ResponseKind::Referral(referral) => {
                        self.registry.record_outcome(server, true, rtt);
                        let next = self.referral_servers(&referral, budget, deadline).await?;
                        if next.is_empty() {
                            debug!(zone = %referral.zone, "Referral without usable addresses");
                            continue;
                        }
                        zone = referral.zone;
                        candidates = next;
                        continue 'levels;
                    }
                    ResponseKind::Cname { target } => {
                        self.registry.record_outcome(server, true, rtt);
                        return self
                            .follow_cname(reply, &zone, target, qtype, mode, budget, deadline)
                            .await;
                    }
                    kind @ (ResponseKind::Answer | ResponseKind::NoData | ResponseKind::NxDomain) => {
                        self.registry.record_outcome(server, true, rtt);
                        return self.finish(reply, &kind, &zone, mode, deadline).await;
                    }
                }
            }

            let fallback = self.registry.candidates(ServerSet::Fallback, AddressFamily::Any);
            if recursion_desired || fallback.is_empty() {
                return Err(DomainError::ServerFailure(format!(
                    "All servers for {} failed resolving {}",
                    zone, qname
                )));
            }
            warn!(name = %qname, zone = %zone, "Candidates exhausted, trying fallback servers");
            zone = Name::root();
            candidates = fallback;
            recursion_desired = true;
        }
    }

    /// One validated exchange with one server.
    #[allow(clippy::too_many_arguments)]
    async fn ask(
        &self,
        server: &AuthServer,
        qname: &Name,
        qtype: WireType,
        recursion_desired: bool,
        mode: Mode,
        budget: &mut Budget,
        deadline: Instant,
    ) -> Result<(Message, Duration), DomainError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(DomainError::QueryTimeout);
        }
        let timeout = self.settings.upstream_timeout.min(remaining);

        let query = MessageBuilder::build_query(
            qname,
            qtype,
            recursion_desired,
            self.settings.edns_payload,
            mode.dnssec_ok,
        )?;

        budget.upstream_queries += 1;
        let started = Instant::now();
        let bytes = self.exchanger.exchange(server, &query.bytes, timeout).await?;
        let rtt = started.elapsed();

        let reply = MessageBuilder::parse(&bytes)?;
        ResponseParser::validate_reply(&query, &reply)?;
        Ok((reply, rtt))
    }

    /// Candidate servers for a referral: glue first, then addresses of
    /// out-of-zone nameservers resolved on the spot. Our own listener
    /// addresses are never candidates.
    async fn referral_servers(
        &self,
        referral: &Referral,
        budget: &mut Budget,
        deadline: Instant,
    ) -> Result<Vec<AuthServer>, DomainError> {
        let glue: Vec<IpAddr> = referral
            .nameservers
            .iter()
            .flat_map(|ns| referral.glue_for(ns))
            .collect();
        let mut addresses = self.remote_only(&referral.zone, glue);

        if addresses.is_empty() {
            for ns in &referral.nameservers {
                // In-zone names without glue cannot be reached without
                // asking the zone itself.
                if referral.zone.zone_of(ns) {
                    continue;
                }
                match self.nameserver_addresses(ns, budget, deadline).await {
                    Ok(found) => {
                        let found = self.remote_only(&referral.zone, found);
                        if !found.is_empty() {
                            addresses = found;
                            break;
                        }
                    }
                    Err(e @ (DomainError::QueryTimeout | DomainError::DelegationDepthExceeded(_))) => {
                        return Err(e)
                    }
                    Err(e) => debug!(nameserver = %ns, error = %e, "Nameserver lookup failed"),
                }
            }
        }

        let prefer_v6 = self.settings.prefer_ipv6;
        let (preferred, other): (Vec<IpAddr>, Vec<IpAddr>) = addresses
            .into_iter()
            .partition(|ip| ip.is_ipv6() == prefer_v6);
        let to_servers = |ips: Vec<IpAddr>| -> Vec<AuthServer> {
            ips.into_iter()
                .map(|ip| AuthServer::udp(SocketAddr::new(ip, DNS_PORT)))
                .collect()
        };

        let mut servers = self.registry.rank(to_servers(preferred));
        servers.extend(self.registry.rank(to_servers(other)));
        servers.dedup();
        Ok(servers)
    }

    fn remote_only(&self, zone: &Name, mut addresses: Vec<IpAddr>) -> Vec<IpAddr> {
        if self.local.is_empty() {
            return addresses;
        }
        let before = addresses.len();
        addresses.retain(|ip| !self.local.contains(&SocketAddr::new(*ip, DNS_PORT)));
        if addresses.len() < before {
            warn!(
                zone = %zone,
                dropped = before - addresses.len(),
                "Delegation points at this server, addresses ignored"
            );
        }
        addresses
    }

    async fn nameserver_addresses(
        &self,
        ns: &Name,
        budget: &mut Budget,
        deadline: Instant,
    ) -> Result<Vec<IpAddr>, DomainError> {
        budget.spend()?;
        let mode = Mode {
            dnssec_ok: false,
            validate: false,
        };
        let qtype = if self.settings.prefer_ipv6 {
            WireType::AAAA
        } else {
            WireType::A
        };
        let answer = self
            .resolve_name(ns.clone(), qtype, mode, budget, deadline)
            .await?;
        Ok(answer.message.answers().iter().filter_map(address_of).collect())
    }

    #[allow(clippy::too_many_arguments)]
    async fn follow_cname(
        &self,
        reply: Message,
        zone: &Name,
        target: Name,
        qtype: WireType,
        mode: Mode,
        budget: &mut Budget,
        deadline: Instant,
    ) -> Result<Resolved, DomainError> {
        debug!(target = %target, "Following CNAME");
        let head = self.finish(reply, &ResponseKind::Answer, zone, mode, deadline).await?;

        budget.spend()?;
        let tail = self
            .resolve_name(target, qtype, mode, budget, deadline)
            .await?;

        let mut message = Message::new();
        message.set_response_code(tail.response_code());
        let mut chain: Vec<Record> = head.answer.message.answers().to_vec();
        chain.extend(tail.message.answers().iter().cloned());
        message.insert_answers(chain);
        message.insert_name_servers(tail.message.name_servers().to_vec());

        let status = head.answer.dnssec_status.merge(tail.dnssec_status);
        let tail_ttl = match tail.kind {
            AnswerKind::Positive => ResponseParser::answer_ttl(&tail.message).unwrap_or(0),
            AnswerKind::Negative => self
                .negative_ttl
                .ttl_for(ResponseParser::soa_negative_ttl(&tail.message)),
        };
        let answer = match tail.kind {
            AnswerKind::Positive => CachedAnswer::positive(message, status),
            AnswerKind::Negative => CachedAnswer::negative(message, status),
        };

        Ok(Resolved {
            answer,
            ttl: head.ttl.min(tail_ttl),
        })
    }

    /// Turn a terminal reply into a cacheable answer, validating it first
    /// when the mode asks for it.
    async fn finish(
        &self,
        reply: Message,
        kind: &ResponseKind,
        zone: &Name,
        mode: Mode,
        deadline: Instant,
    ) -> Result<Resolved, DomainError> {
        let status = match (&self.validator, mode.validate) {
            (Some(validator), true) => {
                match validator.validate(self, &reply, zone, deadline).await {
                    Ok(status) => status,
                    Err(DomainError::QueryTimeout) => return Err(DomainError::QueryTimeout),
                    Err(e) => {
                        warn!(zone = %zone, error = %e, "DNSSEC validation could not complete");
                        DnssecStatus::Indeterminate
                    }
                }
            }
            _ => DnssecStatus::Indeterminate,
        };

        let mut message = Message::new();
        message.set_response_code(reply.response_code());
        message.set_authoritative(reply.authoritative());
        message.insert_answers(reply.answers().to_vec());
        message.insert_name_servers(reply.name_servers().to_vec());
        message.insert_additionals(reply.additionals().to_vec());

        let (answer, ttl) = match kind {
            ResponseKind::Answer => {
                let ttl = ResponseParser::answer_ttl(&message).unwrap_or(0);
                (CachedAnswer::positive(message, status), ttl)
            }
            _ => {
                let ttl = self
                    .negative_ttl
                    .ttl_for(ResponseParser::soa_negative_ttl(&message));
                (CachedAnswer::negative(message, status), ttl)
            }
        };

        Ok(Resolved { answer, ttl })
    }
}

#[async_trait]
impl DnsResolver for RecursiveResolver {
    type Answer = CachedAnswer;

    async fn resolve(
        &self,
        query: &DnsQuery,
        deadline: Instant,
    ) -> Result<Resolution<CachedAnswer>, DomainError> {
        if query.class != RecordClass::IN {
            return Err(DomainError::ServerFailure(format!(
                "Class {} is not served",
                query.class
            )));
        }

        let key = query.key();
        let mode = self.mode_for(query.dnssec_ok);
        let name = Name::from_ascii(key.name())
            .map_err(|e| DomainError::InvalidDomainName(format!("{}: {}", query.name, e)))?;
        let qtype = to_wire_type(query.record_type);

        match self.cache.get(&key) {
            CacheLookup::Fresh(answer) if Self::usable(&answer, mode) => {
                let status = answer.dnssec_status;
                return Ok(Resolution::new(answer)
                    .with_dnssec_status(status)
                    .with_cache_status(CacheStatus::Hit));
            }
            CacheLookup::Stale(answer) if Self::usable(&answer, mode) => {
                self.spawn_refresh(key, name, qtype, mode);
                let status = answer.dnssec_status;
                return Ok(Resolution::new(answer)
                    .with_dnssec_status(status)
                    .with_cache_status(CacheStatus::Stale));
            }
            _ => {}
        }

        let mut budget = Budget::new(self.settings.max_depth);
        let resolved = tokio::time::timeout_at(
            deadline,
            self.resolve_uncached(key, name, qtype, mode, &mut budget, deadline),
        )
        .await
        .map_err(|_| DomainError::QueryTimeout)??;

        let status = resolved.answer.dnssec_status;
        Ok(Resolution::new(resolved.answer)
            .with_dnssec_status(status)
            .with_cache_status(CacheStatus::Miss)
            .with_upstream_queries(budget.upstream_queries))
    }
}

#[async_trait]
impl RecordFetcher for RecursiveResolver {
    async fn fetch(
        &self,
        name: &Name,
        record_type: WireType,
        deadline: Instant,
    ) -> Result<Message, DomainError> {
        let mode = Mode {
            dnssec_ok: true,
            validate: false,
        };
        let mut budget = Budget::new(self.settings.max_depth);
        let answer = self
            .resolve_name(name.clone(), record_type, mode, &mut budget, deadline)
            .await?;
        Ok(answer.message)
    }
}
