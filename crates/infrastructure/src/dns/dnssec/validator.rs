use super::crypto::{is_supported_algorithm, is_supported_digest, SignatureVerifier};
use super::trust_anchor::TrustAnchorStore;
use super::types::{DnskeyRecord, DsRecord, RrsigRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::{Name, Record, RecordType as WireType};
use rsdns_application::ports::DnssecStatus;
use rsdns_domain::DomainError;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tracing::{debug, warn};

/// How long an established zone trust (secure keys or insecure) is reused.
const ZONE_TRUST_TTL: Duration = Duration::from_secs(300);
const MAX_CACHED_ZONES: usize = 4096;

/// Source of DS and DNSKEY lookups for the chain walk.
///
/// Implemented by the recursive resolver; replies are returned as received
/// (with DO set) and are not validated themselves.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(
        &self,
        name: &Name,
        record_type: WireType,
        deadline: Instant,
    ) -> Result<Message, DomainError>;
}

#[derive(Debug, Clone)]
enum ZoneTrust {
    Secure(Arc<Vec<DnskeyRecord>>),
    Insecure,
    Bogus(String),
}

enum Delegation {
    Secure(Arc<Vec<DnskeyRecord>>),
    NotACut,
    Insecure,
    Bogus(String),
}

struct CachedTrust {
    trust: ZoneTrust,
    expires_at: Instant,
}

/// NXDOMAIN, or NOERROR with nothing in the answer section.
fn is_denial(message: &Message) -> bool {
    message.response_code() == ResponseCode::NXDomain || message.answers().is_empty()
}

/// One RRset out of a message section.
struct RrSet<'a> {
    owner: &'a Name,
    record_type: WireType,
    records: Vec<&'a Record>,
}

/// DNSSEC chain-of-trust validator.
///
/// Walks from the closest trust anchor down to the zone that signed the
/// data, checking DS against DNSKEY at every cut and the DNSKEY RRset
/// against the key the DS points at. Zone results are cached for a few
/// minutes; bogus results never are.
///
/// No NSEC/NSEC3 denial proofs are checked, so a negative answer is at
/// best `Insecure`. Bad signatures on the records it carries still make it
/// `Bogus`.
pub struct ChainValidator {
    anchors: TrustAnchorStore,
    verifier: SignatureVerifier,
    zones: DashMap<Name, CachedTrust, FxBuildHasher>,
}

impl ChainValidator {
    pub fn new(anchors: TrustAnchorStore) -> Self {
        Self {
            anchors,
            verifier: SignatureVerifier,
            zones: DashMap::with_hasher(FxBuildHasher),
        }
    }

    pub fn has_anchors(&self) -> bool {
        !self.anchors.is_empty()
    }

    /// Validate the data in `message`, which was answered by the servers
    /// of `zone`.
    pub async fn validate(
        &self,
        fetcher: &dyn RecordFetcher,
        message: &Message,
        zone: &Name,
        deadline: Instant,
    ) -> Result<DnssecStatus, DomainError> {
        let section = if message.answers().is_empty() {
            message.name_servers()
        } else {
            message.answers()
        };
        let rrsets = group_rrsets(section);

        if rrsets.is_empty() {
            return Ok(match self.zone_trust(fetcher, zone, deadline).await? {
                ZoneTrust::Secure(_) => DnssecStatus::Bogus,
                ZoneTrust::Insecure => DnssecStatus::Insecure,
                ZoneTrust::Bogus(_) => DnssecStatus::Bogus,
            });
        }

        let mut status = DnssecStatus::Secure;
        for rrset in &rrsets {
            let rrset_status = self.validate_rrset(fetcher, section, rrset, zone, deadline).await?;
            debug!(
                owner = %rrset.owner,
                record_type = %rrset.record_type,
                status = %rrset_status,
                "RRset validated"
            );
            status = status.merge(rrset_status);
            if status == DnssecStatus::Bogus {
                break;
            }
        }

        if status == DnssecStatus::Secure && is_denial(message) {
            debug!(zone = %zone, "Denial of existence is not proven");
            status = DnssecStatus::Insecure;
        }
        Ok(status)
    }

    async fn validate_rrset(
        &self,
        fetcher: &dyn RecordFetcher,
        section: &[Record],
        rrset: &RrSet<'_>,
        zone: &Name,
        deadline: Instant,
    ) -> Result<DnssecStatus, DomainError> {
        let rrsigs = covering_signatures(section, rrset.owner, rrset.record_type);

        if rrsigs.is_empty() {
            return Ok(match self.zone_trust(fetcher, zone, deadline).await? {
                ZoneTrust::Secure(_) => {
                    warn!(owner = %rrset.owner, record_type = %rrset.record_type, "Missing RRSIG in signed zone");
                    DnssecStatus::Bogus
                }
                ZoneTrust::Insecure => DnssecStatus::Insecure,
                ZoneTrust::Bogus(_) => DnssecStatus::Bogus,
            });
        }

        let usable: Vec<&RrsigRecord> = rrsigs
            .iter()
            .filter(|sig| is_supported_algorithm(sig.algorithm))
            .collect();
        if usable.is_empty() {
            return Ok(DnssecStatus::Insecure);
        }

        let signer = &usable[0].signer_name;
        if !signer.zone_of(rrset.owner) {
            warn!(owner = %rrset.owner, signer = %signer, "RRSIG signer is not an ancestor of the owner");
            return Ok(DnssecStatus::Bogus);
        }

        match self.zone_trust(fetcher, signer, deadline).await? {
            ZoneTrust::Insecure => Ok(DnssecStatus::Insecure),
            ZoneTrust::Bogus(reason) => {
                warn!(zone = %signer, reason = %reason, "Chain of trust broken");
                Ok(DnssecStatus::Bogus)
            }
            ZoneTrust::Secure(keys) => {
                let same_signer: Vec<&RrsigRecord> = usable
                    .into_iter()
                    .filter(|sig| &sig.signer_name == signer)
                    .collect();
                if self.verify_any(&same_signer, &keys, rrset.owner, &rrset.records) {
                    Ok(DnssecStatus::Secure)
                } else {
                    warn!(owner = %rrset.owner, record_type = %rrset.record_type, "No RRSIG verifies");
                    Ok(DnssecStatus::Bogus)
                }
            }
        }
    }

    fn verify_any(
        &self,
        rrsigs: &[&RrsigRecord],
        keys: &[DnskeyRecord],
        owner: &Name,
        records: &[&Record],
    ) -> bool {
        let now = unix_now();
        rrsigs.iter().any(|rrsig| {
            keys.iter().any(|key| {
                self.verifier
                    .verify_rrset(rrsig, key, owner, records, now)
                    .unwrap_or(false)
            })
        })
    }

    /// Trust state of `zone`'s keys, established from the closest anchor.
    async fn zone_trust(
        &self,
        fetcher: &dyn RecordFetcher,
        zone: &Name,
        deadline: Instant,
    ) -> Result<ZoneTrust, DomainError> {
        if let Some(cached) = self.zones.get(zone) {
            if cached.expires_at > Instant::now() {
                return Ok(cached.trust.clone());
            }
        }

        let trust = self.walk_chain(fetcher, zone, deadline).await?;

        if !matches!(trust, ZoneTrust::Bogus(_)) {
            if self.zones.len() >= MAX_CACHED_ZONES {
                self.zones.clear();
            }
            self.zones.insert(
                zone.clone(),
                CachedTrust {
                    trust: trust.clone(),
                    expires_at: Instant::now() + ZONE_TRUST_TTL,
                },
            );
        }
        Ok(trust)
    }

    async fn walk_chain(
        &self,
        fetcher: &dyn RecordFetcher,
        zone: &Name,
        deadline: Instant,
    ) -> Result<ZoneTrust, DomainError> {
        let Some(anchor_zone) = self.anchors.closest_zone(zone).cloned() else {
            return Ok(ZoneTrust::Insecure);
        };

        let reply = fetcher.fetch(&anchor_zone, WireType::DNSKEY, deadline).await?;
        let mut trust = self.authenticate_keys(&anchor_zone, &reply, |key| {
            self.anchors.trusts(&anchor_zone, key, &self.verifier)
        });
        let mut current = anchor_zone.clone();

        let target_labels = zone.num_labels();
        for depth in (anchor_zone.num_labels() + 1)..=target_labels {
            let keys = match &trust {
                ZoneTrust::Secure(keys) => Arc::clone(keys),
                _ => break,
            };
            let child = zone.trim_to(usize::from(depth));
            let is_target = depth == target_labels;

            match self
                .delegation(fetcher, &current, &keys, &child, is_target, deadline)
                .await?
            {
                Delegation::Secure(child_keys) => {
                    trust = ZoneTrust::Secure(child_keys);
                    current = child;
                }
                Delegation::NotACut => {}
                Delegation::Insecure => trust = ZoneTrust::Insecure,
                Delegation::Bogus(reason) => trust = ZoneTrust::Bogus(reason),
            }
        }

        Ok(trust)
    }

    /// One step down the chain: DS for `child` from the parent side, then
    /// the child's DNSKEY RRset.
    async fn delegation(
        &self,
        fetcher: &dyn RecordFetcher,
        parent: &Name,
        parent_keys: &[DnskeyRecord],
        child: &Name,
        is_target: bool,
        deadline: Instant,
    ) -> Result<Delegation, DomainError> {
        let reply = fetcher.fetch(child, WireType::DS, deadline).await?;
        let ds_records = records_of(reply.answers(), child, WireType::DS);

        if ds_records.is_empty() {
            return Ok(if is_target {
                Delegation::Insecure
            } else {
                Delegation::NotACut
            });
        }

        let rrsigs = covering_signatures(reply.answers(), child, WireType::DS);
        if rrsigs.is_empty() {
            return Ok(Delegation::Bogus(format!("unsigned DS at {}", child)));
        }
        if let Some(sig) = rrsigs.iter().find(|sig| &sig.signer_name != parent) {
            // Signed below the zone we hold keys for: an unsigned cut was
            // passed on the way down.
            if parent.zone_of(&sig.signer_name) {
                return Ok(Delegation::Insecure);
            }
            return Ok(Delegation::Bogus(format!(
                "DS at {} signed by {}",
                child, sig.signer_name
            )));
        }
        let rrsig_refs: Vec<&RrsigRecord> = rrsigs.iter().collect();
        if !self.verify_any(&rrsig_refs, parent_keys, child, &ds_records) {
            return Ok(Delegation::Bogus(format!("DS signature at {}", child)));
        }

        let ds_set: Vec<DsRecord> = ds_records
            .iter()
            .filter_map(|r| DsRecord::from_record(r).ok())
            .filter(|ds| is_supported_algorithm(ds.algorithm) && is_supported_digest(ds.digest_type))
            .collect();
        if ds_set.is_empty() {
            return Ok(Delegation::Insecure);
        }

        let reply = fetcher.fetch(child, WireType::DNSKEY, deadline).await?;
        Ok(
            match self.authenticate_keys(child, &reply, |key| {
                ds_set
                    .iter()
                    .any(|ds| self.verifier.verify_ds(ds, key, child).unwrap_or(false))
            }) {
                ZoneTrust::Secure(keys) => Delegation::Secure(keys),
                ZoneTrust::Insecure => Delegation::Insecure,
                ZoneTrust::Bogus(reason) => Delegation::Bogus(reason),
            },
        )
    }

    /// Accept the DNSKEY RRset of `zone` if it is signed by one of its own
    /// keys that `is_trusted` vouches for.
    fn authenticate_keys(
        &self,
        zone: &Name,
        reply: &Message,
        is_trusted: impl Fn(&DnskeyRecord) -> bool,
    ) -> ZoneTrust {
        let records = records_of(reply.answers(), zone, WireType::DNSKEY);
        let keys: Vec<DnskeyRecord> = records
            .iter()
            .filter_map(|r| DnskeyRecord::from_record(r).ok())
            .filter(DnskeyRecord::is_zone_key)
            .collect();

        let trusted: Vec<DnskeyRecord> = keys.iter().filter(|k| is_trusted(k)).cloned().collect();
        if trusted.is_empty() {
            return ZoneTrust::Bogus(format!("no trusted DNSKEY at {}", zone));
        }

        let rrsigs = covering_signatures(reply.answers(), zone, WireType::DNSKEY);
        let rrsig_refs: Vec<&RrsigRecord> = rrsigs.iter().collect();
        if self.verify_any(&rrsig_refs, &trusted, zone, &records) {
            debug!(zone = %zone, keys = keys.len(), "DNSKEY RRset authenticated");
            ZoneTrust::Secure(Arc::new(keys))
        } else {
            ZoneTrust::Bogus(format!("DNSKEY RRset signature at {}", zone))
        }
    }
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

fn records_of<'a>(section: &'a [Record], owner: &Name, record_type: WireType) -> Vec<&'a Record> {
    section
        .iter()
        .filter(|r| r.record_type() == record_type && r.name() == owner)
        .collect()
}

fn covering_signatures(section: &[Record], owner: &Name, record_type: WireType) -> Vec<RrsigRecord> {
    let covered = u16::from(record_type);
    section
        .iter()
        .filter(|r| r.record_type() == WireType::RRSIG && r.name() == owner)
        .filter_map(|r| RrsigRecord::from_record(r).ok())
        .filter(|sig| sig.type_covered.to_u16() == covered)
        .collect()
}

/// RRsets of a section in first-seen order, RRSIGs excluded.
fn group_rrsets(section: &[Record]) -> Vec<RrSet<'_>> {
    let mut rrsets: Vec<RrSet<'_>> = Vec::new();
    for record in section {
        let record_type = record.record_type();
        if record_type == WireType::RRSIG || record_type == WireType::OPT {
            continue;
        }
        match rrsets
            .iter_mut()
            .find(|set| set.record_type == record_type && set.owner == record.name())
        {
            Some(set) => set.records.push(record),
            None => rrsets.push(RrSet {
                owner: record.name(),
                record_type,
                records: vec![record],
            }),
        }
    }
    rrsets
}
