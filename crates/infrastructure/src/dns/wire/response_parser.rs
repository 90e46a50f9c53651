use super::message_builder::OutboundQuery;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use rsdns_domain::DomainError;
use std::net::IpAddr;
use tracing::debug;

/// Longest CNAME chain followed inside a single answer section.
const MAX_INLINE_CNAME_HOPS: usize = 16;

/// Delegation to a zone closer to the query name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referral {
    pub zone: Name,
    pub nameservers: Vec<Name>,
    /// Glue addresses from the additional section, only for listed nameservers
    pub glue: Vec<(Name, IpAddr)>,
}

impl Referral {
    pub fn glue_for(&self, ns: &Name) -> impl Iterator<Item = IpAddr> + '_ {
        let ns = ns.clone();
        self.glue
            .iter()
            .filter(move |(name, _)| *name == ns)
            .map(|(_, ip)| *ip)
    }
}

/// What an upstream reply means for the iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    Answer,
    /// The answer section aliases the name but does not contain the target's data.
    Cname { target: Name },
    Referral(Referral),
    NxDomain,
    NoData,
    /// The server is not useful for this name; counts as a failure of the server.
    Lame(String),
}

pub struct ResponseParser;

impl ResponseParser {
    /// Check that a reply belongs to `query`: same id, QR set, same opcode
    /// and the same question.
    pub fn validate_reply(query: &OutboundQuery, reply: &Message) -> Result<(), DomainError> {
        if reply.id() != query.id {
            return Err(DomainError::InvalidDnsResponse(format!(
                "Reply id {} does not match query id {}",
                reply.id(),
                query.id
            )));
        }
        if reply.message_type() != MessageType::Response {
            return Err(DomainError::InvalidDnsResponse(
                "Reply does not have QR set".into(),
            ));
        }
        if reply.op_code() != query.message.op_code() {
            return Err(DomainError::InvalidDnsResponse(format!(
                "Reply opcode {:?} does not match query",
                reply.op_code()
            )));
        }
        if reply.queries() != query.message.queries() {
            return Err(DomainError::InvalidDnsResponse(
                "Reply question does not match query".into(),
            ));
        }
        Ok(())
    }

    /// Classify a validated reply to `(qname, qtype)` received from a server
    /// serving `current_zone`. `recursive` is set when the server was asked
    /// to recurse, so its negatives need not be authoritative.
    pub fn classify(
        reply: &Message,
        qname: &Name,
        qtype: RecordType,
        current_zone: &Name,
        recursive: bool,
    ) -> ResponseKind {
        let rcode = reply.response_code();
        if rcode == ResponseCode::NXDomain {
            if !recursive && !reply.authoritative() && !Self::has_soa(reply) {
                return ResponseKind::Lame("non-authoritative NXDOMAIN".into());
            }
            return ResponseKind::NxDomain;
        }
        if rcode != ResponseCode::NoError {
            return ResponseKind::Lame(format!("rcode {}", Self::rcode_to_status(rcode)));
        }

        let mut owner = qname.clone();
        for _ in 0..MAX_INLINE_CNAME_HOPS {
            let answered = reply.answers().iter().any(|r| {
                r.name() == &owner && (qtype == RecordType::ANY || r.record_type() == qtype)
            });
            if answered {
                return ResponseKind::Answer;
            }
            let next = reply
                .answers()
                .iter()
                .filter(|r| r.name() == &owner)
                .find_map(|r| match r.data() {
                    Some(RData::CNAME(cname)) => Some(cname.0.clone()),
                    _ => None,
                });
            match next {
                Some(target) => owner = target,
                None => break,
            }
        }
        if &owner != qname {
            debug!(name = %qname, target = %owner, "CNAME chain leaves the answer section");
            return ResponseKind::Cname { target: owner };
        }

        if Self::has_soa(reply) {
            return ResponseKind::NoData;
        }

        if let Some(referral) = Self::extract_referral(reply) {
            let closer = referral.zone.num_labels() > current_zone.num_labels()
                && current_zone.zone_of(&referral.zone)
                && referral.zone.zone_of(qname);
            if closer {
                return ResponseKind::Referral(referral);
            }
            if reply.authoritative() {
                return ResponseKind::NoData;
            }
            return ResponseKind::Lame(format!(
                "referral to {} is not closer than {}",
                referral.zone, current_zone
            ));
        }

        if reply.authoritative() || reply.recursion_available() {
            ResponseKind::NoData
        } else {
            ResponseKind::Lame("empty non-authoritative reply".into())
        }
    }

    fn has_soa(reply: &Message) -> bool {
        reply
            .name_servers()
            .iter()
            .any(|r| r.record_type() == RecordType::SOA)
    }

    fn extract_referral(reply: &Message) -> Option<Referral> {
        let zone = reply
            .name_servers()
            .iter()
            .find(|r| r.record_type() == RecordType::NS)?
            .name()
            .clone();

        let nameservers: Vec<Name> = reply
            .name_servers()
            .iter()
            .filter(|r| r.name() == &zone)
            .filter_map(|r| match r.data() {
                Some(RData::NS(ns)) => Some(ns.0.clone()),
                _ => None,
            })
            .collect();

        let glue = reply
            .additionals()
            .iter()
            .filter(|r| nameservers.contains(r.name()))
            .filter_map(|r| address_of(r).map(|ip| (r.name().clone(), ip)))
            .collect();

        Some(Referral {
            zone,
            nameservers,
            glue,
        })
    }

    /// Smallest TTL in the answer section.
    pub fn answer_ttl(reply: &Message) -> Option<u32> {
        reply.answers().iter().map(Record::ttl).min()
    }

    /// min(SOA TTL, SOA MINIMUM) from the authority section.
    pub fn soa_negative_ttl(reply: &Message) -> Option<u32> {
        reply.name_servers().iter().find_map(|r| match r.data() {
            Some(RData::SOA(soa)) => Some(soa.minimum().min(r.ttl())),
            _ => None,
        })
    }

    /// Addresses in the answer section owned by `name`.
    pub fn addresses(reply: &Message, name: &Name) -> Vec<IpAddr> {
        reply
            .answers()
            .iter()
            .filter(|r| r.name() == name)
            .filter_map(address_of)
            .collect()
    }

    pub fn rcode_to_status(rcode: ResponseCode) -> &'static str {
        match rcode {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::NXDomain => "NXDOMAIN",
            ResponseCode::ServFail => "SERVFAIL",
            ResponseCode::Refused => "REFUSED",
            ResponseCode::NotImp => "NOTIMP",
            ResponseCode::FormErr => "FORMERR",
            _ => "UNKNOWN",
        }
    }
}

pub fn address_of(record: &Record) -> Option<IpAddr> {
    match record.data() {
        Some(RData::A(a)) => Some(IpAddr::V4(a.0)),
        Some(RData::AAAA(aaaa)) => Some(IpAddr::V6(aaaa.0)),
        _ => None,
    }
}
