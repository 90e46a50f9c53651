#![allow(dead_code)]
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, NS, SOA};
use hickory_proto::rr::{Name, RData, Record};
use rsdns_infrastructure::dns::cache::{CachePolicy, ResponseCache};
use rsdns_infrastructure::dns::registry::{AuthServer, ServerRegistry};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

pub fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn server(s: &str) -> AuthServer {
    AuthServer::udp(SocketAddr::new(ip(s), 53))
}

/// Record constructors for scripted replies.
pub struct RecordBuilder;

impl RecordBuilder {
    pub fn a(owner: &str, addr: &str, ttl: u32) -> Record {
        let v4: Ipv4Addr = addr.parse().unwrap();
        Record::from_rdata(name(owner), ttl, RData::A(A::from(v4)))
    }

    pub fn aaaa(owner: &str, addr: &str, ttl: u32) -> Record {
        let v6: Ipv6Addr = addr.parse().unwrap();
        Record::from_rdata(name(owner), ttl, RData::AAAA(AAAA::from(v6)))
    }

    pub fn ns(zone: &str, host: &str, ttl: u32) -> Record {
        Record::from_rdata(name(zone), ttl, RData::NS(NS(name(host))))
    }

    pub fn cname(owner: &str, target: &str, ttl: u32) -> Record {
        Record::from_rdata(name(owner), ttl, RData::CNAME(CNAME(name(target))))
    }

    pub fn soa(zone: &str, ttl: u32, minimum: u32) -> Record {
        let soa = SOA::new(
            name(&format!("ns1.{}", zone)),
            name(&format!("hostmaster.{}", zone)),
            2024010101,
            7200,
            3600,
            1_209_600,
            minimum,
        );
        Record::from_rdata(name(zone), ttl, RData::SOA(soa))
    }
}

/// Reply bodies; the fake network fills in id, flags and question.
pub struct ReplyBuilder;

impl ReplyBuilder {
    pub fn answer(records: Vec<Record>) -> Message {
        let mut message = Message::new();
        message.set_authoritative(true);
        message.insert_answers(records);
        message
    }

    /// Delegation to `zone`; `glue` lists (nameserver, address) pairs.
    pub fn referral(zone: &str, nameservers: &[&str], glue: &[(&str, &str)]) -> Message {
        let mut message = Message::new();
        message.insert_name_servers(
            nameservers
                .iter()
                .map(|ns| RecordBuilder::ns(zone, ns, 172_800))
                .collect(),
        );
        message.insert_additionals(
            glue.iter()
                .map(|(ns, addr)| match ip(addr) {
                    IpAddr::V4(_) => RecordBuilder::a(ns, addr, 172_800),
                    IpAddr::V6(_) => RecordBuilder::aaaa(ns, addr, 172_800),
                })
                .collect(),
        );
        message
    }

    pub fn nxdomain(zone: &str, soa_ttl: u32, minimum: u32) -> Message {
        let mut message = Message::new();
        message.set_authoritative(true);
        message.set_response_code(ResponseCode::NXDomain);
        message.add_name_server(RecordBuilder::soa(zone, soa_ttl, minimum));
        message
    }

    pub fn nodata(zone: &str, soa_ttl: u32, minimum: u32) -> Message {
        let mut message = Message::new();
        message.set_authoritative(true);
        message.add_name_server(RecordBuilder::soa(zone, soa_ttl, minimum));
        message
    }

    pub fn rcode(code: ResponseCode) -> Message {
        let mut message = Message::new();
        message.set_response_code(code);
        message
    }
}

pub fn cache(capacity: usize) -> Arc<ResponseCache> {
    Arc::new(ResponseCache::new(capacity, CachePolicy::default()))
}

pub fn cache_with_stale(capacity: usize) -> Arc<ResponseCache> {
    let policy = CachePolicy {
        serve_stale: true,
        ..CachePolicy::default()
    };
    Arc::new(ResponseCache::new(capacity, policy))
}

/// Registry with one IPv4 root and optional fallback servers.
pub fn registry(roots: &[&str], fallback: &[&str]) -> Arc<ServerRegistry> {
    Arc::new(ServerRegistry::new(
        roots.iter().map(|s| server(s)).collect(),
        vec![],
        fallback.iter().map(|s| server(s)).collect(),
    ))
}
