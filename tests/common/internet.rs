use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::{A, CNAME, NS, SOA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use rsdns_domain::DomainError;
use rsdns_infrastructure::dns::registry::AuthServer;
use rsdns_infrastructure::dns::transport::UpstreamExchanger;
use rsdns_infrastructure::dns::wire::MessageBuilder;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

/// A small authoritative zone: records, delegations to child zones and an
/// SOA for negative answers.
pub struct Zone {
    apex: Name,
    records: Vec<Record>,
    cuts: Vec<(Name, Vec<(Name, IpAddr)>)>,
}

impl Zone {
    pub fn new(apex: &str) -> Self {
        Self {
            apex: name(apex),
            records: Vec::new(),
            cuts: Vec::new(),
        }
    }

    pub fn a(mut self, owner: &str, addr: &str, ttl: u32) -> Self {
        let v4: Ipv4Addr = addr.parse().unwrap();
        self.records
            .push(Record::from_rdata(name(owner), ttl, RData::A(A::from(v4))));
        self
    }

    pub fn cname(mut self, owner: &str, target: &str, ttl: u32) -> Self {
        self.records.push(Record::from_rdata(
            name(owner),
            ttl,
            RData::CNAME(CNAME(name(target))),
        ));
        self
    }

    /// Delegate `child` to a nameserver; the address goes out as glue.
    /// Call again with the same child to add more nameservers.
    pub fn delegate(mut self, child: &str, ns: &str, addr: &str) -> Self {
        let child = name(child);
        let server = (name(ns), addr.parse().unwrap());
        match self.cuts.iter_mut().find(|(c, _)| *c == child) {
            Some((_, servers)) => servers.push(server),
            None => self.cuts.push((child, vec![server])),
        }
        self
    }

    fn soa(&self) -> Record {
        let soa = SOA::new(
            Name::from_ascii("ns1").and_then(|l| l.append_name(&self.apex)).unwrap_or_else(|_| self.apex.clone()),
            Name::from_ascii("hostmaster").and_then(|l| l.append_name(&self.apex)).unwrap_or_else(|_| self.apex.clone()),
            2024010101,
            7200,
            3600,
            1_209_600,
            60,
        );
        Record::from_rdata(self.apex.clone(), 3600, RData::SOA(soa))
    }

    fn respond(&self, qname: &Name, qtype: RecordType) -> Message {
        let mut reply = Message::new();

        if let Some((child, servers)) = self
            .cuts
            .iter()
            .filter(|(child, _)| child.zone_of(qname))
            .max_by_key(|(child, _)| child.num_labels())
        {
            for (ns, addr) in servers {
                reply.add_name_server(Record::from_rdata(
                    child.clone(),
                    172_800,
                    RData::NS(NS(ns.clone())),
                ));
                if let IpAddr::V4(v4) = addr {
                    reply.add_additional(Record::from_rdata(ns.clone(), 172_800, RData::A(A::from(*v4))));
                }
            }
            return reply;
        }

        reply.set_authoritative(true);
        let owned: Vec<&Record> = self.records.iter().filter(|r| r.name() == qname).collect();
        let matching: Vec<Record> = owned
            .iter()
            .filter(|r| r.record_type() == qtype || r.record_type() == RecordType::CNAME)
            .map(|r| (*r).clone())
            .collect();

        if !matching.is_empty() {
            reply.insert_answers(matching);
        } else {
            if owned.is_empty() {
                reply.set_response_code(ResponseCode::NXDomain);
            }
            reply.add_name_server(self.soa());
        }
        reply
    }
}

enum Host {
    Serving(Arc<Zone>),
    Refusing,
    Silent,
}

/// Scripted upstream servers keyed by address. Addresses with no host
/// behave like a silent server.
#[derive(Clone, Default)]
pub struct Internet {
    hosts: Arc<Mutex<HashMap<IpAddr, Host>>>,
    queries: Arc<AtomicU64>,
    asked: Arc<Mutex<Vec<IpAddr>>>,
}

impl Internet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(&self, addr: &str, zone: Zone) -> &Self {
        self.insert(addr, Host::Serving(Arc::new(zone)))
    }

    pub fn refusing(&self, addr: &str) -> &Self {
        self.insert(addr, Host::Refusing)
    }

    pub fn silent(&self, addr: &str) -> &Self {
        self.insert(addr, Host::Silent)
    }

    fn insert(&self, addr: &str, host: Host) -> &Self {
        self.hosts.lock().unwrap().insert(addr.parse().unwrap(), host);
        self
    }

    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn queries_to(&self, addr: &str) -> usize {
        let addr: IpAddr = addr.parse().unwrap();
        self.asked.lock().unwrap().iter().filter(|a| **a == addr).count()
    }

    /// The usual test layout: a root at 198.41.0.4 delegating com. and
    /// net., with example.com. and example.net. served below them.
    pub fn example() -> Self {
        let internet = Self::new();
        internet
            .host(
                "198.41.0.4",
                Zone::new(".")
                    .delegate("com.", "a.gtld-servers.net.", "192.5.6.30")
                    .delegate("net.", "b.gtld-servers.net.", "192.33.14.30"),
            )
            .host(
                "192.5.6.30",
                Zone::new("com.").delegate("example.com.", "ns1.example.com.", "192.0.2.1"),
            )
            .host(
                "192.33.14.30",
                Zone::new("net.").delegate("example.net.", "ns1.example.net.", "198.51.100.1"),
            )
            .host(
                "192.0.2.1",
                Zone::new("example.com.")
                    .a("example.com.", "192.0.2.10", 300)
                    .a("www.example.com.", "192.0.2.80", 300)
                    .cname("cdn.example.com.", "edge.example.net.", 300),
            )
            .host(
                "198.51.100.1",
                Zone::new("example.net.").a("edge.example.net.", "198.51.100.20", 60),
            );
        internet
    }
}

#[async_trait]
impl UpstreamExchanger for Internet {
    async fn exchange(
        &self,
        server: &AuthServer,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.asked.lock().unwrap().push(server.addr.ip());
        let request = MessageBuilder::parse(query)?;
        let question = request.queries()[0].clone();

        let body = {
            let hosts = self.hosts.lock().unwrap();
            match hosts.get(&server.addr.ip()) {
                Some(Host::Serving(zone)) => Some(zone.respond(question.name(), question.query_type())),
                Some(Host::Refusing) => {
                    let mut refused = Message::new();
                    refused.set_response_code(ResponseCode::Refused);
                    Some(refused)
                }
                Some(Host::Silent) | None => None,
            }
        };

        let Some(mut reply) = body else {
            tokio::time::sleep(timeout).await;
            return Err(DomainError::Transport(format!("{} did not answer", server.addr)));
        };
        reply
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired());
        reply.add_query(question);
        MessageBuilder::serialize(&reply)
    }
}
