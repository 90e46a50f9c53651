use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::Record;
use rsdns_application::ports::DnssecStatus;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Positive,
    /// NXDOMAIN or NODATA; the message carries the rcode and SOA
    Negative,
}

/// What the cache hands out: a copy of the stored answer message.
///
/// The message holds only the answer, authority and additional sections
/// plus the rcode; the query server copies those into its own response.
#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub message: Message,
    pub kind: AnswerKind,
    pub dnssec_status: DnssecStatus,
}

impl CachedAnswer {
    pub fn positive(message: Message, dnssec_status: DnssecStatus) -> Self {
        Self {
            message,
            kind: AnswerKind::Positive,
            dnssec_status,
        }
    }

    pub fn negative(message: Message, dnssec_status: DnssecStatus) -> Self {
        Self {
            message,
            kind: AnswerKind::Negative,
            dnssec_status,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.kind == AnswerKind::Negative
    }

    pub fn response_code(&self) -> ResponseCode {
        self.message.response_code()
    }

    /// Copy with every record TTL lowered by `elapsed_secs`.
    pub fn aged(&self, elapsed_secs: u32) -> Self {
        self.map_ttls(|ttl| ttl.saturating_sub(elapsed_secs))
    }

    /// Copy with every record TTL replaced by `ttl`.
    pub fn with_ttl(&self, ttl: u32) -> Self {
        self.map_ttls(|_| ttl)
    }

    fn map_ttls(&self, f: impl Fn(u32) -> u32) -> Self {
        let mut message = self.message.clone();
        let adjust = |records: Vec<Record>| -> Vec<Record> {
            records
                .into_iter()
                .map(|mut r| {
                    let ttl = f(r.ttl());
                    r.set_ttl(ttl);
                    r
                })
                .collect()
        };

        let answers = adjust(message.take_answers());
        let authority = adjust(message.take_name_servers());
        let additionals = adjust(message.take_additionals());
        message.insert_answers(answers);
        message.insert_name_servers(authority);
        message.insert_additionals(additionals);

        Self {
            message,
            kind: self.kind,
            dnssec_status: self.dnssec_status,
        }
    }
}

/// Stored form of a cached answer.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub answer: CachedAnswer,
    pub inserted_at: Instant,
    pub expires_at: Instant,
    /// Set once the entry has been handed out stale; the next read misses.
    pub stale_served: bool,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    pub fn elapsed_secs(&self, now: Instant) -> u32 {
        now.saturating_duration_since(self.inserted_at).as_secs() as u32
    }
}
