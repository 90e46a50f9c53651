use super::{RecordClass, RecordType};
use std::fmt;
use std::sync::Arc;

/// DNS query as seen by the resolution pipeline.
/// Uses `Arc<str>` for zero-cost cloning across use case → resolver → cache.
#[derive(Debug, Clone)]
pub struct DnsQuery {
    pub name: Arc<str>,
    pub record_type: RecordType,
    pub class: RecordClass,
    /// Client asked for DNSSEC records (EDNS DO bit).
    pub dnssec_ok: bool,
}

impl DnsQuery {
    pub fn new(name: impl Into<Arc<str>>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type,
            class: RecordClass::IN,
            dnssec_ok: false,
        }
    }

    pub fn with_class(mut self, class: RecordClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_dnssec_ok(mut self, dnssec_ok: bool) -> Self {
        self.dnssec_ok = dnssec_ok;
        self
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::new(&self.name, self.record_type, self.class)
    }
}

/// Cache slot identity: (owner, type, class) with the owner in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    name: Arc<str>,
    record_type: RecordType,
    class: RecordClass,
}

impl QueryKey {
    pub fn new(name: &str, record_type: RecordType, class: RecordClass) -> Self {
        Self {
            name: normalize_name(name).into(),
            record_type,
            class,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn class(&self) -> RecordClass {
        self.class
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.class, self.record_type)
    }
}

/// ASCII-lowercases `name` and leaves exactly one trailing dot.
/// The root zone, empty input and any run of dots all become `"."`.
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return ".".to_string();
    }
    let mut out = String::with_capacity(trimmed.len() + 1);
    out.push_str(trimmed);
    out.make_ascii_lowercase();
    out.push('.');
    out
}
