//! rsdns domain layer
pub mod access;
pub mod config;
pub mod dns_query;
pub mod errors;
pub mod record_type;

pub use access::{AccessList, AccessPolicy};
pub use config::{CliOverrides, Config, ConfigError};
pub use dns_query::{normalize_name, DnsQuery, QueryKey};
pub use errors::DomainError;
pub use record_type::{RecordClass, RecordType};
