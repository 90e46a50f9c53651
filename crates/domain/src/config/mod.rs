//! Configuration module for rsdns
//!
//! One structure per concern, all loaded from a single TOML file:
//! - `root`: main configuration, loading and CLI overrides
//! - `server`: listener addresses and TLS material
//! - `resolver`: root/fallback servers, timeouts and delegation limits
//! - `cache`: response cache sizing and TTL policy
//! - `dnssec`: validation switch and trust anchors
//! - `access`: client CIDR access list
//! - `blocking`: blocklist sources and block response
//! - `logging`: log level and format
//! - `errors`: configuration errors

pub mod access;
pub mod blocking;
pub mod cache;
pub mod dnssec;
pub mod errors;
pub mod logging;
pub mod resolver;
pub mod root;
pub mod server;

pub use access::AccessConfig;
pub use blocking::{BlockResponse, BlockingConfig};
pub use cache::CacheConfig;
pub use dnssec::DnssecConfig;
pub use errors::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use resolver::{ResolverConfig, ServerSpec};
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;

/// Lower bound for every network timeout.
pub const MIN_TIMEOUT_MS: u64 = 250;

/// Lower bound for the response cache capacity.
pub const MIN_CACHE_SIZE: usize = 1024;
