#![allow(dead_code)]
pub mod builders;
pub mod dns_server_mock;
pub mod fake_network;

pub use builders::{cache, cache_with_stale, ip, name, registry, server, RecordBuilder, ReplyBuilder};
pub use dns_server_mock::MockDnsServer;
pub use fake_network::{Behavior, FakeNetwork};
