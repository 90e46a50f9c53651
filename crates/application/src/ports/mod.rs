pub mod access_control;
pub mod block_list;
pub mod cache_maintenance;
pub mod dns_resolver;

pub use access_control::AccessControlPort;
pub use block_list::{BlockListPort, BlockListStats, BlocklistSourcePort};
pub use cache_maintenance::{CacheMaintenancePort, CacheStats};
pub use dns_resolver::{CacheStatus, DnsResolver, DnssecStatus, Resolution};
