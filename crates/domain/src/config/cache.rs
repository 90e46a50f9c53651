use serde::{Deserialize, Serialize};

/// Response cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum number of cached responses (floor: 1024)
    #[serde(default = "default_size")]
    pub size: usize,

    /// Answer once from an expired entry while it is refreshed in the background
    #[serde(default)]
    pub serve_stale: bool,

    /// How long past expiry an entry may still be served stale, in seconds
    #[serde(default = "default_stale_window_secs")]
    pub stale_window_secs: u64,

    /// Lower bound for the TTL of cached NXDOMAIN/NODATA answers
    #[serde(default = "default_negative_ttl_floor")]
    pub negative_ttl_floor: u32,

    /// Upper bound for the TTL of cached NXDOMAIN/NODATA answers
    #[serde(default = "default_negative_ttl_max")]
    pub negative_ttl_max: u32,

    /// Upper bound for any cached TTL
    #[serde(default = "default_max_ttl")]
    pub max_ttl: u32,

    /// Seconds between expired-entry sweeps
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            serve_stale: false,
            stale_window_secs: default_stale_window_secs(),
            negative_ttl_floor: default_negative_ttl_floor(),
            negative_ttl_max: default_negative_ttl_max(),
            max_ttl: default_max_ttl(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
        }
    }
}

fn default_size() -> usize {
    100_000
}

fn default_stale_window_secs() -> u64 {
    86_400
}

fn default_negative_ttl_floor() -> u32 {
    5
}

fn default_negative_ttl_max() -> u32 {
    3600
}

fn default_max_ttl() -> u32 {
    604_800
}

fn default_maintenance_interval_secs() -> u64 {
    300
}
