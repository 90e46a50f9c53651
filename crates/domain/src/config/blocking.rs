use serde::{Deserialize, Serialize};

/// Domain blocklist configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockingConfig {
    /// Enable blocking (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding downloaded and hand-placed list files
    #[serde(default = "default_dir")]
    pub dir: String,

    /// List URLs downloaded into `dir` on every refresh
    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Delay before the first refresh; up to 50% jitter is added
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    #[serde(default)]
    pub response: BlockResponse,

    /// TTL of synthesized block answers
    #[serde(default = "default_block_ttl")]
    pub block_ttl: u32,

    /// Extra entries, same syntax as list lines
    #[serde(default)]
    pub custom_blocked: Vec<String>,

    /// Entries never blocked; `*.name` allows every subdomain of name
    #[serde(default)]
    pub whitelist: Vec<String>,
}

/// Answer returned for a blocked name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockResponse {
    #[default]
    Nxdomain,
    /// `0.0.0.0` for A, `::` for AAAA, empty NOERROR otherwise
    Sinkhole,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_dir(),
            sources: vec![],
            refresh_interval_secs: default_refresh_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
            response: BlockResponse::default(),
            block_ttl: default_block_ttl(),
            custom_blocked: vec![],
            whitelist: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_dir() -> String {
    "blocklists".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    86_400
}

fn default_startup_delay_secs() -> u64 {
    1
}

fn default_block_ttl() -> u32 {
    60
}
