use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Recursive resolution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// IPv4 root server hints
    #[serde(default = "default_root_servers")]
    pub root_servers: Vec<String>,

    /// IPv6 root server hints
    #[serde(default = "default_root6_servers")]
    pub root6_servers: Vec<String>,

    /// Servers asked with recursion desired once iteration has run out of
    /// candidates. Accepts `tls://ip[:port]#name` for DNS-over-TLS.
    #[serde(default)]
    pub fallback_servers: Vec<String>,

    /// Overall per-query deadline in milliseconds
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Per-upstream attempt timeout in milliseconds
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    /// Maximum delegation steps (referrals, CNAME hops and nameserver
    /// address lookups) spent on one query
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default)]
    pub prefer_ipv6: bool,

    /// Consecutive failures after which a server is deprioritized
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// EDNS0 UDP payload size advertised on outbound queries
    #[serde(default = "default_edns_payload")]
    pub edns_payload: u16,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root_servers: default_root_servers(),
            root6_servers: default_root6_servers(),
            fallback_servers: vec![],
            query_timeout_ms: default_query_timeout_ms(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            max_depth: default_max_depth(),
            prefer_ipv6: false,
            failure_threshold: default_failure_threshold(),
            edns_payload: default_edns_payload(),
        }
    }
}

/// A parsed upstream server entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub addr: SocketAddr,
    /// TLS server name; `Some` means the server is reached over DNS-over-TLS.
    pub tls_name: Option<String>,
}

impl FromStr for ServerSpec {
    type Err = String;

    /// Accepted forms: `1.2.3.4`, `1.2.3.4:53`, `2001:db8::1`, `[2001:db8::1]:53`
    /// and `tls://1.2.3.4[:853]#server.name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("tls://") {
            let (addr, name) = rest
                .split_once('#')
                .ok_or_else(|| format!("TLS server {} needs a #server-name suffix", s))?;
            if name.is_empty() {
                return Err(format!("TLS server {} has an empty server name", s));
            }
            return Ok(Self {
                addr: parse_addr(addr, 853)?,
                tls_name: Some(name.to_string()),
            });
        }

        Ok(Self {
            addr: parse_addr(s, 53)?,
            tls_name: None,
        })
    }
}

impl fmt::Display for ServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tls_name {
            Some(name) => write!(f, "tls://{}#{}", self.addr, name),
            None => write!(f, "{}", self.addr),
        }
    }
}

fn parse_addr(s: &str, default_port: u16) -> Result<SocketAddr, String> {
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }
    s.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, default_port))
        .map_err(|_| format!("Invalid server address: {}", s))
}

fn default_root_servers() -> Vec<String> {
    [
        "198.41.0.4:53",
        "170.247.170.2:53",
        "192.33.4.12:53",
        "199.7.91.13:53",
        "192.203.230.10:53",
        "192.5.5.241:53",
        "192.112.36.4:53",
        "198.97.190.53:53",
        "192.36.148.17:53",
        "192.58.128.30:53",
        "193.0.14.129:53",
        "199.7.83.42:53",
        "202.12.27.33:53",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_root6_servers() -> Vec<String> {
    [
        "[2001:503:ba3e::2:30]:53",
        "[2801:1b8:10::b]:53",
        "[2001:500:2::c]:53",
        "[2001:500:2d::d]:53",
        "[2001:500:a8::e]:53",
        "[2001:500:2f::f]:53",
        "[2001:500:12::d0d]:53",
        "[2001:500:1::53]:53",
        "[2001:7fe::53]:53",
        "[2001:503:c27::2:30]:53",
        "[2001:7fd::1]:53",
        "[2001:500:9f::42]:53",
        "[2001:dc3::35]:53",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_query_timeout_ms() -> u64 {
    2000
}

fn default_upstream_timeout_ms() -> u64 {
    800
}

fn default_max_depth() -> usize {
    16
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_edns_payload() -> u16 {
    1232
}
