use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// UDP and TCP listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// DNS-over-TLS listen address, disabled when unset
    #[serde(default)]
    pub bind_tls: Option<String>,

    #[serde(default)]
    pub tls_certificate: Option<String>,

    #[serde(default)]
    pub tls_private_key: Option<String>,

    /// Seconds an idle TCP/TLS connection is kept open
    #[serde(default = "default_tcp_idle_timeout")]
    pub tcp_idle_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            bind_tls: None,
            tls_certificate: None,
            tls_private_key: None,
            tcp_idle_timeout: default_tcp_idle_timeout(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:53".to_string()
}

fn default_tcp_idle_timeout() -> u64 {
    10
}
