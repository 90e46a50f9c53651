pub mod tcp;
pub mod tls;
pub mod udp;

use crate::dns::registry::AuthServer;
use async_trait::async_trait;
use rsdns_domain::DomainError;
use std::time::{Duration, Instant};
use tracing::debug;

pub use tcp::TcpTransport;
pub use tls::TlsTransport;
pub use udp::UdpTransport;

/// Sends one raw DNS query to one upstream server and returns the raw reply.
#[async_trait]
pub trait UpstreamExchanger: Send + Sync {
    async fn exchange(
        &self,
        server: &AuthServer,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError>;
}

/// True when the header's TC bit is set.
pub fn is_truncated(reply: &[u8]) -> bool {
    reply.len() > 2 && reply[2] & 0x02 != 0
}

/// Real network exchanger: DoT for servers with a TLS name, otherwise UDP
/// with a TCP retry when the reply comes back truncated.
pub struct NetworkExchanger {
    tls: TlsTransport,
}

impl NetworkExchanger {
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self {
            tls: TlsTransport::new()?,
        })
    }

    pub fn with_tls(tls: TlsTransport) -> Self {
        Self { tls }
    }
}

#[async_trait]
impl UpstreamExchanger for NetworkExchanger {
    async fn exchange(
        &self,
        server: &AuthServer,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        if let Some(name) = &server.tls_name {
            return self.tls.exchange(server.addr, name, query, timeout).await;
        }

        let started = Instant::now();
        let reply = UdpTransport::exchange(server.addr, query, timeout).await?;
        if !is_truncated(&reply) {
            return Ok(reply);
        }

        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(DomainError::Transport(format!(
                "No time left for TCP retry to {}",
                server.addr
            )));
        }
        debug!(server = %server, "Truncated UDP reply, retrying over TCP");
        TcpTransport::exchange(server.addr, query, remaining).await
    }
}
