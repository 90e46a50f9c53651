use rsdns_domain::DomainError;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// Maximum UDP DNS response size with EDNS(0)
pub const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// DNS over UDP. One ephemeral socket per exchange, connected to the server
/// so the kernel drops datagrams from other sources.
pub struct UdpTransport;

impl UdpTransport {
    pub async fn exchange(
        server: SocketAddr,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        if query.len() < 2 {
            return Err(DomainError::Transport("Query shorter than a DNS id".into()));
        }

        let bind_addr = if server.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };

        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| {
            DomainError::Transport(format!("Failed to bind UDP socket: {}", e))
        })?;
        socket.connect(server).await.map_err(|e| {
            DomainError::Transport(format!("Failed to connect UDP socket to {}: {}", server, e))
        })?;

        let exchange = async {
            socket.send(query).await.map_err(|e| {
                DomainError::Transport(format!("Failed to send UDP query to {}: {}", server, e))
            })?;

            let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
            loop {
                let len = socket.recv(&mut recv_buf).await.map_err(|e| {
                    DomainError::Transport(format!(
                        "Failed to receive UDP response from {}: {}",
                        server, e
                    ))
                })?;

                // A late reply to an earlier query on a reused port is skipped
                if len >= 2 && recv_buf[..2] == query[..2] {
                    recv_buf.truncate(len);
                    return Ok(recv_buf);
                }
                debug!(server = %server, len, "Discarding UDP datagram with mismatched id");
            }
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| {
                DomainError::Transport(format!(
                    "Timeout waiting for UDP response from {}",
                    server
                ))
            })?
    }
}
