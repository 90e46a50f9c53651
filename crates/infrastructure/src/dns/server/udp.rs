use super::handler::{Protocol, QueryHandler};
use rsdns_domain::DomainError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Receive buffer; large enough for any EDNS query.
const RECV_BUFFER: usize = 4096;

/// Serves DNS over UDP on one socket, one task per datagram.
pub struct UdpListenerTask {
    socket: Arc<UdpSocket>,
    handler: QueryHandler,
    shutdown: CancellationToken,
}

impl UdpListenerTask {
    pub async fn bind(addr: SocketAddr, handler: QueryHandler) -> Result<Self, DomainError> {
        let socket = UdpSocket::bind(addr).await.map_err(|e| {
            DomainError::IoError(format!("Failed to bind UDP listener on {}: {}", addr, e))
        })?;

        Ok(Self {
            socket: Arc::new(socket),
            handler,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn run(self) {
        let local = self.socket.local_addr().ok();
        info!(protocol = "UDP", address = ?local, "DNS listener started");

        let mut buf = vec![0u8; RECV_BUFFER];
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(protocol = "UDP", "DNS listener shutting down");
                    break;
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (size, peer) = match received {
                        Ok(received) => received,
                        Err(e) => {
                            // ICMP errors from earlier sends surface here on some platforms
                            error!(protocol = "UDP", error = %e, "Receive failed");
                            continue;
                        }
                    };

                    let request = buf[..size].to_vec();
                    let socket = Arc::clone(&self.socket);
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        let Some(response) = handler.handle(&request, peer.ip(), Protocol::Udp).await else {
                            debug!(client = %peer, size, "Dropped unreadable datagram");
                            return;
                        };
                        if let Err(e) = socket.send_to(&response, peer).await {
                            error!(client = %peer, error = %e, "UDP send failed");
                        }
                    });
                }
            }
        }
    }
}
