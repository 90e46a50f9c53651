use super::handler::{Protocol, QueryHandler};
use crate::dns::transport::tcp::{read_frame, write_frame};
use rsdns_domain::DomainError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Queries in flight or queued per connection. The reader waits for a free
/// slot before taking the next query.
const PIPELINE_DEPTH: usize = 32;

/// Serves DNS over TCP with 2-byte length framing.
pub struct TcpListenerTask {
    listener: TcpListener,
    handler: QueryHandler,
    idle_timeout: Duration,
    shutdown: CancellationToken,
}

impl TcpListenerTask {
    pub async fn bind(addr: SocketAddr, handler: QueryHandler) -> Result<Self, DomainError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            DomainError::IoError(format!("Failed to bind TCP listener on {}: {}", addr, e))
        })?;

        Ok(Self {
            listener,
            handler,
            idle_timeout: Duration::from_secs(10),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) {
        let local = self.listener.local_addr().ok();
        info!(protocol = "TCP", address = ?local, "DNS listener started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(protocol = "TCP", "DNS listener shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let _ = stream.set_nodelay(true);
                        tokio::spawn(serve_stream(
                            stream,
                            peer,
                            self.handler.clone(),
                            Protocol::Tcp,
                            self.idle_timeout,
                            self.shutdown.child_token(),
                        ));
                    }
                    Err(e) => error!(protocol = "TCP", error = %e, "Accept failed"),
                }
            }
        }
    }
}

/// Answer framed queries on one connection until the client closes it, it
/// sits idle past `idle_timeout`, or shutdown is requested.
///
/// Queries are pipelined: each one is resolved in its own task and responses
/// are written in completion order. Every task holds a reserved slot of the
/// response queue, so at most `PIPELINE_DEPTH` are outstanding.
pub(crate) async fn serve_stream<S>(
    stream: S,
    peer: SocketAddr,
    handler: QueryHandler,
    protocol: Protocol,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(PIPELINE_DEPTH);

    let writer_task = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &response).await {
                debug!(client = %peer, error = %e, "Stream write failed");
                break;
            }
        }
    });

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = tokio::time::timeout(idle_timeout, read_frame(&mut reader)) => frame,
        };

        let request = match frame {
            Ok(Ok(Some(request))) => request,
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                debug!(client = %peer, protocol = %protocol, error = %e, "Stream read failed");
                break;
            }
            Err(_) => {
                debug!(client = %peer, protocol = %protocol, "Idle connection closed");
                break;
            }
        };

        let permit = tokio::select! {
            _ = shutdown.cancelled() => break,
            permit = tx.clone().reserve_owned() => match permit {
                Ok(permit) => permit,
                // Writer is gone, nothing more can be answered.
                Err(_) => break,
            },
        };

        let handler = handler.clone();
        tokio::spawn(async move {
            if let Some(response) = handler.handle(&request, peer.ip(), protocol).await {
                permit.send(response);
            }
        });
    }

    // In-flight queries still hold permits; the writer drains them and exits.
    drop(tx);
    let _ = writer_task.await;
}
