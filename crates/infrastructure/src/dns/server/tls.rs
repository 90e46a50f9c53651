use super::handler::{Protocol, QueryHandler};
use super::tcp::serve_stream;
use rsdns_domain::DomainError;
use rustls::pki_types::CertificateDer;
use rustls::ServerConfig;
use std::io::{BufReader, Cursor};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Build a rustls server config from PEM certificate chain and key files.
pub fn load_server_config(
    cert_path: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
) -> Result<Arc<ServerConfig>, DomainError> {
    let read = |path: &Path| {
        std::fs::read(path).map_err(|e| {
            DomainError::IoError(format!("Failed to read '{}': {}", path.display(), e))
        })
    };
    let cert_pem = read(cert_path.as_ref())?;
    let key_pem = read(key_path.as_ref())?;
    server_config_from_pem(&cert_pem, &key_pem)
}

pub fn server_config_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>, DomainError> {
    let mut cert_reader = BufReader::new(Cursor::new(cert_pem));
    let cert_chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DomainError::Transport(format!("Failed to parse certificate PEM: {}", e)))?;
    if cert_chain.is_empty() {
        return Err(DomainError::Transport("No certificates found in PEM data".into()));
    }

    let mut key_reader = BufReader::new(Cursor::new(key_pem));
    let private_key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| DomainError::Transport(format!("Failed to parse private key PEM: {}", e)))?
        .ok_or_else(|| DomainError::Transport("No private key found in PEM data".into()))?;

    let config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| DomainError::Transport(format!("Invalid TLS server config: {}", e)))?
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| DomainError::Transport(format!("Certificate and key do not match: {}", e)))?;

    Ok(Arc::new(config))
}

/// Serves DNS over TLS (RFC 7858): TCP framing inside a TLS session.
pub struct TlsListenerTask {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    handler: QueryHandler,
    idle_timeout: Duration,
    shutdown: CancellationToken,
}

impl TlsListenerTask {
    pub async fn bind(
        addr: SocketAddr,
        config: Arc<ServerConfig>,
        handler: QueryHandler,
    ) -> Result<Self, DomainError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            DomainError::IoError(format!("Failed to bind TLS listener on {}: {}", addr, e))
        })?;

        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(config),
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
        info!(protocol = "TLS", address = ?local, "DNS listener started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(protocol = "TLS", "DNS listener shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let acceptor = self.acceptor.clone();
                        let handler = self.handler.clone();
                        let idle_timeout = self.idle_timeout;
                        let shutdown = self.shutdown.child_token();
                        tokio::spawn(async move {
                            let tls = match tokio::time::timeout(idle_timeout, acceptor.accept(stream)).await {
                                Ok(Ok(tls)) => tls,
                                Ok(Err(e)) => {
                                    debug!(client = %peer, error = %e, "TLS handshake failed");
                                    return;
                                }
                                Err(_) => {
                                    debug!(client = %peer, "TLS handshake timed out");
                                    return;
                                }
                            };
                            serve_stream(tls, peer, handler, Protocol::Tls, idle_timeout, shutdown).await;
                        });
                    }
                    Err(e) => error!(protocol = "TLS", error = %e, "Accept failed"),
                }
            }
        }
    }
}
