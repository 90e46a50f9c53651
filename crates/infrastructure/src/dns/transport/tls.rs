use super::tcp::exchange_stream;
use rsdns_domain::DomainError;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// DNS over TLS (RFC 7858), verified against the webpki root store with the
/// server's configured name as SNI.
#[derive(Clone)]
pub struct TlsTransport {
    connector: TlsConnector,
}

impl TlsTransport {
    pub fn new() -> Result<Self, DomainError> {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| DomainError::Transport(format!("Invalid TLS client config: {}", e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self::with_config(Arc::new(config)))
    }

    pub fn with_config(config: Arc<ClientConfig>) -> Self {
        Self {
            connector: TlsConnector::from(config),
        }
    }

    pub async fn exchange(
        &self,
        server: SocketAddr,
        tls_name: &str,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        let name = ServerName::try_from(tls_name.to_string()).map_err(|e| {
            DomainError::Transport(format!("Invalid TLS server name '{}': {}", tls_name, e))
        })?;

        let exchange = async {
            let tcp = TcpStream::connect(server).await.map_err(|e| {
                DomainError::Transport(format!("Failed to connect to {}: {}", server, e))
            })?;
            tcp.set_nodelay(true)?;
            let mut stream = self.connector.connect(name, tcp).await.map_err(|e| {
                DomainError::Transport(format!("TLS handshake with {} failed: {}", server, e))
            })?;
            exchange_stream(&mut stream, query).await
        };

        tokio::time::timeout(timeout, exchange).await.map_err(|_| {
            DomainError::Transport(format!("Timeout waiting for TLS response from {}", server))
        })?
    }
}
