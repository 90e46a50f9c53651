use rsdns_domain::config::ServerConfig;
use rsdns_infrastructure::dns::server::load_server_config;
use rsdns_infrastructure::dns::{QueryHandler, TcpListenerTask, TlsListenerTask, UdpListenerTask};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Addresses the listeners actually bound, plus their tasks.
pub struct DnsListeners {
    pub udp: SocketAddr,
    pub tcp: SocketAddr,
    pub tls: Option<SocketAddr>,
    pub tasks: Vec<JoinHandle<()>>,
}

impl DnsListeners {
    /// Wait for every listener to stop after the token is cancelled.
    pub async fn join(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Bind UDP and TCP on `server.bind` (and DoT on `server.bind_tls`) and
/// start serving until `shutdown` is cancelled.
///
/// With port 0, TCP binds the port UDP was given so both share one address.
pub async fn start_dns_server(
    server: &ServerConfig,
    handler: QueryHandler,
    shutdown: CancellationToken,
) -> anyhow::Result<DnsListeners> {
    let bind_addr = SocketAddr::from_str(&server.bind)?;
    let idle_timeout = Duration::from_secs(server.tcp_idle_timeout);

    info!(bind_address = %bind_addr, "Starting DNS server");

    let udp = UdpListenerTask::bind(bind_addr, handler.clone())
        .await?
        .with_cancellation(shutdown.clone());
    let udp_addr = udp.local_addr()?;
    info!(protocol = "UDP", address = %udp_addr, "DNS server listening");

    let tcp = TcpListenerTask::bind(udp_addr, handler.clone())
        .await?
        .with_idle_timeout(idle_timeout)
        .with_cancellation(shutdown.clone());
    let tcp_addr = tcp.local_addr()?;
    info!(protocol = "TCP", address = %tcp_addr, "DNS server listening");

    let mut tasks = vec![tokio::spawn(udp.run()), tokio::spawn(tcp.run())];

    let mut tls_addr = None;
    if let (Some(bind_tls), Some(cert), Some(key)) = (
        server.bind_tls.as_deref(),
        server.tls_certificate.as_deref(),
        server.tls_private_key.as_deref(),
    ) {
        let tls_config = load_server_config(cert, key)?;
        let tls = TlsListenerTask::bind(SocketAddr::from_str(bind_tls)?, tls_config, handler)
            .await?
            .with_idle_timeout(idle_timeout)
            .with_cancellation(shutdown);
        let addr = tls.local_addr()?;
        info!(protocol = "TLS", address = %addr, "DNS server listening");
        tls_addr = Some(addr);
        tasks.push(tokio::spawn(tls.run()));
    }

    info!("DNS server ready to accept queries");

    Ok(DnsListeners {
        udp: udp_addr,
        tcp: tcp_addr,
        tls: tls_addr,
        tasks,
    })
}
