//! Inbound DNS: the transport-agnostic query handler and one listener task
//! per transport.
pub mod handler;
pub mod tcp;
pub mod tls;
pub mod udp;

pub use handler::{BlockResponseMode, Protocol, QueryHandler};
pub use tcp::TcpListenerTask;
pub use tls::{load_server_config, TlsListenerTask};
pub use udp::UdpListenerTask;
