pub mod block_list;
pub mod cache;
pub mod dnssec;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod transport;
pub mod wire;

pub use block_list::{BlockList, BlocklistDownloader};
pub use cache::{CacheLookup, CachePolicy, CachedAnswer, ResponseCache};
pub use dnssec::{ChainValidator, TrustAnchorStore};
pub use registry::{AddressFamily, AuthServer, ServerRegistry, ServerSet};
pub use resolver::{LocalAddresses, RecursiveResolver, ResolverSettings};
pub use server::{BlockResponseMode, Protocol, QueryHandler, TcpListenerTask, TlsListenerTask, UdpListenerTask};
pub use transport::{NetworkExchanger, UpstreamExchanger};
