use super::Internet;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use rsdns_application::use_cases::HandleQueryUseCase;
use rsdns_domain::{AccessList, AccessPolicy};
use rsdns_infrastructure::dns::cache::{CachePolicy, ResponseCache};
use rsdns_infrastructure::dns::registry::{AuthServer, ServerRegistry};
use rsdns_infrastructure::dns::transport::tcp::{read_frame, write_frame};
use rsdns_infrastructure::dns::{
    BlockList, BlockResponseMode, QueryHandler, RecursiveResolver, ResolverSettings,
    TcpListenerTask, UdpListenerTask,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;

fn upstream(addr: &str) -> AuthServer {
    AuthServer::udp(SocketAddr::new(addr.parse().unwrap(), 53))
}

pub struct TestServerBuilder {
    internet: Internet,
    roots: Vec<String>,
    fallback: Vec<String>,
    blocked: Vec<String>,
    whitelist: Vec<String>,
    block_response: BlockResponseMode,
    allow: Vec<String>,
    default_policy: AccessPolicy,
    query_timeout: Duration,
    upstream_timeout: Duration,
}

impl TestServerBuilder {
    pub fn new(internet: Internet) -> Self {
        Self {
            internet,
            roots: vec!["198.41.0.4".to_string()],
            fallback: vec![],
            blocked: vec![],
            whitelist: vec![],
            block_response: BlockResponseMode::Nxdomain,
            allow: vec!["127.0.0.0/8".to_string(), "::1/128".to_string()],
            default_policy: AccessPolicy::Deny,
            query_timeout: Duration::from_secs(2),
            upstream_timeout: Duration::from_millis(300),
        }
    }

    pub fn with_roots(mut self, roots: &[&str]) -> Self {
        self.roots = roots.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_fallback(mut self, fallback: &[&str]) -> Self {
        self.fallback = fallback.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_blocked(mut self, entries: &[&str]) -> Self {
        self.blocked = entries.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_whitelist(mut self, entries: &[&str]) -> Self {
        self.whitelist = entries.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_sinkhole(mut self, ttl: u32) -> Self {
        self.block_response = BlockResponseMode::Sinkhole { ttl };
        self
    }

    pub fn with_allow(mut self, allow: &[&str]) -> Self {
        self.allow = allow.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub async fn start(self) -> TestServer {
        let cache = Arc::new(ResponseCache::new(4096, CachePolicy::default()));
        let registry = Arc::new(ServerRegistry::new(
            self.roots.iter().map(|s| upstream(s)).collect(),
            vec![],
            self.fallback.iter().map(|s| upstream(s)).collect(),
        ));
        let settings = ResolverSettings::default().with_upstream_timeout(self.upstream_timeout);
        let resolver = Arc::new(RecursiveResolver::new(
            Arc::clone(&cache),
            registry,
            Arc::new(self.internet.clone()),
            settings,
        ));

        let access = Arc::new(AccessList::from_rules(&self.allow, &[] as &[String], self.default_policy).unwrap());
        let block_list = Arc::new(BlockList::new(&self.blocked, &self.whitelist));
        let use_case = Arc::new(
            HandleQueryUseCase::new(access, block_list, resolver)
                .with_query_timeout(self.query_timeout),
        );
        let handler = QueryHandler::new(use_case).with_block_response(self.block_response);

        let shutdown = CancellationToken::new();
        let udp = UdpListenerTask::bind("127.0.0.1:0".parse().unwrap(), handler.clone())
            .await
            .unwrap()
            .with_cancellation(shutdown.clone());
        let addr = udp.local_addr().unwrap();
        let tcp = TcpListenerTask::bind(addr, handler)
            .await
            .unwrap()
            .with_cancellation(shutdown.clone());
        tokio::spawn(udp.run());
        tokio::spawn(tcp.run());

        TestServer {
            addr,
            shutdown,
            cache,
        }
    }
}

/// A full resolver stack listening on loopback, resolving against a
/// scripted [`Internet`].
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    cache: Arc<ResponseCache>,
}

impl TestServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn shutdown(self) {
        self.shutdown.cancel();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Stub client speaking plain DNS to a [`TestServer`].
pub struct TestClient {
    server: SocketAddr,
    timeout: Duration,
}

impl TestClient {
    pub fn new(server: SocketAddr) -> Self {
        Self {
            server,
            timeout: Duration::from_secs(3),
        }
    }

    pub fn request(qname: &str, qtype: RecordType) -> Message {
        let mut message = Message::new();
        message
            .set_id(request_id(qname))
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true);
        message.add_query(Query::query(Name::from_str(qname).unwrap(), qtype));
        message
    }

    pub async fn query(&self, qname: &str, qtype: RecordType) -> std::io::Result<Message> {
        let request = Self::request(qname, qtype).to_vec().unwrap();
        let reply = self.send_raw(&request).await?;
        Message::from_vec(&reply).map_err(std::io::Error::other)
    }

    pub async fn send_raw(&self, request: &[u8]) -> std::io::Result<Vec<u8>> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        socket.send_to(request, self.server).await?;
        let mut buf = vec![0u8; 4096];
        let len = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no reply"))??;
        buf.truncate(len);
        Ok(buf)
    }

    pub async fn query_tcp(&self, qname: &str, qtype: RecordType) -> std::io::Result<Message> {
        let mut stream = TcpStream::connect(self.server).await?;
        let request = Self::request(qname, qtype).to_vec().unwrap();
        write_frame(&mut stream, &request).await?;
        let reply = tokio::time::timeout(self.timeout, read_frame(&mut stream))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no reply"))??
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed"))?;
        Message::from_vec(&reply).map_err(std::io::Error::other)
    }
}

/// Stable per-name id so a reply can be matched back in assertions.
fn request_id(qname: &str) -> u16 {
    qname.bytes().fold(0x1234u16, |acc, b| acc.rotate_left(3) ^ u16::from(b))
}
