#![allow(dead_code)]
use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, Query};
use hickory_proto::rr::{Name, RecordType};
use rsdns_domain::DomainError;
use rsdns_infrastructure::dns::registry::AuthServer;
use rsdns_infrastructure::dns::transport::UpstreamExchanger;
use rsdns_infrastructure::dns::wire::MessageBuilder;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted server does with one question.
#[derive(Clone)]
pub enum Behavior {
    /// Reply with this body; header and question are copied from the query.
    Reply(Message),
    /// Never answer: the exchange waits out its timeout.
    Silent,
    /// Answer with a mismatched id.
    Spoof(Message),
}

type Responder = Arc<dyn Fn(&Name, RecordType) -> Behavior + Send + Sync>;

/// In-memory upstream network keyed by server address.
///
/// Unknown servers behave as [`Behavior::Silent`].
#[derive(Clone, Default)]
pub struct FakeNetwork {
    servers: Arc<Mutex<HashMap<IpAddr, Responder>>>,
    queries: Arc<AtomicU64>,
    log: Arc<Mutex<Vec<(IpAddr, Name, RecordType, bool)>>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve<F>(&self, addr: &str, responder: F) -> &Self
    where
        F: Fn(&Name, RecordType) -> Behavior + Send + Sync + 'static,
    {
        self.servers
            .lock()
            .unwrap()
            .insert(addr.parse().unwrap(), Arc::new(responder));
        self
    }

    /// Server that gives the same reply to every question.
    pub fn serve_fixed(&self, addr: &str, reply: Message) -> &Self {
        self.serve(addr, move |_, _| Behavior::Reply(reply.clone()))
    }

    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn queries_to(&self, addr: &str) -> usize {
        let addr: IpAddr = addr.parse().unwrap();
        self.log.lock().unwrap().iter().filter(|q| q.0 == addr).count()
    }

    /// (server, name, type, RD) of every exchange, in order.
    pub fn log(&self) -> Vec<(IpAddr, Name, RecordType, bool)> {
        self.log.lock().unwrap().clone()
    }

    fn respond(request: &Message, body: Message) -> Message {
        let mut reply = body;
        reply
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired());
        let _ = reply.take_queries();
        reply.add_queries(request.queries().iter().cloned());
        reply
    }
}

#[async_trait]
impl UpstreamExchanger for FakeNetwork {
    async fn exchange(
        &self,
        server: &AuthServer,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let request = MessageBuilder::parse(query)?;
        let question: Query = request.queries()[0].clone();
        self.log.lock().unwrap().push((
            server.addr.ip(),
            question.name().clone(),
            question.query_type(),
            request.recursion_desired(),
        ));

        let responder = self.servers.lock().unwrap().get(&server.addr.ip()).cloned();
        let behavior = match responder {
            Some(responder) => responder(question.name(), question.query_type()),
            None => Behavior::Silent,
        };

        match behavior {
            Behavior::Reply(body) => MessageBuilder::serialize(&Self::respond(&request, body)),
            Behavior::Spoof(body) => {
                let mut reply = Self::respond(&request, body);
                reply.set_id(request.id().wrapping_add(1));
                MessageBuilder::serialize(&reply)
            }
            Behavior::Silent => {
                tokio::time::sleep(timeout).await;
                Err(DomainError::Transport(format!(
                    "Timeout waiting for response from {}",
                    server.addr
                )))
            }
        }
    }
}
