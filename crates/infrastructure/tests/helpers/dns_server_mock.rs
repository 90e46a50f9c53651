#![allow(dead_code)]
use hickory_proto::op::{Message, MessageType};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record, RecordType};
use rsdns_infrastructure::dns::transport::tcp::{read_frame, write_frame};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::oneshot;

/// DNS server on loopback answering every A question with one fixed
/// address. The truncating variant sends empty TC replies over UDP and
/// full answers over TCP on the same port.
pub struct MockDnsServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    pub async fn start(answer: Ipv4Addr) -> std::io::Result<Self> {
        Self::spawn(answer, false).await
    }

    pub async fn start_truncating(answer: Ipv4Addr) -> std::io::Result<Self> {
        let server = Self::spawn(answer, true).await?;
        let listener = TcpListener::bind(server.addr).await?;
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    while let Ok(Some(query)) = read_frame(&mut stream).await {
                        match Self::build_response(&query, answer, false) {
                            Some(response) => {
                                if write_frame(&mut stream, &response).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                });
            }
        });
        Ok(server)
    }

    async fn spawn(answer: Ipv4Addr, truncate: bool) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            if let Some(response) = Self::build_response(&buf[..len], answer, truncate) {
                                let _ = socket.send_to(&response, peer).await;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn build_response(query: &[u8], answer: Ipv4Addr, truncate: bool) -> Option<Vec<u8>> {
        let request = Message::from_vec(query).ok()?;
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .set_recursion_available(true)
            .set_truncated(truncate);
        response.add_queries(request.queries().iter().cloned());

        if !truncate {
            for question in request.queries() {
                if question.query_type() == RecordType::A {
                    response.add_answer(Record::from_rdata(
                        question.name().clone(),
                        300,
                        RData::A(A::from(answer)),
                    ));
                }
            }
        }
        response.to_vec().ok()
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
