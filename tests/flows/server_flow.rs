//! Listener behavior seen from a stub client.

#[path = "../common/mod.rs"]
mod common;
use common::{Internet, TestClient, TestServerBuilder};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RecordType;
use std::time::Duration;

// ============================================================================
// Transport Tests
// ============================================================================

#[tokio::test]
async fn test_tcp_and_udp_share_one_address() {
    // Arrange
    let server = TestServerBuilder::new(Internet::example()).start().await;
    let client = TestClient::new(server.addr());

    // Act
    let over_tcp = client.query_tcp("www.example.com.", RecordType::A).await.unwrap();
    let over_udp = client.query("www.example.com.", RecordType::A).await.unwrap();

    // Assert
    assert_eq!(over_tcp.response_code(), ResponseCode::NoError);
    assert_eq!(over_tcp.answers().len(), 1);
    assert_eq!(over_tcp.answers()[0].data(), over_udp.answers()[0].data());
}

#[tokio::test]
async fn test_concurrent_clients_all_answered() {
    let server = TestServerBuilder::new(Internet::example()).start().await;
    let addr = server.addr();

    let queries = (0..8).map(|i| {
        let qname = if i % 2 == 0 { "www.example.com." } else { "example.com." };
        tokio::spawn(async move { TestClient::new(addr).query(qname, RecordType::A).await })
    });
    let responses = join_all(queries.collect()).await;

    assert_eq!(responses.len(), 8);
    assert!(responses.iter().all(|r| r.response_code() == ResponseCode::NoError));
}

async fn join_all(
    handles: Vec<tokio::task::JoinHandle<std::io::Result<Message>>>,
) -> Vec<Message> {
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push(handle.await.unwrap().unwrap());
    }
    out
}

// ============================================================================
// Malformed requests and shutdown
// ============================================================================

#[tokio::test]
async fn test_header_without_question_gets_formerr() {
    let server = TestServerBuilder::new(Internet::example()).start().await;
    let client = TestClient::new(server.addr());
    // id 0xBEEF, RD, QDCOUNT 1, but the question is missing
    let request = [0xBE, 0xEF, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];

    let reply = client.send_raw(&request).await.unwrap();
    let response = Message::from_vec(&reply).unwrap();

    assert_eq!(response.id(), 0xBEEF);
    assert_eq!(response.response_code(), ResponseCode::FormErr);
}

#[tokio::test]
async fn test_no_answers_after_shutdown() {
    let server = TestServerBuilder::new(Internet::example()).start().await;
    let addr = server.addr();
    let client = TestClient::new(addr);
    client.query("www.example.com.", RecordType::A).await.unwrap();

    server.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.query("www.example.com.", RecordType::A),
    )
    .await
    .unwrap();
    assert!(result.is_err());
}
