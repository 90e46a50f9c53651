//! Dead, refusing and slow upstreams.

#[path = "../common/mod.rs"]
mod common;
use common::{Internet, TestClient, TestServerBuilder, Zone};
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;
use std::time::{Duration, Instant};

// ============================================================================
// Failover Tests
// ============================================================================

#[tokio::test]
async fn test_silent_root_skipped_for_next_root() {
    // Arrange
    let internet = Internet::example();
    internet.silent("199.9.14.201");
    let server = TestServerBuilder::new(internet.clone())
        .with_roots(&["199.9.14.201", "198.41.0.4"])
        .start()
        .await;
    let client = TestClient::new(server.addr());

    // Act
    let response = client.query("www.example.com.", RecordType::A).await.unwrap();

    // Assert
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(response.answers().len(), 1);
    assert!(internet.queries_to("198.41.0.4") >= 1);
}

#[tokio::test]
async fn test_refusing_nameserver_falls_through_to_next() {
    let internet = Internet::example();
    internet
        .host(
            "192.5.6.30",
            Zone::new("com.")
                .delegate("example.com.", "ns1.example.com.", "192.0.2.99")
                .delegate("example.com.", "ns2.example.com.", "192.0.2.1"),
        )
        .refusing("192.0.2.99");
    let server = TestServerBuilder::new(internet.clone()).start().await;
    let client = TestClient::new(server.addr());

    let response = client.query("www.example.com.", RecordType::A).await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(response.answers().len(), 1);
    assert_eq!(internet.queries_to("192.0.2.1"), 1);
}

#[tokio::test]
async fn test_all_upstreams_down_gives_servfail_within_deadline() {
    let internet = Internet::new();
    internet.silent("198.41.0.4");
    let server = TestServerBuilder::new(internet)
        .with_query_timeout(Duration::from_millis(800))
        .start()
        .await;
    let client = TestClient::new(server.addr());

    let started = Instant::now();
    let response = client.query("www.example.com.", RecordType::A).await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::ServFail);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_fallback_answers_when_roots_are_unreachable() {
    let internet = Internet::new();
    internet
        .silent("198.41.0.4")
        .host(
            "9.9.9.9",
            Zone::new(".").a("www.example.com.", "192.0.2.80", 120),
        );
    let server = TestServerBuilder::new(internet.clone())
        .with_fallback(&["9.9.9.9"])
        .start()
        .await;
    let client = TestClient::new(server.addr());

    let response = client.query("www.example.com.", RecordType::A).await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(response.answers().len(), 1);
    assert_eq!(internet.queries_to("9.9.9.9"), 1);
}
