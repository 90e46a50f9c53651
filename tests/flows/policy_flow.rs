//! Access control and blocking in front of resolution.

#[path = "../common/mod.rs"]
mod common;
use common::{Internet, TestClient, TestServerBuilder};
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{RData, RecordType};
use std::net::{Ipv4Addr, Ipv6Addr};

// ============================================================================
// Blocking
// ============================================================================

#[tokio::test]
async fn test_blocked_name_answered_without_upstream() {
    // Arrange
    let internet = Internet::example();
    let server = TestServerBuilder::new(internet.clone())
        .with_blocked(&["||ads.example.com^"])
        .start()
        .await;
    let client = TestClient::new(server.addr());

    // Act
    let apex = client.query("ads.example.com.", RecordType::A).await.unwrap();
    let sub = client.query("pixel.ads.example.com.", RecordType::A).await.unwrap();

    // Assert
    assert_eq!(apex.response_code(), ResponseCode::NXDomain);
    assert_eq!(sub.response_code(), ResponseCode::NXDomain);
    assert_eq!(internet.query_count(), 0);
}

#[tokio::test]
async fn test_whitelist_lets_name_through() {
    let internet = Internet::example();
    let server = TestServerBuilder::new(internet.clone())
        .with_blocked(&["||example.com^"])
        .with_whitelist(&["www.example.com"])
        .start()
        .await;
    let client = TestClient::new(server.addr());

    let allowed = client.query("www.example.com.", RecordType::A).await.unwrap();
    let blocked = client.query("example.com.", RecordType::A).await.unwrap();

    assert_eq!(allowed.response_code(), ResponseCode::NoError);
    assert_eq!(allowed.answers().len(), 1);
    assert_eq!(blocked.response_code(), ResponseCode::NXDomain);
}

#[tokio::test]
async fn test_sinkhole_answers_unspecified_addresses() {
    let server = TestServerBuilder::new(Internet::example())
        .with_blocked(&["tracker.example.com"])
        .with_sinkhole(60)
        .start()
        .await;
    let client = TestClient::new(server.addr());

    let v4 = client.query("tracker.example.com.", RecordType::A).await.unwrap();
    let v6 = client.query("tracker.example.com.", RecordType::AAAA).await.unwrap();

    assert_eq!(v4.response_code(), ResponseCode::NoError);
    assert!(matches!(v4.answers()[0].data(), Some(RData::A(a)) if a.0 == Ipv4Addr::UNSPECIFIED));
    assert_eq!(v4.answers()[0].ttl(), 60);
    assert!(matches!(v6.answers()[0].data(), Some(RData::AAAA(a)) if a.0 == Ipv6Addr::UNSPECIFIED));
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
async fn test_client_outside_allow_list_is_refused() {
    let internet = Internet::example();
    let server = TestServerBuilder::new(internet.clone())
        .with_allow(&["10.0.0.0/8"])
        .start()
        .await;
    let client = TestClient::new(server.addr());

    let response = client.query("www.example.com.", RecordType::A).await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::Refused);
    assert!(response.answers().is_empty());
    assert_eq!(internet.query_count(), 0);
}
