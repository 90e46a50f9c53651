//! Query in, iterate from the root, answer out, then serve from cache.

#[path = "../common/mod.rs"]
mod common;
use common::{name, Internet, TestClient, TestServerBuilder};
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{RData, RecordType};
use std::net::Ipv4Addr;

fn a_records(message: &hickory_proto::op::Message) -> Vec<Ipv4Addr> {
    message
        .answers()
        .iter()
        .filter_map(|r| match r.data() {
            Some(RData::A(a)) => Some(a.0),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Full Resolution Flow Tests
// ============================================================================

#[tokio::test]
async fn test_complete_resolution_flow() {
    // Arrange
    let internet = Internet::example();
    let server = TestServerBuilder::new(internet.clone()).start().await;
    let client = TestClient::new(server.addr());

    // Act
    let response = client.query("www.example.com.", RecordType::A).await.unwrap();

    // Assert
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(response.id(), TestClient::request("www.example.com.", RecordType::A).id());
    assert!(response.recursion_available());
    assert_eq!(response.queries()[0].name(), &name("www.example.com."));
    assert_eq!(a_records(&response), vec![Ipv4Addr::new(192, 0, 2, 80)]);
    // root, com., example.com.
    assert_eq!(internet.query_count(), 3);

    server.shutdown();
}

#[tokio::test]
async fn test_second_query_served_from_cache() {
    let internet = Internet::example();
    let server = TestServerBuilder::new(internet.clone()).start().await;
    let client = TestClient::new(server.addr());

    let first = client.query("www.example.com.", RecordType::A).await.unwrap();
    let second = client.query("www.example.com.", RecordType::A).await.unwrap();

    assert_eq!(a_records(&first), a_records(&second));
    assert_eq!(internet.query_count(), 3);
    let ttl = second.answers()[0].ttl();
    assert!(ttl <= 300 && ttl >= 298, "ttl counts down from 300, got {}", ttl);
}

#[tokio::test]
async fn test_sibling_name_walks_delegation_from_root() {
    // Only final answers are cached, so a sibling repeats the referrals
    let internet = Internet::example();
    let server = TestServerBuilder::new(internet.clone()).start().await;
    let client = TestClient::new(server.addr());

    client.query("www.example.com.", RecordType::A).await.unwrap();
    let apex = client.query("example.com.", RecordType::A).await.unwrap();

    assert_eq!(a_records(&apex), vec![Ipv4Addr::new(192, 0, 2, 10)]);
    assert_eq!(internet.query_count(), 6);
    assert_eq!(internet.queries_to("198.41.0.4"), 2);
    assert_eq!(server.cached_entries(), 2);
}

#[tokio::test]
async fn test_cname_into_another_zone() {
    let internet = Internet::example();
    let server = TestServerBuilder::new(internet.clone()).start().await;
    let client = TestClient::new(server.addr());

    let response = client.query("cdn.example.com.", RecordType::A).await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(response.answers()[0].record_type(), RecordType::CNAME);
    assert_eq!(a_records(&response), vec![Ipv4Addr::new(198, 51, 100, 20)]);
    assert!(internet.queries_to("198.51.100.1") >= 1);
}

// ============================================================================
// Negative Answers
// ============================================================================

#[tokio::test]
async fn test_nxdomain_with_soa_and_cached() {
    let internet = Internet::example();
    let server = TestServerBuilder::new(internet.clone()).start().await;
    let client = TestClient::new(server.addr());

    let first = client.query("missing.example.com.", RecordType::A).await.unwrap();
    let count = internet.query_count();
    let second = client.query("missing.example.com.", RecordType::A).await.unwrap();

    assert_eq!(first.response_code(), ResponseCode::NXDomain);
    assert!(first.answers().is_empty());
    assert_eq!(first.name_servers()[0].record_type(), RecordType::SOA);
    assert_eq!(second.response_code(), ResponseCode::NXDomain);
    assert_eq!(internet.query_count(), count);
}

#[tokio::test]
async fn test_nodata_is_noerror_without_answers() {
    let internet = Internet::example();
    let server = TestServerBuilder::new(internet).start().await;
    let client = TestClient::new(server.addr());

    let response = client.query("www.example.com.", RecordType::AAAA).await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert!(response.answers().is_empty());
}
