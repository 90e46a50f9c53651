#![allow(dead_code)]
pub mod internet;
pub mod test_server;

pub use internet::{Internet, Zone};
pub use test_server::{TestClient, TestServer, TestServerBuilder};

use hickory_proto::rr::Name;
use std::str::FromStr;

pub fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}
