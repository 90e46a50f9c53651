//! DNS wire helpers: outbound query construction and reply classification.
pub mod message_builder;
pub mod response_parser;

pub use message_builder::{MessageBuilder, OutboundQuery};
pub use response_parser::{address_of, Referral, ResponseKind, ResponseParser};
