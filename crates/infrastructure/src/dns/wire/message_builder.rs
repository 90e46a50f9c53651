//! Outbound query construction and message serialization.

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use rsdns_domain::DomainError;

/// A query ready for the wire, with the id needed to match the reply.
#[derive(Debug, Clone)]
pub struct OutboundQuery {
    pub id: u16,
    pub message: Message,
    pub bytes: Vec<u8>,
}

pub struct MessageBuilder;

impl MessageBuilder {
    /// Build a single-question query with a random id.
    ///
    /// Queries to authoritative servers go out with RD clear; fallback
    /// servers are recursive and get RD set. An `edns_payload` of zero
    /// sends no OPT record.
    pub fn build_query(
        name: &Name,
        record_type: RecordType,
        recursion_desired: bool,
        edns_payload: u16,
        dnssec_ok: bool,
    ) -> Result<OutboundQuery, DomainError> {
        let id = fastrand::u16(..);

        let mut message = Message::new();
        message
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(recursion_desired);
        message.add_query(Query::query(name.clone(), record_type));

        if edns_payload > 0 {
            let mut edns = Edns::new();
            edns.set_max_payload(edns_payload.max(512));
            edns.set_dnssec_ok(dnssec_ok);
            message.set_edns(edns);
        }

        let bytes = Self::serialize(&message)?;
        Ok(OutboundQuery { id, message, bytes })
    }

    /// Serialize a message to wire format bytes
    pub fn serialize(message: &Message) -> Result<Vec<u8>, DomainError> {
        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);

        message.emit(&mut encoder).map_err(|e| {
            DomainError::InvalidDnsResponse(format!("Failed to serialize DNS message: {}", e))
        })?;

        Ok(buf)
    }

    pub fn parse(bytes: &[u8]) -> Result<Message, DomainError> {
        Message::from_vec(bytes).map_err(|e| {
            DomainError::InvalidDnsResponse(format!("Failed to parse DNS message: {}", e))
        })
    }
}
