use crate::dns::cache::{from_wire_type, CachedAnswer};
use crate::dns::wire::MessageBuilder;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record, RecordType as WireType};
use rsdns_application::ports::DnssecStatus;
use rsdns_application::use_cases::{HandleQueryUseCase, QueryOutcome};
use rsdns_domain::config::{BlockResponse, BlockingConfig};
use rsdns_domain::{DnsQuery, DomainError, RecordClass};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest UDP response for a client that sent no OPT record.
pub const CLASSIC_UDP_PAYLOAD: usize = 512;

const HEADER_LEN: usize = 12;

/// Transport a query arrived on. Only UDP responses are size-limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
    Tls,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Udp => "UDP",
            Protocol::Tcp => "TCP",
            Protocol::Tls => "TLS",
        })
    }
}

/// What a blocked name is answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockResponseMode {
    Nxdomain,
    /// `0.0.0.0` for A, `::` for AAAA, empty NOERROR for anything else
    Sinkhole { ttl: u32 },
}

impl BlockResponseMode {
    pub fn from_config(config: &BlockingConfig) -> Self {
        match config.response {
            BlockResponse::Nxdomain => BlockResponseMode::Nxdomain,
            BlockResponse::Sinkhole => BlockResponseMode::Sinkhole {
                ttl: config.block_ttl,
            },
        }
    }
}

/// Turns raw inbound DNS messages into raw responses.
///
/// Transport agnostic: listeners hand over the bytes they read and write back
/// whatever comes out. `None` means the input was too short to even echo an id
/// and the datagram is dropped.
#[derive(Clone)]
pub struct QueryHandler {
    use_case: Arc<HandleQueryUseCase<CachedAnswer>>,
    block_response: BlockResponseMode,
    edns_payload: u16,
}

impl QueryHandler {
    pub fn new(use_case: Arc<HandleQueryUseCase<CachedAnswer>>) -> Self {
        Self {
            use_case,
            block_response: BlockResponseMode::Nxdomain,
            edns_payload: 1232,
        }
    }

    pub fn with_block_response(mut self, mode: BlockResponseMode) -> Self {
        self.block_response = mode;
        self
    }

    /// Payload size advertised in the OPT record of our responses.
    pub fn with_edns_payload(mut self, payload: u16) -> Self {
        self.edns_payload = payload.max(CLASSIC_UDP_PAYLOAD as u16);
        self
    }

    pub async fn handle(&self, request: &[u8], client: IpAddr, protocol: Protocol) -> Option<Vec<u8>> {
        let request_message = match MessageBuilder::parse(request) {
            Ok(message) => message,
            Err(e) => {
                debug!(client = %client, protocol = %protocol, error = %e, "Malformed query");
                return format_error_for_raw(request);
            }
        };

        let response = self.respond(&request_message, client).await;
        let limit = match protocol {
            Protocol::Udp => udp_payload_limit(&request_message),
            Protocol::Tcp | Protocol::Tls => usize::from(u16::MAX),
        };

        encode_within(response, limit)
    }

    async fn respond(&self, request: &Message, client: IpAddr) -> Message {
        if request.message_type() != MessageType::Query {
            return self.error_response(request, ResponseCode::FormErr);
        }
        if request.op_code() != OpCode::Query {
            return self.error_response(request, ResponseCode::NotImp);
        }
        let question = match request.queries() {
            [question] => question.clone(),
            _ => return self.error_response(request, ResponseCode::FormErr),
        };

        let dnssec_ok = request.extensions().as_ref().is_some_and(|edns| edns.dnssec_ok());
        let query = DnsQuery::new(question.name().to_ascii(), from_wire_type(question.query_type()))
            .with_class(RecordClass::from_u16(u16::from(question.query_class())))
            .with_dnssec_ok(dnssec_ok);

        match self.use_case.execute(client, &query).await {
            QueryOutcome::Refused => self.error_response(request, ResponseCode::Refused),
            QueryOutcome::Blocked => self.blocked_response(request, &question),
            QueryOutcome::Resolved(resolution) => {
                let mut response = self.response_header(request);
                let answer = &resolution.answer;
                response.set_response_code(answer.response_code());
                response.set_authentic_data(resolution.dnssec_status == DnssecStatus::Secure);

                let keep = |record: &Record| {
                    dnssec_ok
                        || record.record_type() == question.query_type()
                        || !from_wire_type(record.record_type()).is_dnssec()
                };
                response.insert_answers(answer.message.answers().iter().filter(|r| keep(*r)).cloned().collect());
                response.insert_name_servers(
                    answer.message.name_servers().iter().filter(|r| keep(*r)).cloned().collect(),
                );
                response.insert_additionals(
                    answer.message.additionals().iter().filter(|r| keep(*r)).cloned().collect(),
                );
                response
            }
            QueryOutcome::Failed(DomainError::InvalidDomainName(_)) => {
                self.error_response(request, ResponseCode::FormErr)
            }
            QueryOutcome::Failed(_) => self.error_response(request, ResponseCode::ServFail),
        }
    }

    fn blocked_response(&self, request: &Message, question: &Query) -> Message {
        let mut response = self.response_header(request);
        match self.block_response {
            BlockResponseMode::Nxdomain => {
                response.set_response_code(ResponseCode::NXDomain);
            }
            BlockResponseMode::Sinkhole { ttl } => {
                let rdata = match question.query_type() {
                    WireType::A => Some(RData::A(A::from(Ipv4Addr::UNSPECIFIED))),
                    WireType::AAAA => Some(RData::AAAA(AAAA::from(Ipv6Addr::UNSPECIFIED))),
                    _ => None,
                };
                if let Some(rdata) = rdata {
                    response.add_answer(Record::from_rdata(question.name().clone(), ttl, rdata));
                }
            }
        }
        response
    }

    fn error_response(&self, request: &Message, code: ResponseCode) -> Message {
        let mut response = self.response_header(request);
        response.set_response_code(code);
        response
    }

    /// Id, opcode, question, RD and EDNS echoed from the request.
    fn response_header(&self, request: &Message) -> Message {
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .set_recursion_available(true);
        response.add_queries(request.queries().iter().cloned());

        if let Some(request_edns) = request.extensions() {
            let mut edns = Edns::new();
            edns.set_max_payload(self.edns_payload);
            edns.set_dnssec_ok(request_edns.dnssec_ok());
            response.set_edns(edns);
        }
        response
    }
}

/// Client's advertised UDP payload, never below 512.
fn udp_payload_limit(request: &Message) -> usize {
    request
        .extensions()
        .as_ref()
        .map(|edns| usize::from(edns.max_payload()))
        .unwrap_or(CLASSIC_UDP_PAYLOAD)
        .max(CLASSIC_UDP_PAYLOAD)
}

/// Serialize `response`; past `limit` bytes the record sections are dropped
/// and TC is set so the client retries over TCP.
fn encode_within(mut response: Message, limit: usize) -> Option<Vec<u8>> {
    let bytes = match MessageBuilder::serialize(&response) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(id = response.id(), error = %e, "Response encoding failed");
            response.take_answers();
            response.take_name_servers();
            response.take_additionals();
            response.set_response_code(ResponseCode::ServFail);
            return MessageBuilder::serialize(&response).ok();
        }
    };

    if bytes.len() <= limit {
        return Some(bytes);
    }

    debug!(id = response.id(), size = bytes.len(), limit, "Response truncated");
    response.take_answers();
    response.take_name_servers();
    response.take_additionals();
    response.set_truncated(true);
    MessageBuilder::serialize(&response).ok()
}

/// FORMERR for input that did not parse, as long as the header is there to
/// take the id and opcode from.
fn format_error_for_raw(request: &[u8]) -> Option<Vec<u8>> {
    if request.len() < HEADER_LEN {
        return None;
    }

    let id = u16::from_be_bytes([request[0], request[1]]);
    let op_code = OpCode::from_u8((request[2] >> 3) & 0x0F).unwrap_or(OpCode::Query);
    let mut response = Message::new();
    response
        .set_id(id)
        .set_message_type(MessageType::Response)
        .set_op_code(op_code)
        .set_response_code(ResponseCode::FormErr);
    MessageBuilder::serialize(&response).ok()
}
