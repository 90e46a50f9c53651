use hickory_proto::rr::{DNSClass, Name, RecordType as WireType};
use rsdns_domain::{QueryKey, RecordClass, RecordType};

/// Cache key for a question as it appears on the wire.
pub fn wire_key(name: &Name, record_type: WireType, class: DNSClass) -> QueryKey {
    QueryKey::new(
        &name.to_ascii(),
        from_wire_type(record_type),
        RecordClass::from_u16(u16::from(class)),
    )
}

pub fn from_wire_type(record_type: WireType) -> RecordType {
    RecordType::from_u16(u16::from(record_type))
}

pub fn to_wire_type(record_type: RecordType) -> WireType {
    WireType::from(record_type.to_u16())
}
