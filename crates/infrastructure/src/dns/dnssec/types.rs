use hickory_proto::rr::{Name, RData, Record};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder, EncodeMode};
use rsdns_domain::{DomainError, RecordType};
use std::fmt;

/// Raw RDATA of a record, names in canonical (lowercase, uncompressed) form.
///
/// DNSSEC types are carried by hickory as opaque RDATA, so the parsers
/// below work on these bytes.
pub fn canonical_rdata(rdata: &RData) -> Result<Vec<u8>, DomainError> {
    let mut buf = Vec::with_capacity(64);
    {
        let mut encoder = BinEncoder::with_mode(&mut buf, EncodeMode::Signing);
        encoder.set_canonical_names(true);
        rdata
            .emit(&mut encoder)
            .map_err(|e| DomainError::InvalidDnsResponse(format!("RDATA encode: {}", e)))?;
    }
    Ok(buf)
}

/// Canonical wire form of a name: lowercase labels, no compression.
pub fn canonical_name(name: &Name) -> Result<Vec<u8>, DomainError> {
    let mut buf = Vec::with_capacity(name.len() + 2);
    {
        let mut encoder = BinEncoder::with_mode(&mut buf, EncodeMode::Signing);
        name.to_lowercase()
            .emit_as_canonical(&mut encoder, true)
            .map_err(|e| DomainError::InvalidDnsResponse(format!("name encode: {}", e)))?;
    }
    Ok(buf)
}

fn record_bytes(record: &Record) -> Result<Vec<u8>, DomainError> {
    match record.data() {
        Some(rdata) => canonical_rdata(rdata),
        None => Err(DomainError::InvalidDnsResponse(format!(
            "{} record without RDATA",
            record.record_type()
        ))),
    }
}

fn algorithm_name(algorithm: u8) -> &'static str {
    match algorithm {
        5 => "RSA/SHA-1",
        7 => "RSA/SHA-1-NSEC3",
        8 => "RSA/SHA-256",
        10 => "RSA/SHA-512",
        13 => "ECDSA P-256/SHA-256",
        14 => "ECDSA P-384/SHA-384",
        15 => "Ed25519",
        _ => "Unknown",
    }
}

/// DNSKEY record: the public key used to verify RRSIG signatures.
///
/// ```text
/// | flags (16) | protocol (8) = 3 | algorithm (8) | public key ... |
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnskeyRecord {
    /// 256 for a zone signing key, 257 with the SEP bit for a key signing key.
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
}

impl DnskeyRecord {
    pub fn parse(data: &[u8]) -> Result<Self, DomainError> {
        if data.len() < 4 {
            return Err(DomainError::InvalidDnsResponse(
                "DNSKEY record too short".into(),
            ));
        }

        let flags = u16::from_be_bytes([data[0], data[1]]);
        let protocol = data[2];
        let algorithm = data[3];

        if protocol != 3 {
            return Err(DomainError::InvalidDnsResponse(format!(
                "Invalid DNSKEY protocol: {} (expected 3)",
                protocol
            )));
        }

        Ok(Self {
            flags,
            protocol,
            algorithm,
            public_key: data[4..].to_vec(),
        })
    }

    pub fn from_record(record: &Record) -> Result<Self, DomainError> {
        Self::parse(&record_bytes(record)?)
    }

    /// Only keys with the Zone Key bit may verify zone data.
    pub fn is_zone_key(&self) -> bool {
        self.flags & 0x0100 != 0
    }

    pub fn is_revoked(&self) -> bool {
        self.flags & 0x0080 != 0
    }

    pub fn is_ksk(&self) -> bool {
        self.flags & 0x0001 != 0
    }

    /// RDATA in wire form, as hashed into a DS digest.
    pub fn rdata(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(4 + self.public_key.len());
        wire.extend_from_slice(&self.flags.to_be_bytes());
        wire.push(self.protocol);
        wire.push(self.algorithm);
        wire.extend_from_slice(&self.public_key);
        wire
    }

    /// Key tag (RFC 4034 Appendix B).
    pub fn key_tag(&self) -> u16 {
        let wire = self.rdata();
        let mut accumulator: u32 = 0;

        for chunk in wire.chunks(2) {
            if chunk.len() == 2 {
                accumulator += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
            } else {
                accumulator += u32::from(chunk[0]) << 8;
            }
        }

        accumulator += accumulator >> 16;
        (accumulator & 0xFFFF) as u16
    }

    pub fn algorithm_name(&self) -> &'static str {
        algorithm_name(self.algorithm)
    }
}

impl fmt::Display for DnskeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DNSKEY(flags={}, algo={}, tag={}, {})",
            self.flags,
            self.algorithm_name(),
            self.key_tag(),
            if self.is_ksk() { "KSK" } else { "ZSK" }
        )
    }
}

/// DS record: digest of a child zone DNSKEY, published in the parent.
///
/// ```text
/// | key tag (16) | algorithm (8) | digest type (8) | digest ... |
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsRecord {
    pub key_tag: u16,
    pub algorithm: u8,
    /// 1 SHA-1, 2 SHA-256, 4 SHA-384
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

impl DsRecord {
    pub fn parse(data: &[u8]) -> Result<Self, DomainError> {
        if data.len() < 4 {
            return Err(DomainError::InvalidDnsResponse("DS record too short".into()));
        }

        let digest_type = data[3];
        let digest = data[4..].to_vec();

        let expected_len = match digest_type {
            1 => 20,
            2 => 32,
            4 => 48,
            _ => 0,
        };
        if expected_len > 0 && digest.len() != expected_len {
            return Err(DomainError::InvalidDnsResponse(format!(
                "Invalid DS digest length: {} (expected {})",
                digest.len(),
                expected_len
            )));
        }

        Ok(Self {
            key_tag: u16::from_be_bytes([data[0], data[1]]),
            algorithm: data[2],
            digest_type,
            digest,
        })
    }

    pub fn from_record(record: &Record) -> Result<Self, DomainError> {
        Self::parse(&record_bytes(record)?)
    }

    pub fn digest_type_name(&self) -> &'static str {
        match self.digest_type {
            1 => "SHA-1",
            2 => "SHA-256",
            4 => "SHA-384",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for DsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DS(tag={}, algo={}, digest={})",
            self.key_tag,
            algorithm_name(self.algorithm),
            self.digest_type_name()
        )
    }
}

/// RRSIG record: signature over one RRset.
///
/// ```text
/// | type covered (16) | algorithm (8) | labels (8) | original TTL (32) |
/// | expiration (32) | inception (32) | key tag (16) | signer name | signature |
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RrsigRecord {
    pub type_covered: RecordType,
    pub algorithm: u8,
    /// Label count of the owner name, excluding a leading wildcard.
    pub labels: u8,
    pub original_ttl: u32,
    pub signature_expiration: u32,
    pub signature_inception: u32,
    pub key_tag: u16,
    pub signer_name: Name,
    pub signature: Vec<u8>,
}

const RRSIG_FIXED_LEN: usize = 18;

impl RrsigRecord {
    pub fn parse(data: &[u8]) -> Result<Self, DomainError> {
        if data.len() < RRSIG_FIXED_LEN {
            return Err(DomainError::InvalidDnsResponse(
                "RRSIG record too short".into(),
            ));
        }

        let mut decoder = BinDecoder::new(&data[RRSIG_FIXED_LEN..]);
        let signer_name = Name::read(&mut decoder)
            .map_err(|e| DomainError::InvalidDnsResponse(format!("RRSIG signer name: {}", e)))?;
        let signature_start = RRSIG_FIXED_LEN + decoder.index();
        if signature_start >= data.len() {
            return Err(DomainError::InvalidDnsResponse(
                "RRSIG missing signature".into(),
            ));
        }

        Ok(Self {
            type_covered: RecordType::from_u16(u16::from_be_bytes([data[0], data[1]])),
            algorithm: data[2],
            labels: data[3],
            original_ttl: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            signature_expiration: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            signature_inception: u32::from_be_bytes([data[12], data[13], data[14], data[15]]),
            key_tag: u16::from_be_bytes([data[16], data[17]]),
            signer_name,
            signature: data[signature_start..].to_vec(),
        })
    }

    pub fn from_record(record: &Record) -> Result<Self, DomainError> {
        Self::parse(&record_bytes(record)?)
    }

    /// RRSIG RDATA minus the signature, the prefix of the signed data.
    pub fn signed_prefix(&self) -> Result<Vec<u8>, DomainError> {
        let mut data = Vec::with_capacity(RRSIG_FIXED_LEN + 32);
        data.extend_from_slice(&self.type_covered.to_u16().to_be_bytes());
        data.push(self.algorithm);
        data.push(self.labels);
        data.extend_from_slice(&self.original_ttl.to_be_bytes());
        data.extend_from_slice(&self.signature_expiration.to_be_bytes());
        data.extend_from_slice(&self.signature_inception.to_be_bytes());
        data.extend_from_slice(&self.key_tag.to_be_bytes());
        data.extend_from_slice(&canonical_name(&self.signer_name)?);
        Ok(data)
    }

    /// Validity window check in serial number arithmetic (RFC 1982).
    pub fn is_valid_at(&self, now: u32) -> bool {
        (now.wrapping_sub(self.signature_inception) as i32) >= 0
            && (self.signature_expiration.wrapping_sub(now) as i32) >= 0
    }

    pub fn algorithm_name(&self) -> &'static str {
        algorithm_name(self.algorithm)
    }
}

impl fmt::Display for RrsigRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RRSIG({}, algo={}, tag={}, signer={})",
            self.type_covered,
            self.algorithm_name(),
            self.key_tag,
            self.signer_name
        )
    }
}
