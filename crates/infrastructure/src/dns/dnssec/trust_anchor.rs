use super::crypto::SignatureVerifier;
use super::types::{DnskeyRecord, DsRecord};
use base64::{engine::general_purpose::STANDARD, Engine};
use hickory_proto::rr::Name;
use rsdns_domain::DomainError;
use std::str::FromStr;

/// A configured point of trust: either the digest of a key or the key itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustAnchor {
    Ds { zone: Name, ds: DsRecord },
    Dnskey { zone: Name, dnskey: DnskeyRecord },
}

impl TrustAnchor {
    pub fn zone(&self) -> &Name {
        match self {
            TrustAnchor::Ds { zone, .. } | TrustAnchor::Dnskey { zone, .. } => zone,
        }
    }

    pub fn key_tag(&self) -> u16 {
        match self {
            TrustAnchor::Ds { ds, .. } => ds.key_tag,
            TrustAnchor::Dnskey { dnskey, .. } => dnskey.key_tag(),
        }
    }

    /// Whether `dnskey`, published at this anchor's zone, is the anchored key.
    pub fn matches(&self, dnskey: &DnskeyRecord, verifier: &SignatureVerifier) -> bool {
        match self {
            TrustAnchor::Ds { zone, ds } => verifier.verify_ds(ds, dnskey, zone).unwrap_or(false),
            TrustAnchor::Dnskey { dnskey: anchor, .. } => {
                anchor.algorithm == dnskey.algorithm && anchor.public_key == dnskey.public_key
            }
        }
    }
}

impl FromStr for TrustAnchor {
    type Err = DomainError;

    /// Presentation format, as found in root-anchors files and zone dumps:
    ///
    /// ```text
    /// . 172800 IN DS 20326 8 2 E06D44B8...
    /// example.com. IN DNSKEY 257 3 13 mdsswUyr...
    /// ```
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = |why: &str| DomainError::InvalidTrustAnchor(format!("{}: {}", why, line));

        let mut tokens = line.split_whitespace();
        let owner = tokens.next().ok_or_else(|| invalid("empty anchor"))?;
        let zone = Name::from_ascii(owner)
            .map(|mut n| {
                n.set_fqdn(true);
                n
            })
            .map_err(|_| invalid("bad owner name"))?;

        let mut tokens = tokens.skip_while(|t| {
            t.chars().all(|c| c.is_ascii_digit()) || t.eq_ignore_ascii_case("IN")
        });
        let rtype = tokens.next().ok_or_else(|| invalid("missing record type"))?;
        let fields: Vec<&str> = tokens.collect();

        match rtype.to_ascii_uppercase().as_str() {
            "DS" => {
                if fields.len() < 4 {
                    return Err(invalid("DS needs key tag, algorithm, digest type and digest"));
                }
                let key_tag: u16 = fields[0].parse().map_err(|_| invalid("bad key tag"))?;
                let algorithm: u8 = fields[1].parse().map_err(|_| invalid("bad algorithm"))?;
                let digest_type: u8 = fields[2].parse().map_err(|_| invalid("bad digest type"))?;
                let digest = decode_hex(&fields[3..].concat()).ok_or_else(|| invalid("bad digest"))?;

                let mut rdata = Vec::with_capacity(4 + digest.len());
                rdata.extend_from_slice(&key_tag.to_be_bytes());
                rdata.push(algorithm);
                rdata.push(digest_type);
                rdata.extend_from_slice(&digest);
                let ds = DsRecord::parse(&rdata).map_err(|e| invalid(&e.to_string()))?;

                Ok(TrustAnchor::Ds { zone, ds })
            }
            "DNSKEY" => {
                if fields.len() < 4 {
                    return Err(invalid("DNSKEY needs flags, protocol, algorithm and key"));
                }
                let flags: u16 = fields[0].parse().map_err(|_| invalid("bad flags"))?;
                let protocol: u8 = fields[1].parse().map_err(|_| invalid("bad protocol"))?;
                let algorithm: u8 = fields[2].parse().map_err(|_| invalid("bad algorithm"))?;
                let public_key = STANDARD
                    .decode(fields[3..].concat())
                    .map_err(|_| invalid("bad base64 key"))?;

                let mut rdata = Vec::with_capacity(4 + public_key.len());
                rdata.extend_from_slice(&flags.to_be_bytes());
                rdata.push(protocol);
                rdata.push(algorithm);
                rdata.extend_from_slice(&public_key);
                let dnskey = DnskeyRecord::parse(&rdata).map_err(|e| invalid(&e.to_string()))?;

                Ok(TrustAnchor::Dnskey { zone, dnskey })
            }
            other => Err(invalid(&format!("unsupported anchor type {}", other))),
        }
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    text.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

/// The set of configured trust anchors.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorStore {
    anchors: Vec<TrustAnchor>,
}

impl TrustAnchorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every line; blank lines and `;` comments are skipped.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, DomainError> {
        let mut store = Self::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            store.add(line.parse()?);
        }
        Ok(store)
    }

    pub fn add(&mut self, anchor: TrustAnchor) {
        self.anchors.push(anchor);
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn anchors(&self) -> &[TrustAnchor] {
        &self.anchors
    }

    /// The most specific anchored zone at or above `name`.
    pub fn closest_zone(&self, name: &Name) -> Option<&Name> {
        self.anchors
            .iter()
            .map(TrustAnchor::zone)
            .filter(|zone| zone.zone_of(name))
            .max_by_key(|zone| zone.num_labels())
    }

    /// Whether `dnskey` at `zone` is directly trusted by an anchor.
    pub fn trusts(&self, zone: &Name, dnskey: &DnskeyRecord, verifier: &SignatureVerifier) -> bool {
        self.anchors
            .iter()
            .filter(|anchor| anchor.zone() == zone)
            .any(|anchor| anchor.matches(dnskey, verifier))
    }
}
