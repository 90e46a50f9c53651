use super::types::{canonical_name, canonical_rdata, DnskeyRecord, DsRecord, RrsigRecord};
use hickory_proto::rr::{Name, Record};
use rsdns_domain::DomainError;
use ring::signature;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384};

/// Signature algorithms this validator can check. A zone signed only with
/// other algorithms is treated as unsigned (RFC 4035 5.2).
pub fn is_supported_algorithm(algorithm: u8) -> bool {
    matches!(algorithm, 8 | 10 | 13 | 14 | 15)
}

pub fn is_supported_digest(digest_type: u8) -> bool {
    matches!(digest_type, 1 | 2 | 4)
}

/// Verifies RRSIG signatures and DS digests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Check one RRSIG over `records` (all sharing `owner`, type and class)
    /// with one DNSKEY. `now` is seconds since the Unix epoch, truncated.
    ///
    /// `Ok(false)` means the key does not match or the signature is wrong.
    /// `Err` means the algorithm or key encoding cannot be handled.
    pub fn verify_rrset(
        &self,
        rrsig: &RrsigRecord,
        dnskey: &DnskeyRecord,
        owner: &Name,
        records: &[&Record],
        now: u32,
    ) -> Result<bool, DomainError> {
        if !rrsig.is_valid_at(now) {
            return Ok(false);
        }
        if dnskey.algorithm != rrsig.algorithm
            || dnskey.key_tag() != rrsig.key_tag
            || !dnskey.is_zone_key()
            || dnskey.is_revoked()
        {
            return Ok(false);
        }

        let data = self.signed_data(rrsig, owner, records)?;
        self.verify_signature(rrsig.algorithm, &dnskey.public_key, &data, &rrsig.signature)
    }

    /// Signed data per RFC 4034 3.1.8.1: the RRSIG RDATA without the
    /// signature, then every RR in canonical form and order.
    pub fn signed_data(
        &self,
        rrsig: &RrsigRecord,
        owner: &Name,
        records: &[&Record],
    ) -> Result<Vec<u8>, DomainError> {
        let owner_wire = canonical_name(&Self::signed_owner(rrsig, owner)?)?;

        let mut rdatas = Vec::with_capacity(records.len());
        for record in records {
            if let Some(rdata) = record.data() {
                rdatas.push(canonical_rdata(rdata)?);
            }
        }
        rdatas.sort();
        rdatas.dedup();

        let class = records
            .first()
            .map(|r| u16::from(r.dns_class()))
            .unwrap_or(1);

        let mut data = rrsig.signed_prefix()?;
        for rdata in rdatas {
            data.extend_from_slice(&owner_wire);
            data.extend_from_slice(&rrsig.type_covered.to_u16().to_be_bytes());
            data.extend_from_slice(&class.to_be_bytes());
            data.extend_from_slice(&rrsig.original_ttl.to_be_bytes());
            let len = u16::try_from(rdata.len()).map_err(|_| {
                DomainError::InvalidDnsResponse("RDATA longer than 65535 bytes".into())
            })?;
            data.extend_from_slice(&len.to_be_bytes());
            data.extend_from_slice(&rdata);
        }
        Ok(data)
    }

    /// Owner as signed: a wildcard expansion is folded back to `*.<closest>`.
    fn signed_owner(rrsig: &RrsigRecord, owner: &Name) -> Result<Name, DomainError> {
        let labels = usize::from(rrsig.labels);
        let owner_labels = usize::from(owner.num_labels());
        if labels >= owner_labels {
            return Ok(owner.clone());
        }
        Name::from_ascii("*")
            .and_then(|wildcard| wildcard.append_name(&owner.trim_to(labels)))
            .map_err(|e| DomainError::InvalidDnsResponse(format!("wildcard owner: {}", e)))
    }

    /// Whether `ds` is a digest of `dnskey` at `owner`.
    pub fn verify_ds(
        &self,
        ds: &DsRecord,
        dnskey: &DnskeyRecord,
        owner: &Name,
    ) -> Result<bool, DomainError> {
        if dnskey.key_tag() != ds.key_tag || dnskey.algorithm != ds.algorithm {
            return Ok(false);
        }

        let mut data = canonical_name(owner)?;
        data.extend_from_slice(&dnskey.rdata());

        let computed = match ds.digest_type {
            1 => Sha1::digest(&data).to_vec(),
            2 => Sha256::digest(&data).to_vec(),
            4 => Sha384::digest(&data).to_vec(),
            other => {
                return Err(DomainError::InvalidDnsResponse(format!(
                    "Unsupported DS digest type: {}",
                    other
                )))
            }
        };

        Ok(computed == ds.digest)
    }

    fn verify_signature(
        &self,
        algorithm: u8,
        public_key: &[u8],
        data: &[u8],
        sig: &[u8],
    ) -> Result<bool, DomainError> {
        match algorithm {
            8 => Self::verify_rsa(
                &signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
                public_key,
                data,
                sig,
            ),
            10 => Self::verify_rsa(
                &signature::RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY,
                public_key,
                data,
                sig,
            ),
            13 => Self::verify_ecdsa(&signature::ECDSA_P256_SHA256_FIXED, 64, public_key, data, sig),
            14 => Self::verify_ecdsa(&signature::ECDSA_P384_SHA384_FIXED, 96, public_key, data, sig),
            15 => {
                if public_key.len() != 32 {
                    return Err(DomainError::InvalidDnsResponse(
                        "Invalid Ed25519 public key length".into(),
                    ));
                }
                let key = signature::UnparsedPublicKey::new(&signature::ED25519, public_key);
                Ok(key.verify(data, sig).is_ok())
            }
            other => Err(DomainError::InvalidDnsResponse(format!(
                "Unsupported DNSSEC algorithm: {}",
                other
            ))),
        }
    }

    fn verify_rsa(
        params: &'static signature::RsaParameters,
        public_key: &[u8],
        data: &[u8],
        sig: &[u8],
    ) -> Result<bool, DomainError> {
        let (exponent, modulus) = Self::parse_rsa_key(public_key)?;
        let key = signature::RsaPublicKeyComponents {
            n: modulus,
            e: exponent,
        };
        Ok(key.verify(params, data, sig).is_ok())
    }

    /// DNSSEC ECDSA keys are the raw X || Y point; ring wants the
    /// uncompressed SEC1 form with a 0x04 prefix.
    fn verify_ecdsa(
        alg: &'static signature::EcdsaVerificationAlgorithm,
        point_len: usize,
        public_key: &[u8],
        data: &[u8],
        sig: &[u8],
    ) -> Result<bool, DomainError> {
        if public_key.len() != point_len {
            return Err(DomainError::InvalidDnsResponse(format!(
                "Invalid ECDSA public key length: {}",
                public_key.len()
            )));
        }
        let mut sec1 = Vec::with_capacity(point_len + 1);
        sec1.push(0x04);
        sec1.extend_from_slice(public_key);
        let key = signature::UnparsedPublicKey::new(alg, sec1);
        Ok(key.verify(data, sig).is_ok())
    }

    /// RFC 3110 key layout: exponent length in one byte, or a zero byte
    /// followed by a two byte length, then exponent, then modulus.
    fn parse_rsa_key(key_data: &[u8]) -> Result<(&[u8], &[u8]), DomainError> {
        let (exp_len, exp_start) = match key_data {
            [] => {
                return Err(DomainError::InvalidDnsResponse("Empty RSA public key".into()));
            }
            [0, hi, lo, ..] => (usize::from(u16::from_be_bytes([*hi, *lo])), 3),
            [0, ..] => {
                return Err(DomainError::InvalidDnsResponse(
                    "RSA key too short for long form".into(),
                ));
            }
            [len, ..] => (usize::from(*len), 1),
        };

        let exp_end = exp_start + exp_len;
        if exp_end >= key_data.len() {
            return Err(DomainError::InvalidDnsResponse(
                "RSA exponent extends beyond key data".into(),
            ));
        }

        Ok((
            strip_leading_zeros(&key_data[exp_start..exp_end]),
            strip_leading_zeros(&key_data[exp_end..]),
        ))
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let zeros = bytes.iter().take_while(|b| **b == 0).count();
    &bytes[zeros..]
}
