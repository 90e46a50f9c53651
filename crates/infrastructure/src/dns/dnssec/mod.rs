pub mod crypto;
pub mod trust_anchor;
pub mod types;
pub mod validator;

pub use crypto::SignatureVerifier;
pub use trust_anchor::{TrustAnchor, TrustAnchorStore};
pub use types::{DnskeyRecord, DsRecord, RrsigRecord};
pub use validator::{ChainValidator, RecordFetcher};
