use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("Invalid trust anchor: {0}")]
    InvalidTrustAnchor(String),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("DNSSEC validation failed: {0}")]
    DnssecBogus(String),

    #[error("Query timeout")]
    QueryTimeout,

    #[error("Server failure: {0}")]
    ServerFailure(String),

    #[error("Delegation depth exceeded after {0} steps")]
    DelegationDepthExceeded(usize),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Blocklist error: {0}")]
    Blocklist(String),
}

impl DomainError {
    /// Errors that say something about the upstream server rather than the
    /// query itself. These count against the server's health.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            DomainError::Transport(_)
                | DomainError::IoError(_)
                | DomainError::InvalidDnsResponse(_)
                | DomainError::QueryTimeout
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::IoError(err.to_string())
    }
}
