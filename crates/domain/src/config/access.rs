use crate::access::{AccessList, AccessPolicy};
use crate::DomainError;
use serde::{Deserialize, Serialize};

/// Client access control
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessConfig {
    /// CIDRs allowed to query
    #[serde(default = "default_allow")]
    pub allow: Vec<String>,

    /// CIDRs refused even inside an allowed range
    #[serde(default)]
    pub deny: Vec<String>,

    /// Policy for addresses no rule covers (default: deny)
    #[serde(default)]
    pub default_policy: AccessPolicy,
}

impl AccessConfig {
    pub fn build(&self) -> Result<AccessList, DomainError> {
        AccessList::from_rules(&self.allow, &self.deny, self.default_policy)
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            allow: default_allow(),
            deny: vec![],
            default_policy: AccessPolicy::Deny,
        }
    }
}

fn default_allow() -> Vec<String> {
    vec!["0.0.0.0/0".to_string(), "::/0".to_string()]
}
