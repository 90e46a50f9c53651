use crate::DomainError;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    Allow,
    #[default]
    Deny,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: [Option<Box<TrieNode>>; 2],
    policy: Option<AccessPolicy>,
}

/// Binary prefix trie over address bits, one per address family.
///
/// Every inserted CIDR stores its policy at depth `prefix`. A lookup walks the
/// address bits from the most significant one and remembers the deepest policy
/// it passed, so the longest matching prefix decides. When nothing matches the
/// list falls back to `default_policy`.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug)]
pub struct AccessList {
    v4: TrieNode,
    v6: TrieNode,
    default_policy: AccessPolicy,
    rules: usize,
}

impl AccessList {
    pub fn new(default_policy: AccessPolicy) -> Self {
        Self {
            v4: TrieNode::default(),
            v6: TrieNode::default(),
            default_policy,
            rules: 0,
        }
    }

    /// Build from allow and deny CIDR lists. A CIDR present in both lists is
    /// denied. Any unparsable entry aborts the whole build.
    pub fn from_rules<A, D>(
        allow: &[A],
        deny: &[D],
        default_policy: AccessPolicy,
    ) -> Result<Self, DomainError>
    where
        A: AsRef<str>,
        D: AsRef<str>,
    {
        let mut list = Self::new(default_policy);
        for cidr in allow {
            list.insert(parse_cidr(cidr.as_ref())?, AccessPolicy::Allow);
        }
        for cidr in deny {
            list.insert(parse_cidr(cidr.as_ref())?, AccessPolicy::Deny);
        }
        Ok(list)
    }

    pub fn insert(&mut self, network: IpNetwork, policy: AccessPolicy) {
        let prefix = usize::from(network.prefix());
        let (root, bits) = match network.network() {
            IpAddr::V4(v4) => (&mut self.v4, u128::from(u32::from(v4)) << 96),
            IpAddr::V6(v6) => (&mut self.v6, u128::from(v6)),
        };

        let mut node = root;
        for depth in 0..prefix {
            let bit = bit_at(bits, depth);
            node = &mut **node.children[bit].get_or_insert_with(Box::default);
        }
        node.policy = Some(policy);
        self.rules += 1;
    }

    /// Policy of the longest prefix covering `ip`, if any rule covers it.
    pub fn longest_match(&self, ip: IpAddr) -> Option<AccessPolicy> {
        let (root, bits, width) = match unmap(ip) {
            IpAddr::V4(v4) => (&self.v4, u128::from(u32::from(v4)) << 96, 32),
            IpAddr::V6(v6) => (&self.v6, u128::from(v6), 128),
        };

        let mut node = root;
        let mut best = node.policy;
        for depth in 0..width {
            match &node.children[bit_at(bits, depth)] {
                Some(child) => {
                    node = child.as_ref();
                    if node.policy.is_some() {
                        best = node.policy;
                    }
                }
                None => break,
            }
        }
        best
    }

    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        self.longest_match(ip).unwrap_or(self.default_policy) == AccessPolicy::Allow
    }

    pub fn default_policy(&self) -> AccessPolicy {
        self.default_policy
    }

    pub fn len(&self) -> usize {
        self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules == 0
    }
}

fn parse_cidr(cidr: &str) -> Result<IpNetwork, DomainError> {
    cidr.trim()
        .parse::<IpNetwork>()
        .map_err(|e| DomainError::InvalidCidr(format!("{}: {}", cidr, e)))
}

#[inline]
fn bit_at(bits: u128, depth: usize) -> usize {
    ((bits >> (127 - depth)) & 1) as usize
}

/// Dual-stack sockets report IPv4 peers as `::ffff:a.b.c.d`.
fn unmap(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
        v4 => v4,
    }
}
