use compact_str::CompactString;
use rustc_hash::FxBuildHasher;
use std::collections::HashMap;

#[derive(Default)]
struct TrieNode {
    children: HashMap<CompactString, TrieNode, FxBuildHasher>,
    /// A wildcard entry ends here: every strict subdomain of this node matches.
    terminal: bool,
}

/// Reversed-label trie for wildcard suffix entries.
///
/// `example.com` is stored as the path `com` -> `example`. Matching walks
/// the queried name's labels in the same order, so a hit is always aligned
/// on a label boundary: `ads.example.com` matches, `notexample.com` does not.
#[derive(Default)]
pub struct SuffixTrie {
    root: TrieNode,
    len: usize,
}

impl SuffixTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a normalized domain (lowercase, no trailing dot).
    pub fn insert(&mut self, domain: &str) {
        let mut node = &mut self.root;
        for label in domain.split('.').rev() {
            node = node.children.entry(CompactString::new(label)).or_default();
        }
        if !node.terminal {
            node.terminal = true;
            self.len += 1;
        }
    }

    /// True when `domain` is a strict subdomain of an inserted entry.
    #[inline]
    pub fn matches_subdomain(&self, domain: &str) -> bool {
        let n = domain.split('.').count();
        let mut node = &self.root;

        for (i, label) in domain.split('.').rev().enumerate() {
            match node.children.get(label) {
                Some(child) => {
                    // at least one more label must remain below the entry
                    if child.terminal && i + 1 < n {
                        return true;
                    }
                    node = child;
                }
                None => return false,
            }
        }
        false
    }
}
