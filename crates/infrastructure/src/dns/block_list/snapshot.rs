use super::parser::ListEntry;
use super::suffix_trie::SuffixTrie;
use compact_str::CompactString;
use rsdns_application::ports::BlockListStats;
use rustc_hash::FxBuildHasher;
use std::collections::HashSet;

type DomainSet = HashSet<CompactString, FxBuildHasher>;

/// Exact names plus wildcard suffixes.
#[derive(Default)]
struct DomainMatcher {
    exact: DomainSet,
    wildcards: SuffixTrie,
}

impl DomainMatcher {
    fn add(&mut self, entry: &ListEntry) {
        match entry {
            ListEntry::Exact(domain) => {
                self.exact.insert(CompactString::new(domain));
            }
            ListEntry::Wildcard(domain) => self.wildcards.insert(domain),
            ListEntry::Domain(domain) => {
                self.exact.insert(CompactString::new(domain));
                self.wildcards.insert(domain);
            }
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.exact.contains(name) || self.wildcards.matches_subdomain(name)
    }

    fn len(&self) -> usize {
        self.exact.len() + self.wildcards.len()
    }
}

/// Immutable block list state. A refresh builds a new one and swaps it in.
#[derive(Default)]
pub struct BlockSnapshot {
    blocked: DomainMatcher,
    allowed: DomainMatcher,
    files: usize,
}

impl BlockSnapshot {
    pub fn builder() -> BlockSnapshotBuilder {
        BlockSnapshotBuilder::default()
    }

    /// `name` must be lowercase without a trailing dot.
    pub fn is_blocked(&self, name: &str) -> bool {
        self.blocked.matches(name) && !self.allowed.matches(name)
    }

    pub fn stats(&self) -> BlockListStats {
        BlockListStats {
            files: self.files,
            exact_entries: self.blocked.exact.len(),
            wildcard_entries: self.blocked.wildcards.len(),
            allow_entries: self.allowed.len(),
        }
    }
}

#[derive(Default)]
pub struct BlockSnapshotBuilder {
    snapshot: BlockSnapshot,
}

impl BlockSnapshotBuilder {
    pub fn block<'a>(mut self, entries: impl IntoIterator<Item = &'a ListEntry>) -> Self {
        for entry in entries {
            self.snapshot.blocked.add(entry);
        }
        self
    }

    pub fn allow<'a>(mut self, entries: impl IntoIterator<Item = &'a ListEntry>) -> Self {
        for entry in entries {
            self.snapshot.allowed.add(entry);
        }
        self
    }

    pub fn files(mut self, files: usize) -> Self {
        self.snapshot.files = files;
        self
    }

    pub fn build(self) -> BlockSnapshot {
        self.snapshot
    }
}
