use super::parser::{parse_list_line, parse_list_text, ListEntry};
use super::snapshot::BlockSnapshot;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use rsdns_application::ports::{BlockListPort, BlockListStats};
use rsdns_domain::config::BlockingConfig;
use rsdns_domain::DomainError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The block list.
///
/// The active `BlockSnapshot` is swapped atomically via `ArcSwap` on every
/// refresh. Readers load the pointer once per lookup, so a lookup sees
/// either the old or the new snapshot in full. Custom entries and the
/// whitelist come from configuration and are merged into every snapshot.
pub struct BlockList {
    snapshot: ArcSwap<BlockSnapshot>,
    custom: Arc<Vec<ListEntry>>,
    whitelist: Arc<Vec<ListEntry>>,
}

impl BlockList {
    pub fn new<S: AsRef<str>>(custom_blocked: &[S], whitelist: &[S]) -> Self {
        let custom: Vec<ListEntry> = custom_blocked
            .iter()
            .filter_map(|line| parse_list_line(line.as_ref()))
            .collect();
        let whitelist: Vec<ListEntry> = whitelist
            .iter()
            .filter_map(|line| parse_list_line(line.as_ref()))
            .collect();

        let initial = BlockSnapshot::builder()
            .block(&custom)
            .allow(&whitelist)
            .build();

        Self {
            snapshot: ArcSwap::from_pointee(initial),
            custom: Arc::new(custom),
            whitelist: Arc::new(whitelist),
        }
    }

    pub fn from_config(config: &BlockingConfig) -> Self {
        Self::new(&config.custom_blocked, &config.whitelist)
    }

    /// Parse every regular file in `dir` into a new snapshot and swap it in.
    /// On error the current snapshot stays active.
    pub async fn read_blocklists(&self, dir: &Path) -> Result<BlockListStats, DomainError> {
        let dir = dir.to_path_buf();
        let custom = Arc::clone(&self.custom);
        let whitelist = Arc::clone(&self.whitelist);

        let snapshot = tokio::task::spawn_blocking(move || {
            build_snapshot(&dir, &custom, &whitelist)
        })
        .await
        .map_err(|e| DomainError::Blocklist(format!("Blocklist reader task failed: {}", e)))??;

        let stats = snapshot.stats();
        self.snapshot.store(Arc::new(snapshot));
        info!(
            files = stats.files,
            exact = stats.exact_entries,
            wildcard = stats.wildcard_entries,
            allowed = stats.allow_entries,
            "Blocklist snapshot swapped"
        );
        Ok(stats)
    }

    fn normalize(name: &str) -> String {
        name.trim_end_matches('.').to_ascii_lowercase()
    }
}

fn build_snapshot(
    dir: &Path,
    custom: &[ListEntry],
    whitelist: &[ListEntry],
) -> Result<BlockSnapshot, DomainError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| {
        DomainError::Blocklist(format!("Cannot read blocklist dir {}: {}", dir.display(), e))
    })?;

    let mut paths: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
        })
        .collect();
    paths.sort();

    let mut entries = Vec::new();
    let mut files = 0;
    for path in &paths {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let parsed = parse_list_text(&text);
                debug!(file = %path.display(), entries = parsed.len(), "Blocklist file parsed");
                entries.extend(parsed);
                files += 1;
            }
            Err(e) => warn!(file = %path.display(), error = %e, "Skipping unreadable blocklist file"),
        }
    }

    Ok(BlockSnapshot::builder()
        .block(&entries)
        .block(custom)
        .allow(whitelist)
        .files(files)
        .build())
}

#[async_trait]
impl BlockListPort for BlockList {
    fn is_blocked(&self, name: &str) -> bool {
        self.snapshot.load().is_blocked(&Self::normalize(name))
    }

    async fn refresh(&self, dir: &Path) -> Result<BlockListStats, DomainError> {
        self.read_blocklists(dir).await
    }

    fn stats(&self) -> BlockListStats {
        self.snapshot.load().stats()
    }
}
