use async_trait::async_trait;
use futures::future::join_all;
use rsdns_application::ports::BlocklistSourcePort;
use rsdns_domain::DomainError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads the configured list URLs into the blocklist directory.
///
/// Each source is written to a temporary file and renamed over its target,
/// so a reader never sees a half-written list.
pub struct BlocklistDownloader {
    client: reqwest::Client,
    sources: Vec<String>,
}

impl BlocklistDownloader {
    pub fn new(sources: Vec<String>) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rsdns/", env!("CARGO_PKG_VERSION"), " (blocklist-sync)"))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| DomainError::Blocklist(format!("HTTP client: {}", e)))?;

        Ok(Self { client, sources })
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Stable file name for a source URL.
    pub fn file_name_for(url: &str) -> String {
        let trimmed = url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let mut name: String = trimmed
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        name.truncate(120);
        format!("{}.list", name.trim_matches('_'))
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("fetch error for {}: {}", url, e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {} for {}", response.status().as_u16(), url));
        }

        response
            .text()
            .await
            .map_err(|e| format!("read error for {}: {}", url, e))
    }

    async fn write_atomically(dir: &Path, file_name: &str, body: &str) -> std::io::Result<PathBuf> {
        let target = dir.join(file_name);
        let tmp = dir.join(format!(".{}.tmp", file_name));
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(target)
    }
}

#[async_trait]
impl BlocklistSourcePort for BlocklistDownloader {
    async fn update_blocklists(&self, dir: &Path) -> Result<usize, DomainError> {
        if self.sources.is_empty() {
            return Ok(0);
        }

        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            DomainError::Blocklist(format!("Cannot create {}: {}", dir.display(), e))
        })?;

        let fetches = self.sources.iter().map(|url| async move {
            let body = self.fetch(url).await?;
            Self::write_atomically(dir, &Self::file_name_for(url), &body)
                .await
                .map_err(|e| format!("write error for {}: {}", url, e))
        });

        let mut written = 0;
        let mut failures = Vec::new();
        for result in join_all(fetches).await {
            match result {
                Ok(path) => {
                    debug!(file = %path.display(), "Blocklist source saved");
                    written += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Blocklist source failed");
                    failures.push(e);
                }
            }
        }

        if written == 0 {
            return Err(DomainError::Blocklist(format!(
                "All {} blocklist sources failed: {}",
                failures.len(),
                failures.join("; ")
            )));
        }
        Ok(written)
    }
}
