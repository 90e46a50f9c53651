use super::{
    AccessConfig, BlockingConfig, CacheConfig, ConfigError, DnssecConfig, LoggingConfig,
    ResolverConfig, ServerConfig, ServerSpec, MIN_CACHE_SIZE, MIN_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub dnssec: DnssecConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub blocking: BlockingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values given on the command line win over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub log_level: Option<String>,
    /// Loopback-only ephemeral listener with quiet logs and short timeouts
    pub test_mode: bool,
}

impl Config {
    /// Load from `path` when it exists, otherwise start from defaults.
    /// Overrides are applied and floors are enforced; call `validate` next.
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if Path::new(p).exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        config.apply_overrides(overrides);
        config.normalize();
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn write_default(path: &str) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| ConfigError::FileWrite {
            path: path.to_string(),
            source,
        })
    }

    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if overrides.test_mode {
            self.server.bind = "127.0.0.1:0".to_string();
            self.server.bind_tls = None;
            self.logging.level = "error".to_string();
            self.resolver.query_timeout_ms = 1000;
        }
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Raise values below their floors. Returns a description of every
    /// adjustment so the caller can log it.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut adjusted = Vec::new();

        if self.resolver.query_timeout_ms < MIN_TIMEOUT_MS {
            adjusted.push(format!(
                "resolver.query_timeout_ms raised from {} to {}",
                self.resolver.query_timeout_ms, MIN_TIMEOUT_MS
            ));
            self.resolver.query_timeout_ms = MIN_TIMEOUT_MS;
        }
        if self.resolver.upstream_timeout_ms < MIN_TIMEOUT_MS {
            adjusted.push(format!(
                "resolver.upstream_timeout_ms raised from {} to {}",
                self.resolver.upstream_timeout_ms, MIN_TIMEOUT_MS
            ));
            self.resolver.upstream_timeout_ms = MIN_TIMEOUT_MS;
        }
        if self.cache.size < MIN_CACHE_SIZE {
            adjusted.push(format!(
                "cache.size raised from {} to {}",
                self.cache.size, MIN_CACHE_SIZE
            ));
            self.cache.size = MIN_CACHE_SIZE;
        }

        adjusted
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|_| invalid(format!("server.bind '{}' is not ip:port", self.server.bind)))?;

        if let Some(bind_tls) = &self.server.bind_tls {
            bind_tls
                .parse::<SocketAddr>()
                .map_err(|_| invalid(format!("server.bind_tls '{}' is not ip:port", bind_tls)))?;
            if self.server.tls_certificate.is_none() || self.server.tls_private_key.is_none() {
                return Err(invalid(
                    "server.bind_tls requires tls_certificate and tls_private_key",
                ));
            }
        }

        let resolver = &self.resolver;
        for entry in resolver
            .root_servers
            .iter()
            .chain(&resolver.root6_servers)
            .chain(&resolver.fallback_servers)
        {
            entry.parse::<ServerSpec>().map_err(invalid)?;
        }
        if resolver.root_servers.is_empty()
            && resolver.root6_servers.is_empty()
            && resolver.fallback_servers.is_empty()
        {
            return Err(invalid("no root or fallback servers configured"));
        }
        if resolver.max_depth == 0 {
            return Err(invalid("resolver.max_depth must be at least 1"));
        }
        if resolver.edns_payload < 512 {
            return Err(invalid("resolver.edns_payload must be at least 512"));
        }
        if resolver.failure_threshold == 0 {
            return Err(invalid("resolver.failure_threshold must be at least 1"));
        }

        if self.cache.negative_ttl_floor > self.cache.negative_ttl_max {
            return Err(invalid(
                "cache.negative_ttl_floor must not exceed cache.negative_ttl_max",
            ));
        }

        self.access
            .build()
            .map_err(|e| invalid(format!("access list: {}", e)))?;

        if !LoggingConfig::is_valid_level(&self.logging.level) {
            return Err(invalid(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }

        if self.blocking.enabled && self.blocking.refresh_interval_secs == 0 {
            return Err(invalid("blocking.refresh_interval_secs must be positive"));
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}
