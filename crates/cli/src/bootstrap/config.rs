use rsdns_domain::{CliOverrides, Config};
use std::path::Path;
use tracing::info;

pub struct LoadedConfig {
    pub config: Config,
    /// The file was missing and a default one was written in its place.
    pub generated: bool,
}

pub fn load_config(config_path: &str, cli_overrides: CliOverrides) -> anyhow::Result<LoadedConfig> {
    let generated = !cli_overrides.test_mode && !Path::new(config_path).exists();
    if generated {
        Config::write_default(config_path)?;
    }

    let config = Config::load(Some(config_path), cli_overrides)?;
    config.validate()?;
    Ok(LoadedConfig { config, generated })
}

/// Logged once the subscriber is up, since loading happens before it.
pub fn log_config_summary(config_path: &str, loaded: &LoadedConfig) {
    let config = &loaded.config;
    if loaded.generated {
        info!(config_file = config_path, "Wrote default configuration");
    }
    info!(
        config_file = config_path,
        bind = %config.server.bind,
        bind_tls = config.server.bind_tls.as_deref().unwrap_or("disabled"),
        root_servers = config.resolver.root_servers.len() + config.resolver.root6_servers.len(),
        fallback_servers = config.resolver.fallback_servers.len(),
        cache_size = config.cache.size,
        dnssec = config.dnssec.enabled,
        blocking = config.blocking.enabled,
        "Configuration loaded"
    );
}
