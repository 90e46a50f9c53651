//! # rsdns
//!
//! Recursive DNS resolver with DNSSEC validation and domain blocking.

mod bootstrap;
mod di;
mod server;

use bootstrap::config::log_config_summary;
use bootstrap::{init_logging, load_config};
use clap::Parser;
use di::DnsServices;
use rsdns_application::ports::BlockListPort;
use rsdns_domain::{CliOverrides, Config};
use rsdns_jobs::{BlocklistSyncJob, CacheMaintenanceJob, JobRunner};
use server::start_dns_server;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "rsdns")]
#[command(version)]
#[command(about = "Recursive DNS resolver with DNSSEC validation and domain blocking")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long, default_value = "rsdns.toml")]
    config: String,

    /// UDP/TCP listen address, overrides server.bind
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Listen on an ephemeral loopback port with quiet logs and short timeouts
    #[arg(long)]
    test_mode: bool,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.write_default_config {
        Config::write_default(&cli.config)?;
        println!("Default configuration written to {}", cli.config);
        return Ok(());
    }

    let overrides = CliOverrides {
        bind: cli.bind,
        log_level: cli.log_level,
        test_mode: cli.test_mode,
    };
    let loaded = load_config(&cli.config, overrides)?;
    init_logging(&loaded.config);
    log_config_summary(&cli.config, &loaded);
    let config = loaded.config;

    let services = DnsServices::new(&config)?;
    let shutdown = CancellationToken::new();

    let mut jobs = JobRunner::new().with_cache_maintenance(
        CacheMaintenanceJob::new(services.cache.clone())
            .with_interval(config.cache.maintenance_interval_secs)
            .with_cancellation(shutdown.clone()),
    );
    if let Some(refresh) = &services.refresh_blocklists {
        jobs = jobs.with_blocklist_sync(
            BlocklistSyncJob::new(refresh.clone())
                .with_interval(config.blocking.refresh_interval_secs)
                .with_startup_delay(config.blocking.startup_delay_secs)
                .with_cancellation(shutdown.clone()),
        );
    }
    jobs.start().await;

    let listeners = start_dns_server(&config.server, services.handler.clone(), shutdown.clone()).await?;
    // Test harnesses read the bound address from stdout.
    if cli.test_mode {
        println!("listening on {}", listeners.udp);
    }
    info!("rsdns ready, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();
    listeners.join().await;

    let cache = services.cache.stats();
    info!(
        cache_entries = cache.entries,
        cache_hit_rate = cache.hit_rate(),
        blocked_entries = services.block_list.stats().total_blocked(),
        "rsdns stopped"
    );

    Ok(())
}
