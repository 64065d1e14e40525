//! IPTV Daemon - playlist cache and refresh backend
//!
//! Holds provider credentials in memory, refreshes the playlist on demand
//! or when the cache goes stale, and serves the channel cache over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 127.0.0.1:8000, cache in the user cache dir
//! iptvd
//!
//! # Custom bind address and cache location
//! iptvd --bind 0.0.0.0:8000 --cache-dir /var/cache/iptv
//!
//! # Auto-login at startup
//! IPTV_HOST=tv.example IPTV_USERNAME=alice IPTV_PASSWORD=secret iptvd
//!
//! # Settings from a file (flags and env win)
//! iptvd --config /etc/iptv/iptvd.toml
//! ```

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use iptvd::cache::CacheStore;
use iptvd::config::{BackendConfig, ConfigLayer};
use iptvd::server::ApiServer;
use iptvd::source::HttpPlaylistSource;
use iptvd::state::{spawn_state, StateConfig};

/// IPTV daemon - playlist cache and refresh backend
#[derive(Parser, Debug)]
#[command(name = "iptvd", version, about)]
struct Args {
    /// Address to listen on [default: 127.0.0.1:8000]
    #[arg(long, env = "IPTV_BIND")]
    bind: Option<String>,

    /// Directory holding channels.json [default: user cache dir /iptv]
    #[arg(long, env = "IPTV_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Seconds before a cached playlist is refreshed [default: 21600]
    #[arg(long, env = "CACHE_TTL_SECONDS")]
    cache_ttl_secs: Option<u64>,

    /// Verify the provider's TLS certificate [default: true]
    #[arg(long, env = "VERIFY_SSL", value_parser = BoolishValueParser::new())]
    verify_ssl: Option<bool>,

    /// Verbose logging
    #[arg(
        long,
        env = "DEBUG",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    debug: Option<bool>,

    /// Playlist download timeout in seconds [default: 20]
    #[arg(long, env = "IPTV_FETCH_TIMEOUT_SECS")]
    fetch_timeout_secs: Option<u64>,

    /// Seconds between staleness checks, 0 disables them [default: 60]
    #[arg(long, env = "IPTV_STALE_CHECK_SECS")]
    stale_check_secs: Option<u64>,

    /// Provider host for auto-login
    #[arg(long, env = "IPTV_HOST")]
    iptv_host: Option<String>,

    /// Provider username for auto-login
    #[arg(long, env = "IPTV_USERNAME")]
    iptv_username: Option<String>,

    /// Provider password for auto-login
    #[arg(long, env = "IPTV_PASSWORD", hide_env_values = true)]
    iptv_password: Option<String>,

    /// TOML file with any of the settings above
    #[arg(long, env = "IPTV_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn into_parts(self) -> (ConfigLayer, Option<PathBuf>) {
        let layer = ConfigLayer {
            bind: self.bind,
            cache_dir: self.cache_dir,
            cache_ttl_secs: self.cache_ttl_secs,
            verify_ssl: self.verify_ssl,
            debug: self.debug,
            fetch_timeout_secs: self.fetch_timeout_secs,
            stale_check_secs: self.stale_check_secs,
            iptv_host: self.iptv_host,
            iptv_username: self.iptv_username,
            iptv_password: self.iptv_password,
        };
        (layer, self.config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (overrides, config_path) = Args::parse().into_parts();
    let config = BackendConfig::resolve(overrides, config_path.as_deref())
        .context("Invalid configuration")?;

    let level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("iptvd={level}").parse()?)
                .add_directive(format!("iptv_core={level}").parse()?)
                .add_directive(format!("iptv_protocol={level}").parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "IPTV daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let source = HttpPlaylistSource::new(config.fetch_timeout, config.verify_ssl)
        .context("Failed to create playlist client")?;

    info!(
        cache_dir = %config.cache_dir.display(),
        cache_ttl_secs = config.cache_ttl.as_secs(),
        verify_ssl = config.verify_ssl,
        auto_login = config.credentials.is_some(),
        "Starting state actor"
    );
    let state = spawn_state(StateConfig {
        source: Arc::new(source),
        store: CacheStore::new(&config.cache_dir),
        cache_ttl: config.cache_ttl,
        credentials: config.credentials.clone(),
        stale_check_interval: config.stale_check_interval,
    });

    let mut server = ApiServer::new(config.bind, state, cancel_token);
    if config.debug {
        server = server.with_diagnostics(CacheStore::new(&config.cache_dir));
    }

    info!(bind = %config.bind, "Starting server");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("IPTV daemon stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
