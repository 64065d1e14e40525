//! The refresh job: fetch, parse, persist.
//!
//! The job runs on its own task and never touches shared state. It hands its
//! result back to the state actor, which applies it in a single transition.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use iptv_core::Credentials;
use iptv_protocol::parse_m3u;

use crate::cache::{CacheError, CacheFile, CacheStore};
use crate::source::PlaylistSource;

/// Why a refresh was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// `POST /refresh`.
    Manual,
    /// The staleness ticker found the cache missing, expired or for another host.
    Stale,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Stale => write!(f, "stale"),
        }
    }
}

/// Failures of a refresh job. The `Display` text is what clients see in
/// `last_error`.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("IPTV request timed out")]
    Timeout,

    #[error("IPTV server closed the connection")]
    Connection,

    #[error("IPTV server returned HTTP {0}")]
    HttpStatus(u16),

    #[error("IPTV request failed: {0}")]
    Request(String),

    #[error("Empty M3U playlist received from IPTV provider")]
    EmptyPlaylist,

    #[error("Failed to initialize HTTP client: {0}")]
    Client(String),

    #[error("Failed to write channel cache: {0}")]
    Cache(#[from] CacheError),

    #[error("Refresh task failed: {0}")]
    Task(String),
}

/// Runs one refresh for `credentials`.
///
/// On success the new cache has already been written to disk.
///
/// # Errors
///
/// Any fetch or persist failure. The previous cache file is left untouched.
pub async fn run_refresh(
    source: &dyn PlaylistSource,
    store: &CacheStore,
    credentials: &Credentials,
) -> Result<Arc<CacheFile>, RefreshError> {
    let host = credentials.host.clone();
    info!(host = %host, "Refresh job started");

    let playlist = source.fetch(credentials).await?;
    let channels = parse_m3u(&playlist);
    info!(host = %host, channels = channels.len(), "Playlist parsed");

    let file = Arc::new(CacheFile::build(host, channels, Utc::now()));

    let store = store.clone();
    let to_write = Arc::clone(&file);
    tokio::task::spawn_blocking(move || store.save(&to_write))
        .await
        .map_err(|e| RefreshError::Task(e.to_string()))?
        .map_err(|e| {
            warn!(error = %e, "Failed to persist refreshed playlist");
            RefreshError::from(e)
        })?;

    Ok(file)
}
