//! On-disk channel cache.
//!
//! The cache lives at `<cache_dir>/channels.json`. Writes go to
//! `channels.tmp` first, are fsynced, then renamed over the final path, so a
//! reader never sees a half-written file. A file that fails to decode is
//! moved aside as `channels.corrupt-<timestamp>.json` and treated as absent.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()` or `.expect()` in production code
//! - All IO failures surface as `CacheError`

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use iptv_core::{Channel, ChannelCategory, ChannelStats};
use iptv_protocol::GroupsResponse;

/// Schema version written into every cache file.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

const CACHE_FILE_NAME: &str = "channels.json";
const CACHE_TMP_NAME: &str = "channels.tmp";

// ============================================================================
// Cache File
// ============================================================================

/// Persisted playlist plus metadata precomputed at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFile {
    pub schema_version: u32,
    /// Provider host the playlist was fetched from.
    pub host: String,
    /// When the playlist was fetched.
    pub timestamp: DateTime<Utc>,
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub channel_count: u64,
    #[serde(default)]
    pub stats: ChannelStats,
    #[serde(default)]
    pub categories: Vec<ChannelCategory>,
    #[serde(default)]
    pub group_counts: BTreeMap<String, u64>,
}

impl CacheFile {
    /// Builds a cache file, computing stats, categories and group counts.
    pub fn build(host: impl Into<String>, channels: Vec<Channel>, timestamp: DateTime<Utc>) -> Self {
        let mut file = Self {
            schema_version: CACHE_SCHEMA_VERSION,
            host: host.into(),
            timestamp,
            channels,
            channel_count: 0,
            stats: ChannelStats::default(),
            categories: Vec::new(),
            group_counts: BTreeMap::new(),
        };
        file.recompute();
        file
    }

    /// Recomputes every derived field from `channels`.
    fn recompute(&mut self) {
        self.channel_count = self.channels.len() as u64;
        self.stats = ChannelStats::from_channels(&self.channels);

        let mut categories: Vec<ChannelCategory> =
            self.channels.iter().map(|c| c.category).collect();
        categories.sort_by_key(|c| c.as_str());
        categories.dedup();
        self.categories = categories;

        let mut group_counts = BTreeMap::new();
        for channel in &self.channels {
            let group = match channel.group.trim() {
                "" => "Unknown",
                g => g,
            };
            let count = group_counts.entry(group.to_string()).or_insert(0u64);
            *count = count.saturating_add(1);
        }
        self.group_counts = group_counts;
    }

    /// True if the cache was built for `host` and is not older than `ttl`.
    pub fn is_fresh(&self, host: &str, ttl: Duration, now: DateTime<Utc>) -> bool {
        if self.host != host {
            debug!(cached = %self.host, active = %host, "Cache host mismatch");
            return false;
        }
        now <= self.timestamp + ttl
    }

    pub fn groups(&self) -> GroupsResponse {
        GroupsResponse {
            categories: self.categories.clone(),
            groups: self.group_counts.clone(),
        }
    }
}

// ============================================================================
// Cache Store
// ============================================================================

/// Reads and writes the cache file inside a cache directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cache file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    /// Loads the cache file.
    ///
    /// Returns `Ok(None)` when there is no file, or when the file was corrupt
    /// and has been quarantined.
    ///
    /// # Errors
    ///
    /// `CacheError::Io` if the file exists but cannot be read.
    pub fn load(&self) -> Result<Option<CacheFile>, CacheError> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No channel cache on disk");
                return Ok(None);
            }
            Err(e) => return Err(CacheError::io(&path, e)),
        };

        match serde_json::from_slice::<CacheFile>(&bytes) {
            Ok(mut file) => {
                file.recompute();
                info!(
                    path = %path.display(),
                    host = %file.host,
                    channels = file.channel_count,
                    timestamp = %file.timestamp,
                    "Channel cache loaded"
                );
                Ok(Some(file))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Channel cache is corrupt");
                self.quarantine(&path, Utc::now());
                Ok(None)
            }
        }
    }

    /// Writes the cache file atomically.
    ///
    /// # Errors
    ///
    /// `CacheError::Io` for filesystem failures, `CacheError::Serialize` if
    /// the payload cannot be encoded.
    pub fn save(&self, file: &CacheFile) -> Result<u64, CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let payload = serde_json::to_vec(file).map_err(CacheError::Serialize)?;
        let tmp_path = self.dir.join(CACHE_TMP_NAME);
        let final_path = self.path();

        {
            let mut tmp = File::create(&tmp_path).map_err(|e| CacheError::io(&tmp_path, e))?;
            tmp.write_all(&payload)
                .and_then(|()| tmp.write_all(b"\n"))
                .and_then(|()| tmp.sync_all())
                .map_err(|e| CacheError::io(&tmp_path, e))?;
        }
        fs::rename(&tmp_path, &final_path).map_err(|e| CacheError::io(&final_path, e))?;

        let bytes = payload.len() as u64 + 1;
        info!(
            path = %final_path.display(),
            host = %file.host,
            channels = file.channel_count,
            bytes,
            "Channel cache saved"
        );
        Ok(bytes)
    }

    /// Moves a corrupt cache file aside so it is not read again.
    fn quarantine(&self, path: &Path, now: DateTime<Utc>) {
        let target = self.dir.join(format!(
            "channels.corrupt-{}.json",
            now.format("%Y%m%dT%H%M%S")
        ));
        match fs::rename(path, &target) {
            Ok(()) => warn!(
                path = %path.display(),
                quarantined = %target.display(),
                "Corrupt channel cache quarantined"
            ),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to quarantine corrupt channel cache"
            ),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize channel cache: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
