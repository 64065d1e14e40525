//! Backend status snapshot.
//!
//! A [`StatusSnapshot`] is one immutable payload returned by `GET /status`.
//! It is the single source of truth for the client's session phase: every
//! new snapshot fully replaces the previous one, nothing is merged.

use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Refresh Status
// ============================================================================

/// Outcome of the most recent playlist refresh as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    /// A refresh is currently running.
    Loading,
    /// The last refresh succeeded (or a cache was loaded from disk).
    Success,
    /// The last refresh failed; see `last_error`.
    Failed,
    /// No refresh has run and no cache exists.
    #[default]
    Missing,
}

impl RefreshStatus {
    /// Returns the wire label (`"loading"`, `"success"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Missing => "missing",
        }
    }
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Status Snapshot
// ============================================================================

/// Backend status as returned by `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Credentials are present in backend memory.
    pub logged_in: bool,

    /// A refresh job is running right now.
    pub refreshing: bool,

    /// A channel cache exists (possibly stale).
    pub cache_available: bool,

    /// Number of channels in the cache (0 without cache).
    #[serde(default)]
    pub channel_count: u64,

    /// Timestamp of the cached playlist.
    #[serde(default)]
    pub last_refresh: Option<DateTime<Utc>>,

    /// When the running refresh started. Set iff `refreshing`.
    #[serde(default)]
    pub refresh_started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub refresh_status: RefreshStatus,

    /// Error message of the last failed refresh.
    #[serde(default)]
    pub last_error: Option<String>,

    /// Timestamp of the last refresh that produced a cache.
    #[serde(default)]
    pub last_successful_refresh: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    /// Snapshot of a backend with no credentials and no cache.
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Checks the snapshot invariants.
    ///
    /// - `refreshing` implies `refresh_started_at` is set
    /// - `refresh_status == success` implies `cache_available`
    pub fn validate(&self) -> DomainResult<()> {
        if self.refreshing && self.refresh_started_at.is_none() {
            return Err(DomainError::InconsistentSnapshot(
                "refreshing without refresh_started_at",
            ));
        }
        if self.refresh_status == RefreshStatus::Success && !self.cache_available {
            return Err(DomainError::InconsistentSnapshot(
                "refresh_status is success but no cache is available",
            ));
        }
        Ok(())
    }

    /// Seconds since the running refresh started, if one is running.
    pub fn refresh_elapsed_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.refreshing {
            return None;
        }
        self.refresh_started_at
            .map(|started| (now - started).num_seconds().max(0))
    }
}
