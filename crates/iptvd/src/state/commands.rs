//! State actor commands, errors, and events.
//!
//! This module defines the message types for communicating with the `StateActor`:
//! - `StateCommand`: Commands sent to the actor
//! - `StateError`: Errors that can occur during state operations
//! - `RefreshEvent`: Events published by the actor for subscribers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::oneshot;

use iptv_core::{Credentials, DomainError, StatusSnapshot};

use crate::cache::CacheFile;
use crate::refresh::RefreshTrigger;

// ============================================================================
// State Commands
// ============================================================================

/// Commands sent to the state actor.
///
/// Each command is applied as one indivisible transition; request/response
/// commands answer over a oneshot channel.
#[derive(Debug)]
pub enum StateCommand {
    /// Store credentials in memory.
    ///
    /// # Errors
    /// - `StateError::InvalidCredentials` if a field is missing
    Login {
        credentials: Credentials,
        respond_to: oneshot::Sender<Result<(), StateError>>,
    },

    /// Drop the in-memory credentials. The cache is kept.
    Logout { respond_to: oneshot::Sender<()> },

    /// Start a refresh job unless one is running.
    ///
    /// Responds with the refresh start time.
    ///
    /// # Errors
    /// - `StateError::NotLoggedIn` if no credentials are stored
    /// - `StateError::AlreadyRefreshing` if a job is running
    StartRefresh {
        trigger: RefreshTrigger,
        respond_to: oneshot::Sender<Result<DateTime<Utc>, StateError>>,
    },

    /// Start a refresh if the cache is missing, expired, or for another host.
    ///
    /// Fire-and-forget, sent by the staleness ticker.
    RefreshIfStale,

    /// Current status snapshot.
    GetStatus {
        respond_to: oneshot::Sender<StatusSnapshot>,
    },

    /// Current in-memory cache, if any.
    GetCache {
        respond_to: oneshot::Sender<Option<Arc<CacheFile>>>,
    },
}

// ============================================================================
// State Errors
// ============================================================================

/// Errors that can occur during state operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("already refreshing")]
    AlreadyRefreshing,

    #[error("{0}")]
    InvalidCredentials(#[from] DomainError),

    /// The actor has shut down.
    #[error("response channel closed")]
    ChannelClosed,
}

// ============================================================================
// Refresh Events
// ============================================================================

/// Events published by the state actor to subscribers.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    Started {
        trigger: RefreshTrigger,
        host: String,
        started_at: DateTime<Utc>,
    },

    Finished {
        trigger: RefreshTrigger,
        finished_at: DateTime<Utc>,
        /// Channel count on success, error message on failure.
        outcome: Result<u64, String>,
    },
}
