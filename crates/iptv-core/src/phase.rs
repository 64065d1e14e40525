//! Client session phases and the phase resolution rule.

use crate::status::StatusSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the client should currently render.
///
/// Derived, never persisted. Outside of the transient `Boot` and
/// `LoggingIn` phases it is a pure projection of the latest
/// [`StatusSnapshot`] (see [`resolve_phase`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Initial status fetch in progress.
    #[default]
    Boot,
    /// Backend has no credentials; show the login form.
    NotLoggedIn,
    /// Login request (and the status fetch that follows it) in flight.
    LoggingIn,
    /// A refresh is running or the cache is missing.
    Refreshing,
    /// Channels are available.
    Ready,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boot => "BOOT",
            Self::NotLoggedIn => "NOT_LOGGED_IN",
            Self::LoggingIn => "LOGGING_IN",
            Self::Refreshing => "REFRESHING",
            Self::Ready => "READY",
        }
    }

    /// Phases in which the backend is known to hold credentials.
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::Refreshing | Self::Ready)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the phase for a status snapshot.
///
/// ```text
/// not logged_in          -> NotLoggedIn
/// refreshing             -> Refreshing
/// not cache_available    -> Refreshing (caller triggers a refresh)
/// otherwise              -> Ready
/// ```
///
/// Pure and idempotent: the same snapshot always yields the same phase.
#[must_use]
pub fn resolve_phase(snapshot: &StatusSnapshot) -> SessionPhase {
    if !snapshot.logged_in {
        SessionPhase::NotLoggedIn
    } else if snapshot.refreshing || !snapshot.cache_available {
        SessionPhase::Refreshing
    } else {
        SessionPhase::Ready
    }
}

/// True when the snapshot resolves to `Refreshing` only because the cache
/// is missing, i.e. nobody has started a refresh yet.
#[must_use]
pub fn needs_auto_refresh(snapshot: &StatusSnapshot) -> bool {
    snapshot.logged_in && !snapshot.refreshing && !snapshot.cache_available
}
