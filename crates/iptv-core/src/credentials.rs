//! Provider credentials.

use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum length of a provider host after trimming.
pub const MIN_HOST_LEN: usize = 3;

/// IPTV provider credentials.
///
/// Held in backend memory only. The client carries them for the duration
/// of a single login call and drops them afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Checks that every field is present.
    ///
    /// The host must be at least [`MIN_HOST_LEN`] characters once trimmed;
    /// username and password must be non-empty.
    pub fn validate(&self) -> DomainResult<()> {
        if self.host.trim().chars().count() < MIN_HOST_LEN {
            return Err(DomainError::InvalidField {
                field: "host",
                reason: format!("must be at least {MIN_HOST_LEN} characters"),
            });
        }
        if self.username.trim().is_empty() {
            return Err(DomainError::InvalidField {
                field: "username",
                reason: "must not be empty".to_string(),
            });
        }
        if self.password.is_empty() {
            return Err(DomainError::InvalidField {
                field: "password",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the bare `host[:port]` the provider is reached at.
    ///
    /// `"http://provider.example:8080/get.php"` becomes
    /// `"provider.example:8080"`. Without a scheme only surrounding slashes
    /// are removed.
    #[must_use]
    pub fn normalized_host(&self) -> &str {
        let host = self.host.trim();
        match host.split_once("://") {
            Some((_, rest)) => {
                let rest = rest.trim_start_matches('/');
                rest.split('/').next().unwrap_or(rest).trim()
            }
            None => host.trim_matches('/'),
        }
    }
}

// Never print the password, even in debug logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
