//! Error types for the IPTV terminal client.
//!
//! - `ClientError`: failures talking to the backend. Its `Display` text is the
//!   single human-readable message shown in the footer.
//! - `TuiError`: terminal setup and teardown failures.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()` outside tests.

use std::io;

use thiserror::Error;

use iptv_core::DomainError;

/// Backend reason for a rejected refresh while one is running.
pub const ALREADY_REFRESHING: &str = "already refreshing";

/// Backend reason for a rejected refresh without credentials.
pub const NOT_LOGGED_IN: &str = "not logged in";

// ============================================================================
// Client Error
// ============================================================================

/// Failures of a backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The backend could not be reached or did not answer in time.
    ///
    /// `detail` is logged but not shown.
    #[error("Unable to reach backend")]
    Transport { detail: String },

    /// The backend refused the command (HTTP 409). The reason is shown
    /// verbatim.
    #[error("{0}")]
    Rejected(String),

    /// Input failed validation, locally or with HTTP 422.
    #[error("{0}")]
    Validation(String),

    /// Unexpected status code or undecodable body.
    #[error("Unexpected response from backend: {0}")]
    Protocol(String),
}

impl ClientError {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }

    /// True for the 409 returned while a refresh is already running.
    pub fn is_already_refreshing(&self) -> bool {
        matches!(self, Self::Rejected(reason) if reason == ALREADY_REFRESHING)
    }
}

impl From<DomainError> for ClientError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

// ============================================================================
// TUI Error
// ============================================================================

/// Terminal errors.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Raw mode or the alternate screen could not be set up, usually
    /// because stdout is not a TTY.
    #[error("Failed to initialize terminal: {0}")]
    TerminalInit(String),

    /// The terminal could not be restored; running `reset` can help.
    #[error("Failed to restore terminal: {0}")]
    TerminalCleanup(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience Result type alias for terminal operations.
pub type Result<T> = std::result::Result<T, TuiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_hides_detail() {
        let error = ClientError::transport("connection refused (os error 111)");
        assert_eq!(error.to_string(), "Unable to reach backend");
        assert!(format!("{error:?}").contains("connection refused"));
    }

    #[test]
    fn test_rejected_error_is_verbatim() {
        let error = ClientError::Rejected(ALREADY_REFRESHING.to_string());
        assert_eq!(error.to_string(), "already refreshing");
        assert!(error.is_already_refreshing());
        assert!(!ClientError::Rejected(NOT_LOGGED_IN.to_string()).is_already_refreshing());
    }

    #[test]
    fn test_protocol_error_display() {
        let error = ClientError::Protocol("HTTP 500".to_string());
        assert_eq!(error.to_string(), "Unexpected response from backend: HTTP 500");
    }

    #[test]
    fn test_domain_error_becomes_validation() {
        let error = ClientError::from(DomainError::InvalidField {
            field: "password",
            reason: "must not be empty".to_string(),
        });
        assert_eq!(
            error,
            ClientError::Validation("Invalid password: must not be empty".to_string())
        );
    }

    #[test]
    fn test_terminal_errors_display() {
        let error = TuiError::TerminalInit("not a TTY".to_string());
        assert!(error.to_string().contains("Failed to initialize terminal"));

        let error = TuiError::TerminalCleanup("could not restore cursor".to_string());
        assert!(error.to_string().contains("Failed to restore terminal"));

        let error: TuiError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(error, TuiError::Io(_)));
    }
}
