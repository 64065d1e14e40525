//! IPTV Core - Shared types for the IPTV aggregator
//!
//! This crate provides the core domain types shared between
//! the backend (iptvd) and the terminal client (iptv).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod channel;
pub mod credentials;
pub mod error;
pub mod phase;
pub mod status;

// Re-exports for convenience
pub use channel::{Channel, ChannelCategory, ChannelStats};
pub use credentials::Credentials;
pub use error::{DomainError, DomainResult};
pub use phase::{needs_auto_refresh, resolve_phase, SessionPhase};
pub use status::{RefreshStatus, StatusSnapshot};
