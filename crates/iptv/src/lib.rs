//! IPTV TUI - Library modules
//!
//! Terminal client for the IPTV aggregator backend.
//!
//! # Architecture
//!
//! The client uses an event-driven architecture with three main components:
//!
//! 1. **Keyboard Task**: Polls for keyboard input and sends events to the main loop
//! 2. **Session Task**: Runs the session state machine, talks to the backend and
//!    publishes the current phase on a watch channel
//! 3. **Main Event Loop**: Processes events, loads dashboard data, and renders the UI
//!
//! All tasks respect a shared `CancellationToken` for graceful shutdown.

pub mod app;
pub mod client;
pub mod error;
pub mod input;
pub mod poller;
pub mod session;
pub mod ui;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use app::App;
pub use client::{BackendApi, BackendClient, ClientConfig};
pub use error::{ClientError, Result, TuiError};
pub use session::{spawn_session, SessionHandle, SessionView};
