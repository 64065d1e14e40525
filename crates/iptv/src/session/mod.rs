//! Client session: the phase state machine and the task that drives it.
//!
//! [`machine`] is pure and synchronous; [`controller`] owns a machine,
//! executes its effects against a [`BackendApi`](crate::client::BackendApi)
//! and publishes [`SessionView`]s.

pub mod controller;
pub mod machine;

pub use controller::{spawn_session, SessionClosed, SessionCommand, SessionHandle};
pub use machine::{Effect, Input, SessionMachine, SessionView};
