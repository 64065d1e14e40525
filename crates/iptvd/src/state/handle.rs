//! Client interface for interacting with the StateActor.
//!
//! The `StateHandle` is a cheap-to-clone interface used by the HTTP handlers
//! and the staleness ticker.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `StateError::ChannelClosed`

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};

use iptv_core::{Credentials, StatusSnapshot};

use super::commands::{RefreshEvent, StateCommand, StateError};
use crate::cache::CacheFile;
use crate::refresh::RefreshTrigger;

// ============================================================================
// State Handle
// ============================================================================

/// Handle for interacting with the state actor.
///
/// # Usage
///
/// ```ignore
/// handle.login(credentials).await?;
/// let started_at = handle.start_refresh(RefreshTrigger::Manual).await?;
///
/// let mut events = handle.subscribe();
/// while let Ok(event) = events.recv().await {
///     // ...
/// }
/// ```
#[derive(Clone)]
pub struct StateHandle {
    sender: mpsc::Sender<StateCommand>,
    event_sender: broadcast::Sender<RefreshEvent>,
}

impl StateHandle {
    pub fn new(
        sender: mpsc::Sender<StateCommand>,
        event_sender: broadcast::Sender<RefreshEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    /// Stores credentials in memory.
    ///
    /// # Errors
    ///
    /// - `StateError::InvalidCredentials` if a field fails validation
    /// - `StateError::ChannelClosed` if the actor has shut down
    pub async fn login(&self, credentials: Credentials) -> Result<(), StateError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(StateCommand::Login {
                credentials,
                respond_to: tx,
            })
            .await
            .map_err(|_| StateError::ChannelClosed)?;

        rx.await.map_err(|_| StateError::ChannelClosed)?
    }

    /// Forgets the stored credentials.
    ///
    /// # Errors
    ///
    /// `StateError::ChannelClosed` if the actor has shut down.
    pub async fn logout(&self) -> Result<(), StateError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(StateCommand::Logout { respond_to: tx })
            .await
            .map_err(|_| StateError::ChannelClosed)?;

        rx.await.map_err(|_| StateError::ChannelClosed)
    }

    /// Starts a refresh job and returns its start time.
    ///
    /// # Errors
    ///
    /// - `StateError::NotLoggedIn` if no credentials are stored
    /// - `StateError::AlreadyRefreshing` if a job is running
    /// - `StateError::ChannelClosed` if the actor has shut down
    pub async fn start_refresh(
        &self,
        trigger: RefreshTrigger,
    ) -> Result<DateTime<Utc>, StateError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(StateCommand::StartRefresh {
                trigger,
                respond_to: tx,
            })
            .await
            .map_err(|_| StateError::ChannelClosed)?;

        rx.await.map_err(|_| StateError::ChannelClosed)?
    }

    /// Current status snapshot.
    ///
    /// # Errors
    ///
    /// `StateError::ChannelClosed` if the actor has shut down.
    pub async fn status(&self) -> Result<StatusSnapshot, StateError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(StateCommand::GetStatus { respond_to: tx })
            .await
            .map_err(|_| StateError::ChannelClosed)?;

        rx.await.map_err(|_| StateError::ChannelClosed)
    }

    /// Current channel cache, or `None` if nothing has been fetched yet or
    /// the actor is gone.
    pub async fn cache(&self) -> Option<Arc<CacheFile>> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(StateCommand::GetCache { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Subscribes to refresh events.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.event_sender.subscribe()
    }
}
