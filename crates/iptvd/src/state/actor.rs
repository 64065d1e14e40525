//! State actor - owns credentials, refresh state and the channel cache.
//!
//! The StateActor is the single owner of backend state. It receives commands
//! via an mpsc channel, receives refresh job results via a second channel,
//! and publishes refresh events via broadcast.
//!
//! Because every command is handled to completion before the next one is
//! received, the check "no refresh running" and the transition to
//! "refresh running" can never interleave with another request. Two
//! near-simultaneous `POST /refresh` calls therefore produce exactly one
//! accepted refresh and one `AlreadyRefreshing`.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel send failures are logged but don't panic

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use iptv_core::{Credentials, RefreshStatus, StatusSnapshot};

use super::commands::{RefreshEvent, StateCommand, StateError};
use crate::cache::{CacheFile, CacheStore};
use crate::refresh::{run_refresh, RefreshError, RefreshTrigger};
use crate::source::PlaylistSource;

/// After a failed refresh the staleness ticker waits this long before
/// trying again. Manual refreshes are not affected.
pub const STALE_RETRY_BACKOFF_SECS: i64 = 300;

/// Buffer for refresh job results. At most one job runs at a time.
const COMPLETION_BUFFER: usize = 4;

// ============================================================================
// Refresh State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    Idle,
    Running {
        started_at: DateTime<Utc>,
        trigger: RefreshTrigger,
    },
}

/// Result of a refresh job, sent back to the actor.
#[derive(Debug)]
struct RefreshCompletion {
    trigger: RefreshTrigger,
    result: Result<Arc<CacheFile>, RefreshError>,
}

// ============================================================================
// State Actor
// ============================================================================

/// Inputs for building a [`StateActor`].
pub struct ActorParts {
    pub source: Arc<dyn PlaylistSource>,
    pub store: CacheStore,
    pub cache_ttl: Duration,
    /// Credentials to start logged in with.
    pub credentials: Option<Credentials>,
    /// Cache loaded from disk at startup.
    pub cache: Option<CacheFile>,
}

/// The state actor.
///
/// # Ownership
///
/// The actor owns:
/// - `credentials`: provider credentials, in memory only
/// - `refresh`: whether a job is running and since when
/// - `cache`: the channel cache currently served by the API
pub struct StateActor {
    receiver: mpsc::Receiver<StateCommand>,

    completion_tx: mpsc::Sender<RefreshCompletion>,
    completion_rx: mpsc::Receiver<RefreshCompletion>,

    event_publisher: broadcast::Sender<RefreshEvent>,

    source: Arc<dyn PlaylistSource>,
    store: CacheStore,
    cache_ttl: chrono::Duration,

    credentials: Option<Credentials>,
    refresh: RefreshState,
    last_status: RefreshStatus,
    last_error: Option<String>,
    last_successful_refresh: Option<DateTime<Utc>>,
    last_failure_at: Option<DateTime<Utc>>,
    cache: Option<Arc<CacheFile>>,
}

impl StateActor {
    /// Creates a new state actor.
    pub fn new(
        receiver: mpsc::Receiver<StateCommand>,
        event_publisher: broadcast::Sender<RefreshEvent>,
        parts: ActorParts,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_BUFFER);
        let cache = parts.cache.map(Arc::new);
        let (last_status, last_successful_refresh) = match &cache {
            Some(file) => (RefreshStatus::Success, Some(file.timestamp)),
            None => (RefreshStatus::Missing, None),
        };
        let cache_ttl = chrono::Duration::from_std(parts.cache_ttl)
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));

        Self {
            receiver,
            completion_tx,
            completion_rx,
            event_publisher,
            source: parts.source,
            store: parts.store,
            cache_ttl,
            credentials: parts.credentials,
            refresh: RefreshState::Idle,
            last_status,
            last_error: None,
            last_successful_refresh,
            last_failure_at: None,
            cache,
        }
    }

    /// Runs the actor event loop until every command sender is dropped.
    pub async fn run(mut self) {
        info!(
            logged_in = self.credentials.is_some(),
            cached_channels = self.cache.as_ref().map(|c| c.channel_count).unwrap_or(0),
            "State actor starting"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(done) = self.completion_rx.recv() => {
                    self.handle_completion(done);
                }
            }
        }

        info!("State actor stopped");
    }

    fn handle_command(&mut self, cmd: StateCommand) {
        match cmd {
            StateCommand::Login {
                credentials,
                respond_to,
            } => {
                let result = self.handle_login(credentials);
                let _ = respond_to.send(result);
            }
            StateCommand::Logout { respond_to } => {
                self.handle_logout();
                let _ = respond_to.send(());
            }
            StateCommand::StartRefresh {
                trigger,
                respond_to,
            } => {
                let result = self.handle_start_refresh(trigger);
                let _ = respond_to.send(result);
            }
            StateCommand::RefreshIfStale => {
                self.handle_refresh_if_stale(Utc::now());
            }
            StateCommand::GetStatus { respond_to } => {
                let _ = respond_to.send(self.status());
            }
            StateCommand::GetCache { respond_to } => {
                let _ = respond_to.send(self.cache.clone());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_login(&mut self, credentials: Credentials) -> Result<(), StateError> {
        credentials.validate()?;
        info!(host = %credentials.host, user = %credentials.username, "Login accepted");
        self.credentials = Some(credentials);
        Ok(())
    }

    fn handle_logout(&mut self) {
        if let Some(previous) = self.credentials.take() {
            info!(host = %previous.host, "Logged out");
        }
    }

    fn handle_start_refresh(
        &mut self,
        trigger: RefreshTrigger,
    ) -> Result<DateTime<Utc>, StateError> {
        let Some(credentials) = self.credentials.clone() else {
            info!(%trigger, "Refresh rejected: not logged in");
            return Err(StateError::NotLoggedIn);
        };
        if let RefreshState::Running { started_at, .. } = self.refresh {
            info!(%trigger, %started_at, "Refresh rejected: already refreshing");
            return Err(StateError::AlreadyRefreshing);
        }

        let started_at = Utc::now();
        self.refresh = RefreshState::Running {
            started_at,
            trigger,
        };
        self.last_status = RefreshStatus::Loading;

        info!(%trigger, host = %credentials.host, "Refresh started");
        let _ = self.event_publisher.send(RefreshEvent::Started {
            trigger,
            host: credentials.host.clone(),
            started_at,
        });

        self.spawn_job(trigger, credentials);
        Ok(started_at)
    }

    /// Spawns the refresh job. A panicking job is reported as a failure so
    /// the refreshing flag is always cleared.
    fn spawn_job(&self, trigger: RefreshTrigger, credentials: Credentials) {
        let source = Arc::clone(&self.source);
        let store = self.store.clone();
        let completion_tx = self.completion_tx.clone();

        tokio::spawn(async move {
            let job = tokio::spawn(async move {
                run_refresh(source.as_ref(), &store, &credentials).await
            });
            let result = match job.await {
                Ok(result) => result,
                Err(e) => Err(RefreshError::Task(e.to_string())),
            };
            if completion_tx
                .send(RefreshCompletion { trigger, result })
                .await
                .is_err()
            {
                debug!("Refresh finished after state actor stopped");
            }
        });
    }

    fn handle_completion(&mut self, done: RefreshCompletion) {
        let now = Utc::now();
        let started_at = match self.refresh {
            RefreshState::Running { started_at, .. } => started_at,
            RefreshState::Idle => {
                warn!("Refresh completion received while idle");
                now
            }
        };
        self.refresh = RefreshState::Idle;
        let elapsed_ms = (now - started_at).num_milliseconds();

        let outcome = match done.result {
            Ok(file) => {
                let count = file.channel_count;
                info!(
                    trigger = %done.trigger,
                    channels = count,
                    elapsed_ms,
                    "Refresh finished"
                );
                self.last_status = RefreshStatus::Success;
                self.last_error = None;
                self.last_failure_at = None;
                self.last_successful_refresh = Some(file.timestamp);
                self.cache = Some(file);
                Ok(count)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    trigger = %done.trigger,
                    error = %message,
                    elapsed_ms,
                    kept_cache = self.cache.is_some(),
                    "Refresh failed"
                );
                self.last_status = RefreshStatus::Failed;
                self.last_error = Some(message.clone());
                self.last_failure_at = Some(now);
                Err(message)
            }
        };

        let _ = self.event_publisher.send(RefreshEvent::Finished {
            trigger: done.trigger,
            finished_at: now,
            outcome,
        });
    }

    fn handle_refresh_if_stale(&mut self, now: DateTime<Utc>) {
        let Some(credentials) = &self.credentials else {
            return;
        };
        if matches!(self.refresh, RefreshState::Running { .. }) {
            return;
        }
        if let Some(failed_at) = self.last_failure_at {
            if now < failed_at + chrono::Duration::seconds(STALE_RETRY_BACKOFF_SECS) {
                debug!(%failed_at, "Skipping staleness refresh after recent failure");
                return;
            }
        }

        let stale = match &self.cache {
            None => true,
            Some(file) => !file.is_fresh(&credentials.host, self.cache_ttl, now),
        };
        if !stale {
            return;
        }

        debug!("Channel cache is stale");
        if let Err(e) = self.handle_start_refresh(RefreshTrigger::Stale) {
            debug!(error = %e, "Staleness refresh not started");
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn status(&self) -> StatusSnapshot {
        let (refreshing, refresh_started_at) = match self.refresh {
            RefreshState::Running { started_at, .. } => (true, Some(started_at)),
            RefreshState::Idle => (false, None),
        };

        StatusSnapshot {
            logged_in: self.credentials.is_some(),
            refreshing,
            cache_available: self.cache.is_some(),
            channel_count: self.cache.as_ref().map(|c| c.channel_count).unwrap_or(0),
            last_refresh: self.cache.as_ref().map(|c| c.timestamp),
            refresh_started_at,
            refresh_status: self.last_status,
            last_error: self.last_error.clone(),
            last_successful_refresh: self.last_successful_refresh,
        }
    }
}
