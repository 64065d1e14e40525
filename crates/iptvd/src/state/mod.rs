//! Backend state using the actor pattern.
//!
//! The state actor is the only owner of credentials, refresh status and the
//! in-memory channel cache. HTTP handlers talk to it through a
//! [`StateHandle`]; refresh jobs report back to it over a private channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐ StateCommand ┌─────────────────┐ RefreshEvent ┌──────────────┐
//! │  HTTP handlers  │─────────────▶│   StateActor    │─────────────▶│  broadcast   │
//! └─────────────────┘   (mpsc)     └───────┬─────────┘              └──────────────┘
//! ┌─────────────────┐                      │ spawn          ▲
//! │ staleness ticker│── RefreshIfStale     ▼                │ completion
//! └─────────────────┘              ┌─────────────────┐      │
//!                                  │   refresh job   │──────┘
//!                                  └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()` or `.expect()` in production code
//! - Channel operations handle closure gracefully

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, warn};

use iptv_core::Credentials;

use crate::cache::CacheStore;
use crate::source::PlaylistSource;

mod actor;
mod commands;
mod handle;

pub use actor::{ActorParts, StateActor, STALE_RETRY_BACKOFF_SECS};
pub use commands::{RefreshEvent, StateCommand, StateError};
pub use handle::StateHandle;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 100;
const EVENT_BUFFER: usize = 32;

/// Default period of the staleness check.
pub const DEFAULT_STALE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Settings for [`spawn_state`].
pub struct StateConfig {
    pub source: Arc<dyn PlaylistSource>,
    pub store: CacheStore,
    /// How long a cache stays fresh.
    pub cache_ttl: Duration,
    /// Credentials to start logged in with.
    pub credentials: Option<Credentials>,
    /// Period of the staleness check. `None` disables it.
    pub stale_check_interval: Option<Duration>,
}

/// Spawns the state actor and returns a handle for interaction.
///
/// This function:
/// 1. Loads the cache file from disk (a read failure is logged and ignored)
/// 2. Creates command and event channels
/// 3. Spawns the StateActor on a tokio task
/// 4. Spawns the staleness ticker, if enabled
///
/// Must be called from within a tokio runtime.
pub fn spawn_state(config: StateConfig) -> StateHandle {
    let cache = match config.store.load() {
        Ok(cache) => cache,
        Err(e) => {
            warn!(error = %e, "Failed to read channel cache, starting empty");
            None
        }
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = StateActor::new(
        cmd_rx,
        event_tx.clone(),
        ActorParts {
            source: config.source,
            store: config.store,
            cache_ttl: config.cache_ttl,
            credentials: config.credentials,
            cache,
        },
    );
    tokio::spawn(actor.run());

    if let Some(period) = config.stale_check_interval {
        spawn_staleness_task(&cmd_tx, period);
    }

    StateHandle::new(cmd_tx, event_tx)
}

/// Spawns a background task that periodically asks the actor to refresh a
/// stale cache.
///
/// The task holds only a weak sender, so it stops once every handle is
/// dropped.
fn spawn_staleness_task(sender: &mpsc::Sender<StateCommand>, period: Duration) {
    let weak = sender.downgrade();

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(sender) = weak.upgrade() else {
                debug!("Staleness task stopping: state handles dropped");
                break;
            };
            if sender.send(StateCommand::RefreshIfStale).await.is_err() {
                debug!("Staleness task stopping: state channel closed");
                break;
            }
        }
    });
}
