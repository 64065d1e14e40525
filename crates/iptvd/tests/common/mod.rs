//! Shared helpers for iptvd integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};

use iptv_core::{Credentials, StatusSnapshot};
use iptvd::cache::CacheStore;
use iptvd::refresh::RefreshError;
use iptvd::source::PlaylistSource;
use iptvd::state::{spawn_state, StateConfig, StateHandle};

pub const PLAYLIST: &str = "#EXTM3U
#EXTINF:-1 tvg-id=\"bbc1\" group-title=\"UK | News\",BBC One
http://stream.example/1
#EXTINF:-1 group-title=\"VOD | Movies\",The Matrix
http://stream.example/2
#EXTINF:-1 group-title=\"Series\",Breaking Bad S01E01
http://stream.example/3
#EXTINF:-1 group-title=\"Sports\",Sky Sports
http://stream.example/4
";

/// What one scripted fetch returns.
#[derive(Debug, Clone)]
pub enum Outcome {
    Body(&'static str),
    Status(u16),
    Timeout,
}

/// A playlist source that replays scripted outcomes.
///
/// When gated, every fetch waits for [`ScriptedSource::release`] before
/// returning, which keeps a refresh running for as long as a test needs.
pub struct ScriptedSource {
    outcomes: Mutex<VecDeque<Outcome>>,
    gate: Option<Notify>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// A source with nothing scripted; every fetch fails with HTTP 500.
    pub fn empty() -> Arc<Self> {
        Self::new(Vec::<Outcome>::new())
    }

    pub fn gated(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            gate: Some(Notify::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Lets one waiting (or the next) fetch finish.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaylistSource for ScriptedSource {
    async fn fetch(&self, _credentials: &Credentials) -> Result<String, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Status(500));
        match outcome {
            Outcome::Body(body) if body.trim().is_empty() => Err(RefreshError::EmptyPlaylist),
            Outcome::Body(body) => Ok(body.to_string()),
            Outcome::Status(code) => Err(RefreshError::HttpStatus(code)),
            Outcome::Timeout => Err(RefreshError::Timeout),
        }
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("tv.example", "alice", "secret")
}

/// Spawns a state actor with the staleness ticker disabled.
pub fn spawn_test_state(source: Arc<ScriptedSource>, dir: &TempDir) -> StateHandle {
    spawn_state(StateConfig {
        source,
        store: CacheStore::new(dir.path()),
        cache_ttl: Duration::from_secs(3600),
        credentials: None,
        stale_check_interval: None,
    })
}

/// Polls status until `done` holds, or panics after two seconds.
pub async fn wait_for_status(
    handle: &StateHandle,
    done: impl Fn(&StatusSnapshot) -> bool,
) -> StatusSnapshot {
    timeout(Duration::from_secs(2), async {
        loop {
            let status = handle.status().await.expect("status");
            if done(&status) {
                return status;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("status condition not reached in time")
}
