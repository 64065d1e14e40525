//! In-memory backend for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use iptv_core::{ChannelStats, Credentials, StatusSnapshot};
use iptv_protocol::{ChannelListResponse, ChannelQuery};

use crate::client::BackendApi;
use crate::error::ClientError;

/// Scriptable fake backend.
///
/// Status calls return queued results first, then the current status.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    status_calls: AtomicUsize,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

#[derive(Default)]
struct FakeState {
    status: StatusSnapshot,
    queued: VecDeque<Result<StatusSnapshot, ClientError>>,
    status_delay: Option<Duration>,
    login_result: Option<ClientError>,
    refresh_results: VecDeque<Result<(), ClientError>>,
    refresh_delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_status(status: StatusSnapshot) -> Arc<Self> {
        let fake = Self::new();
        fake.set_status(status);
        fake
    }

    pub fn set_status(&self, status: StatusSnapshot) {
        self.state.lock().unwrap().status = status;
    }

    pub fn queue_status(&self, result: Result<StatusSnapshot, ClientError>) {
        self.state.lock().unwrap().queued.push_back(result);
    }

    pub fn set_status_delay(&self, delay: Duration) {
        self.state.lock().unwrap().status_delay = Some(delay);
    }

    pub fn fail_login(&self, error: ClientError) {
        self.state.lock().unwrap().login_result = Some(error);
    }

    pub fn queue_refresh(&self, result: Result<(), ClientError>) {
        self.state.lock().unwrap().refresh_results.push_back(result);
    }

    /// Delays the refresh response; the backend only starts refreshing
    /// once the delay has passed.
    pub fn set_refresh_delay(&self, delay: Duration) {
        self.state.lock().unwrap().refresh_delay = Some(delay);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn status(&self) -> Result<StatusSnapshot, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().unwrap().status_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        match state.queued.pop_front() {
            Some(result) => result,
            None => Ok(state.status.clone()),
        }
    }

    async fn login(&self, _credentials: &Credentials) -> Result<(), ClientError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        match state.login_result.take() {
            Some(err) => Err(err),
            None => {
                state.status.logged_in = true;
                Ok(())
            }
        }
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().status.logged_in = false;
        Ok(())
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().unwrap().refresh_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        let result = state.refresh_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            state.status.refreshing = true;
            state.status.refresh_started_at = Some(Utc::now());
        }
        result
    }

    async fn channels(&self, query: &ChannelQuery) -> Result<ChannelListResponse, ClientError> {
        let page = query
            .validate()
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        Ok(ChannelListResponse::empty(page.page, page.page_size, false))
    }

    async fn stats(&self) -> Result<ChannelStats, ClientError> {
        Ok(ChannelStats::default())
    }
}

/// A logged-in snapshot with a populated cache.
pub fn ready_snapshot(channel_count: u64) -> StatusSnapshot {
    let now = Utc::now();
    StatusSnapshot {
        logged_in: true,
        cache_available: true,
        channel_count,
        last_refresh: Some(now),
        last_successful_refresh: Some(now),
        refresh_status: iptv_core::RefreshStatus::Success,
        ..StatusSnapshot::default()
    }
}

/// A logged-in snapshot with a refresh running.
pub fn refreshing_snapshot() -> StatusSnapshot {
    StatusSnapshot {
        logged_in: true,
        refreshing: true,
        refresh_started_at: Some(Utc::now()),
        refresh_status: iptv_core::RefreshStatus::Loading,
        ..StatusSnapshot::default()
    }
}

/// Logged in, nothing cached, nothing running.
pub fn empty_cache_snapshot() -> StatusSnapshot {
    StatusSnapshot {
        logged_in: true,
        ..StatusSnapshot::default()
    }
}
