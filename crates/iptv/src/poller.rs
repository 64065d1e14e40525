//! Status polling.
//!
//! [`fetch_status`] is a single bounded status call. [`StatusPoller`] repeats
//! it on a fixed interval in a background task until it is cancelled or
//! dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use iptv_core::StatusSnapshot;

use crate::client::BackendApi;
use crate::error::ClientError;

// ============================================================================
// Sequence Numbers
// ============================================================================

/// Shared, monotonically increasing sequence numbers for status requests.
///
/// Cloning shares the counter. The first number handed out is 1.
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter(Arc<AtomicU64>);

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next number.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// The last number handed out, or 0.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Single Fetch
// ============================================================================

/// Fetches status, failing with a transport error after `limit`.
pub async fn fetch_status(
    api: &dyn BackendApi,
    limit: Duration,
) -> Result<StatusSnapshot, ClientError> {
    match timeout(limit, api.status()).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::transport(format!(
            "status request timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

/// Result of one poll.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub seq: u64,
    pub result: Result<StatusSnapshot, ClientError>,
}

// ============================================================================
// Status Poller
// ============================================================================

/// A running poll loop.
///
/// Polls are sequential, so at most one status call is outstanding. The
/// loop stops when [`StatusPoller::stop`] is called, when the poller is
/// dropped, or when the outcome receiver is gone.
#[derive(Debug)]
pub struct StatusPoller {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl StatusPoller {
    /// Starts polling. The first poll happens after one `period`.
    pub fn spawn(
        api: Arc<dyn BackendApi>,
        seq: SequenceCounter,
        period: Duration,
        request_timeout: Duration,
        outcomes: mpsc::UnboundedSender<PollOutcome>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            debug!(period_ms = period.as_millis() as u64, "Status poller started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let seq = seq.next();
                let result = tokio::select! {
                    _ = token.cancelled() => break,
                    result = fetch_status(api.as_ref(), request_timeout) => result,
                };

                if outcomes.send(PollOutcome { seq, result }).is_err() {
                    debug!("Poll receiver dropped");
                    break;
                }
            }
            debug!("Status poller stopped");
        });

        Self { cancel_token, task }
    }

    /// Stops polling. An in-flight call is abandoned.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        self.task.abort();
    }
}
