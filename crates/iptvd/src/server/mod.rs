//! HTTP server for the IPTV backend.
//!
//! The server:
//! - Binds a TCP listener and serves the axum router
//! - Logs refresh events published by the state actor
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    ApiServer    │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ axum::serve
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │  route handlers │────▶│   StateHandle   │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Bind and serve failures surface as `ServerError`

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{debug_router, router};

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::state::{RefreshEvent, StateHandle};

/// HTTP API server.
pub struct ApiServer {
    bind: SocketAddr,
    state: StateHandle,
    cancel_token: CancellationToken,
    diagnostics: Option<CacheStore>,
}

impl ApiServer {
    pub fn new(bind: SocketAddr, state: StateHandle, cancel_token: CancellationToken) -> Self {
        Self {
            bind,
            state,
            cancel_token,
            diagnostics: None,
        }
    }

    /// Enables `/debug/cache`, reporting on `store`.
    pub fn with_diagnostics(mut self, store: CacheStore) -> Self {
        self.diagnostics = Some(store);
        self
    }

    /// Binds the listener and serves until the cancellation token fires.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|e| ServerError::Bind {
                addr: self.bind,
                error: e.to_string(),
            })?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr().unwrap_or(self.bind);
        info!(addr = %addr, "API server listening");

        self.spawn_event_logger();

        let app = match &self.diagnostics {
            Some(store) => {
                info!(cache = %store.path().display(), "Debug diagnostics enabled");
                debug_router(self.state.clone(), store.clone())
            }
            None => router(self.state.clone()),
        };

        let shutdown = self.cancel_token.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("Server shutdown requested");
            })
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        info!("API server stopped");
        Ok(())
    }

    /// Logs refresh events until shutdown.
    fn spawn_event_logger(&self) {
        let mut event_rx = self.state.subscribe();
        let cancel_token = self.cancel_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("Event logger shutting down");
                        break;
                    }

                    result = event_rx.recv() => {
                        match result {
                            Ok(event) => log_event(&event),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!(skipped = n, "Event logger lagged, skipped events");
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                debug!("Event channel closed");
                                break;
                            }
                        }
                    }
                }
            }
        });
    }
}

fn log_event(event: &RefreshEvent) {
    match event {
        RefreshEvent::Started {
            trigger,
            host,
            started_at,
        } => {
            info!(%trigger, %host, %started_at, "[REFRESH] started");
        }
        RefreshEvent::Finished {
            trigger,
            finished_at,
            outcome: Ok(channels),
        } => {
            info!(%trigger, %finished_at, channels, "[REFRESH] succeeded");
        }
        RefreshEvent::Finished {
            trigger,
            finished_at,
            outcome: Err(error),
        } => {
            warn!(%trigger, %finished_at, %error, "[REFRESH] failed");
        }
    }
}

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Server error: {0}")]
    Serve(String),
}
