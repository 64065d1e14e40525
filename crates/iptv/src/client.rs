//! HTTP client for the IPTV backend.
//!
//! `BackendApi` is the seam between the session machinery and the network:
//! the terminal uses [`BackendClient`] (reqwest), tests use in-memory fakes.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()` outside tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use iptv_core::{ChannelStats, Credentials, StatusSnapshot};
use iptv_protocol::{AckResponse, ChannelListResponse, ChannelQuery, ErrorBody};

use crate::error::ClientError;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

// ============================================================================
// Configuration
// ============================================================================

/// Client settings.
///
/// # Example
///
/// ```rust
/// use iptv_tui::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig {
///     backend_url: "http://10.0.0.5:8000".to_string(),
///     request_timeout: Duration::from_secs(2),
///     ..Default::default()
/// };
/// assert_eq!(config.poll_interval, Duration::from_millis(2000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing slash.
    pub backend_url: String,

    /// Upper bound for any single backend call.
    pub request_timeout: Duration,

    /// Status polling period while a refresh runs.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// ============================================================================
// Backend API
// ============================================================================

/// Backend operations used by the client.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `GET /status`
    async fn status(&self) -> Result<StatusSnapshot, ClientError>;

    /// `POST /login`
    async fn login(&self, credentials: &Credentials) -> Result<(), ClientError>;

    /// `POST /logout`
    async fn logout(&self) -> Result<(), ClientError>;

    /// `POST /refresh`. Returns once the refresh has been accepted, not
    /// when it finishes.
    async fn refresh(&self) -> Result<(), ClientError>;

    /// `GET /channels`
    async fn channels(&self, query: &ChannelQuery) -> Result<ChannelListResponse, ClientError>;

    /// `GET /stats`
    async fn stats(&self) -> Result<ChannelStats, ClientError>;
}

// ============================================================================
// Backend Client
// ============================================================================

/// `BackendApi` over HTTP.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Creates a client for `config.backend_url`.
    ///
    /// # Errors
    ///
    /// `ClientError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_ack(&self, path: &str, body: Option<&Credentials>) -> Result<(), ClientError> {
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(transport_error)?;
        let ack: AckResponse = decode(response).await?;
        debug!(path, status = %ack.status, "Backend acknowledged");
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await.map_err(transport_error)?;
        decode(response).await
    }
}

#[async_trait]
impl BackendApi for BackendClient {
    async fn status(&self) -> Result<StatusSnapshot, ClientError> {
        self.get_json(self.http.get(self.url("/status"))).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), ClientError> {
        self.post_ack("/login", Some(credentials)).await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.post_ack("/logout", None).await
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        self.post_ack("/refresh", None).await
    }

    async fn channels(&self, query: &ChannelQuery) -> Result<ChannelListResponse, ClientError> {
        self.get_json(self.http.get(self.url("/channels")).query(query))
            .await
    }

    async fn stats(&self) -> Result<ChannelStats, ClientError> {
        self.get_json(self.http.get(self.url("/stats"))).await
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    ClientError::transport(err.to_string())
}

/// Maps a response to a body or a `ClientError`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(e)
            } else {
                ClientError::Protocol(e.to_string())
            }
        });
    }

    let detail = response.json::<ErrorBody>().await.ok().map(|body| body.detail);
    Err(error_for_status(status, detail))
}

fn error_for_status(status: StatusCode, detail: Option<String>) -> ClientError {
    match (status, detail) {
        (StatusCode::CONFLICT, Some(detail)) => ClientError::Rejected(detail),
        (StatusCode::UNPROCESSABLE_ENTITY, Some(detail)) => ClientError::Validation(detail),
        (status, Some(detail)) => ClientError::Protocol(format!("HTTP {}: {detail}", status.as_u16())),
        (status, None) => ClientError::Protocol(format!("HTTP {}", status.as_u16())),
    }
}
