//! Playlist download from the IPTV provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION, USER_AGENT};
use reqwest::StatusCode;
use tracing::debug;

use iptv_core::Credentials;
use iptv_protocol::build_m3u_url;

use crate::refresh::RefreshError;

/// Upper bound on a single playlist download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// User agent accepted by common IPTV panels.
const PROVIDER_USER_AGENT: &str = "IPTVSmartersPro";

/// Where playlists come from.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Downloads the raw M3U text for `credentials`.
    ///
    /// # Errors
    ///
    /// A `RefreshError` whose message is fit to show to the user.
    async fn fetch(&self, credentials: &Credentials) -> Result<String, RefreshError>;
}

/// Downloads playlists over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPlaylistSource {
    client: reqwest::Client,
}

impl HttpPlaylistSource {
    /// Creates a source with the given per-request timeout.
    ///
    /// With `verify_ssl = false` invalid certificates are accepted, which
    /// some providers need for self-signed panels.
    pub fn new(timeout: Duration, verify_ssl: bool) -> Result<Self, RefreshError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(PROVIDER_USER_AGENT));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .map_err(|e| RefreshError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PlaylistSource for HttpPlaylistSource {
    async fn fetch(&self, credentials: &Credentials) -> Result<String, RefreshError> {
        let url = build_m3u_url(credentials);
        debug!(host = %credentials.normalized_host(), "Playlist download start");

        let response = self.client.get(&url).send().await.map_err(map_request_error)?;

        let status = response.status();
        debug!(status = status.as_u16(), "Playlist response received");
        if status != StatusCode::OK {
            return Err(RefreshError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(map_request_error)?;
        if body.trim().is_empty() {
            return Err(RefreshError::EmptyPlaylist);
        }

        debug!(bytes = body.len(), "Playlist download complete");
        Ok(body)
    }
}

fn map_request_error(err: reqwest::Error) -> RefreshError {
    if err.is_timeout() {
        RefreshError::Timeout
    } else if err.is_connect() {
        RefreshError::Connection
    } else {
        RefreshError::Request(err.to_string())
    }
}
