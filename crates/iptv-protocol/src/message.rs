//! Request and response bodies for the backend HTTP API.
//!
//! `POST /login` takes an [`iptv_core::Credentials`] body and `GET /status`
//! returns an [`iptv_core::StatusSnapshot`]; both live in `iptv-core` since
//! the client state machine works with them directly.

use std::collections::BTreeMap;

use iptv_core::{Channel, ChannelCategory};
use serde::{Deserialize, Serialize};

/// Acknowledgement body: `{"status": "ok"}` or `{"status": "started"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub status: String,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// Returned by `POST /refresh` once the job has been spawned.
    pub fn started() -> Self {
        Self {
            status: "started".to_string(),
        }
    }
}

/// Error body used for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// One page of channels from `GET /channels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelListResponse {
    pub channels: Vec<Channel>,
    /// Number of channels matching the filters, across all pages.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    /// False when the backend has no cache at all.
    #[serde(default)]
    pub cached: bool,
}

impl ChannelListResponse {
    /// Empty page, returned when there is no cache or no match is possible.
    pub fn empty(page: u32, page_size: u32, cached: bool) -> Self {
        Self {
            channels: Vec::new(),
            total: 0,
            page,
            page_size,
            cached,
        }
    }

    /// Number of pages needed for `total` results (at least 1).
    pub fn page_count(&self) -> u64 {
        let size = u64::from(self.page_size.max(1));
        self.total.div_ceil(size).max(1)
    }
}

/// Body of `GET /groups`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupsResponse {
    pub categories: Vec<ChannelCategory>,
    /// Raw group title to channel count.
    pub groups: BTreeMap<String, u64>,
}
