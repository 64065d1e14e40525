//! IPTV Protocol - Wire contract for the backend HTTP API
//!
//! This crate provides the JSON bodies exchanged between the backend
//! (`iptvd`) and its clients, channel query validation and pagination,
//! and the M3U playlist parser used when a refresh runs.

pub mod message;
pub mod playlist;
pub mod query;

pub use message::{AckResponse, ChannelListResponse, ErrorBody, GroupsResponse};
pub use playlist::{build_m3u_url, parse_m3u};
pub use query::{
    CategoryFilter, ChannelPage, ChannelQuery, QueryError, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
