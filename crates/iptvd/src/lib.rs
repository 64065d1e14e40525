//! IPTV Backend - playlist refresh orchestrator and HTTP API
//!
//! This crate provides the backend infrastructure:
//! - `state` - State actor owning credentials, refresh state and the channel cache
//! - `cache` - On-disk channel cache with atomic writes
//! - `source` - Playlist download from the IPTV provider
//! - `refresh` - The fetch, parse and persist job
//! - `server` - HTTP API (axum)
//! - `config` - Backend configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        iptvd                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   ApiServer     │────▶│       StateActor            │   │
//! │  │  (axum routes)  │     │ (credentials, refresh, cache)│  │
//! │  └─────────────────┘     └──────┬───────────────┬──────┘   │
//! │                                 │ spawn         │ events    │
//! │                                 ▼               ▼           │
//! │                     ┌────────────────┐ ┌────────────────┐  │
//! │                     │  refresh job   │ │ broadcast::    │  │
//! │                     │ source → cache │ │ Sender         │  │
//! │                     └────────────────┘ └────────────────┘  │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod cache;
pub mod config;
pub mod refresh;
pub mod server;
pub mod source;
pub mod state;
