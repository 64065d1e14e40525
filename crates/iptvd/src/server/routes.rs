//! Route handlers.
//!
//! Handlers are thin: they decode the request, ask the state actor, and
//! shape the response. All state transitions happen inside the actor.
//!
//! `/debug/cache` answers 404 unless the router was built with diagnostics.

use std::process;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRef, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::debug;

use iptv_core::{ChannelStats, Credentials, StatusSnapshot};
use iptv_protocol::{AckResponse, ChannelListResponse, ChannelQuery, GroupsResponse};

use super::error::ApiError;
use crate::cache::CacheStore;
use crate::refresh::RefreshTrigger;
use crate::state::StateHandle;

#[derive(Clone)]
struct ApiState {
    state: StateHandle,
    /// Set when debug diagnostics are enabled.
    diagnostics: Option<CacheStore>,
}

impl FromRef<ApiState> for StateHandle {
    fn from_ref(api: &ApiState) -> Self {
        api.state.clone()
    }
}

/// Builds the API router over a state handle.
pub fn router(state: StateHandle) -> Router {
    build(ApiState {
        state,
        diagnostics: None,
    })
}

/// Builds the API router with `/debug/cache` reporting on `store`.
pub fn debug_router(state: StateHandle, store: CacheStore) -> Router {
    build(ApiState {
        state,
        diagnostics: Some(store),
    })
}

fn build(api: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/status", get(status))
        .route("/channels", get(channels))
        .route("/stats", get(stats))
        .route("/groups", get(groups))
        .route("/debug/cache", get(debug_cache))
        .layer(CorsLayer::permissive())
        .with_state(api)
}

async fn health() -> Json<AckResponse> {
    Json(AckResponse::ok())
}

async fn login(
    State(state): State<StateHandle>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AckResponse>, ApiError> {
    let Json(credentials) = body.map_err(login_rejection)?;
    state.login(credentials).await?;
    Ok(Json(AckResponse::ok()))
}

fn login_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::BytesRejection(e) => ApiError::Internal(e.body_text()),
        other => ApiError::Validation(other.body_text()),
    }
}

async fn logout(State(state): State<StateHandle>) -> Result<Json<AckResponse>, ApiError> {
    state.logout().await?;
    Ok(Json(AckResponse::ok()))
}

async fn refresh(State(state): State<StateHandle>) -> Result<Json<AckResponse>, ApiError> {
    state.start_refresh(RefreshTrigger::Manual).await?;
    Ok(Json(AckResponse::started()))
}

async fn status(State(state): State<StateHandle>) -> Result<Json<StatusSnapshot>, ApiError> {
    Ok(Json(state.status().await?))
}

async fn channels(
    State(state): State<StateHandle>,
    query: Result<Query<ChannelQuery>, QueryRejection>,
) -> Result<Json<ChannelListResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let page = query.validate()?;

    let Some(cache) = state.cache().await else {
        debug!("Channel list requested without cache");
        return Ok(Json(ChannelListResponse::empty(page.page, page.page_size, false)));
    };

    let (channels, total) = page.select(&cache.channels);
    Ok(Json(ChannelListResponse {
        channels,
        total,
        page: page.page,
        page_size: page.page_size,
        cached: true,
    }))
}

async fn stats(State(state): State<StateHandle>) -> Json<ChannelStats> {
    let stats = state
        .cache()
        .await
        .map(|cache| cache.stats)
        .unwrap_or_default();
    Json(stats)
}

async fn groups(State(state): State<StateHandle>) -> Json<GroupsResponse> {
    let groups = state
        .cache()
        .await
        .map(|cache| cache.groups())
        .unwrap_or_default();
    Json(groups)
}

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Serialize)]
struct CacheDiagnostics {
    cache_path: String,
    cache_exists: bool,
    cache_size_bytes: Option<u64>,
    cache_mtime: Option<DateTime<Utc>>,
    /// What the daemon holds in memory.
    loaded: LoadedCache,
    pid: u32,
    refreshing: bool,
    refresh_started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct LoadedCache {
    has_cache: bool,
    channel_count: u64,
    timestamp: Option<DateTime<Utc>>,
    host: Option<String>,
}

async fn debug_cache(State(api): State<ApiState>) -> Result<Json<CacheDiagnostics>, ApiError> {
    let Some(store) = api.diagnostics else {
        return Err(ApiError::NotFound);
    };

    let path = store.path();
    let metadata = tokio::fs::metadata(&path).await.ok();
    let status = api.state.status().await?;
    let cache = api.state.cache().await;

    Ok(Json(CacheDiagnostics {
        cache_path: path.display().to_string(),
        cache_exists: metadata.is_some(),
        cache_size_bytes: metadata.as_ref().map(|m| m.len()),
        cache_mtime: metadata
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from),
        loaded: LoadedCache {
            has_cache: cache.is_some(),
            channel_count: cache.as_ref().map_or(0, |c| c.channel_count),
            timestamp: cache.as_ref().map(|c| c.timestamp),
            host: cache.map(|c| c.host.clone()),
        },
        pid: process::id(),
        refreshing: status.refreshing,
        refresh_started_at: status.refresh_started_at,
    }))
}
