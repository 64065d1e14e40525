//! Integration tests for the state actor and refresh orchestration.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use tokio::time::timeout;

use iptv_core::{Credentials, RefreshStatus};
use iptvd::cache::{CacheFile, CacheStore};
use iptvd::refresh::RefreshTrigger;
use iptvd::state::{spawn_state, RefreshEvent, StateConfig, StateError};

use common::{credentials, spawn_test_state, wait_for_status, Outcome, ScriptedSource, PLAYLIST};

// ============================================================================
// Login / Logout
// ============================================================================

#[tokio::test]
async fn test_cold_start_is_logged_out() {
    let dir = TempDir::new().unwrap();
    let handle = spawn_test_state(ScriptedSource::empty(), &dir);

    let status = handle.status().await.unwrap();
    assert!(!status.logged_in);
    assert!(!status.refreshing);
    assert!(!status.cache_available);
    assert_eq!(status.refresh_status, RefreshStatus::Missing);
}

#[tokio::test]
async fn test_login_then_logout() {
    let dir = TempDir::new().unwrap();
    let handle = spawn_test_state(ScriptedSource::empty(), &dir);

    handle.login(credentials()).await.unwrap();
    assert!(handle.status().await.unwrap().logged_in);

    handle.logout().await.unwrap();
    assert!(!handle.status().await.unwrap().logged_in);
}

#[tokio::test]
async fn test_login_rejects_invalid_credentials() {
    let dir = TempDir::new().unwrap();
    let handle = spawn_test_state(ScriptedSource::empty(), &dir);

    let err = handle
        .login(Credentials::new("tv.example", "  ", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, StateError::InvalidCredentials(_)));
    assert!(!handle.status().await.unwrap().logged_in);
}

// ============================================================================
// Refresh Guard
// ============================================================================

#[tokio::test]
async fn test_refresh_without_login_is_rejected() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new([Outcome::Body(PLAYLIST)]);
    let handle = spawn_test_state(Arc::clone(&source), &dir);

    let err = handle.start_refresh(RefreshTrigger::Manual).await.unwrap_err();
    assert_eq!(err, StateError::NotLoggedIn);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_refreshes_single_flight() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::gated([Outcome::Body(PLAYLIST)]);
    let handle = spawn_test_state(Arc::clone(&source), &dir);
    handle.login(credentials()).await.unwrap();

    let (a, b) = tokio::join!(
        handle.start_refresh(RefreshTrigger::Manual),
        handle.start_refresh(RefreshTrigger::Manual),
    );
    let accepted = [&a, &b].iter().filter(|r| r.is_ok()).count();
    let rejected = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(StateError::AlreadyRefreshing)))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(rejected, 1);

    let running = handle.status().await.unwrap();
    assert!(running.refreshing);
    assert!(running.refresh_started_at.is_some());
    assert_eq!(running.refresh_status, RefreshStatus::Loading);

    source.release();
    let done = wait_for_status(&handle, |s| !s.refreshing).await;
    assert_eq!(done.refresh_status, RefreshStatus::Success);
    assert_eq!(done.channel_count, 4);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_successful_refresh_populates_cache() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new([Outcome::Body(PLAYLIST)]);
    let handle = spawn_test_state(source, &dir);
    handle.login(credentials()).await.unwrap();

    handle.start_refresh(RefreshTrigger::Manual).await.unwrap();
    let status = wait_for_status(&handle, |s| !s.refreshing).await;

    assert!(status.cache_available);
    assert!(status.last_refresh.is_some());
    assert_eq!(status.last_refresh, status.last_successful_refresh);
    assert!(status.last_error.is_none());
    assert!(status.validate().is_ok());

    let cache = handle.cache().await.unwrap();
    assert_eq!(cache.host, "tv.example");
    assert_eq!(cache.stats.total, 4);

    let on_disk = CacheStore::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(on_disk.channel_count, 4);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_cache() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new([Outcome::Body(PLAYLIST), Outcome::Status(503)]);
    let handle = spawn_test_state(source, &dir);
    handle.login(credentials()).await.unwrap();

    handle.start_refresh(RefreshTrigger::Manual).await.unwrap();
    let first = wait_for_status(&handle, |s| !s.refreshing).await;

    handle.start_refresh(RefreshTrigger::Manual).await.unwrap();
    let second = wait_for_status(&handle, |s| !s.refreshing).await;

    assert_eq!(second.refresh_status, RefreshStatus::Failed);
    assert_eq!(
        second.last_error.as_deref(),
        Some("IPTV server returned HTTP 503")
    );
    assert!(second.cache_available);
    assert_eq!(second.channel_count, 4);
    assert_eq!(second.last_refresh, first.last_refresh);
    assert_eq!(second.last_successful_refresh, first.last_successful_refresh);

    let on_disk = CacheStore::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(Some(on_disk.timestamp), first.last_refresh);
}

#[tokio::test]
async fn test_empty_playlist_is_failure() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new([Outcome::Body("   \n")]);
    let handle = spawn_test_state(source, &dir);
    handle.login(credentials()).await.unwrap();

    handle.start_refresh(RefreshTrigger::Manual).await.unwrap();
    let status = wait_for_status(&handle, |s| !s.refreshing).await;

    assert_eq!(status.refresh_status, RefreshStatus::Failed);
    assert!(!status.cache_available);
    assert_eq!(
        status.last_error.as_deref(),
        Some("Empty M3U playlist received from IPTV provider")
    );
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new([Outcome::Timeout, Outcome::Body(PLAYLIST)]);
    let handle = spawn_test_state(source, &dir);
    handle.login(credentials()).await.unwrap();

    handle.start_refresh(RefreshTrigger::Manual).await.unwrap();
    let failed = wait_for_status(&handle, |s| !s.refreshing).await;
    assert_eq!(failed.last_error.as_deref(), Some("IPTV request timed out"));

    handle.start_refresh(RefreshTrigger::Manual).await.unwrap();
    let ok = wait_for_status(&handle, |s| !s.refreshing).await;
    assert!(ok.last_error.is_none());
    assert_eq!(ok.refresh_status, RefreshStatus::Success);
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_refresh_events_published() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new([Outcome::Body(PLAYLIST)]);
    let handle = spawn_test_state(source, &dir);
    let mut events = handle.subscribe();
    handle.login(credentials()).await.unwrap();

    handle.start_refresh(RefreshTrigger::Manual).await.unwrap();

    let started = timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        started,
        RefreshEvent::Started { trigger: RefreshTrigger::Manual, ref host, .. } if host == "tv.example"
    ));

    let finished = timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        finished,
        RefreshEvent::Finished { outcome: Ok(4), .. }
    ));
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_startup_loads_cache_from_disk() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::new(dir.path());
    let file = CacheFile::build(
        "tv.example",
        iptv_protocol::parse_m3u(PLAYLIST),
        Utc::now(),
    );
    store.save(&file).unwrap();

    let handle = spawn_test_state(ScriptedSource::empty(), &dir);
    let status = handle.status().await.unwrap();

    assert!(!status.logged_in);
    assert!(status.cache_available);
    assert_eq!(status.channel_count, 4);
    assert_eq!(status.refresh_status, RefreshStatus::Success);
    assert_eq!(status.last_refresh, Some(file.timestamp));
}

#[tokio::test]
async fn test_auto_login_and_staleness_refresh() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new([Outcome::Body(PLAYLIST)]);
    let handle = spawn_state(StateConfig {
        source: source.clone(),
        store: CacheStore::new(dir.path()),
        cache_ttl: Duration::from_secs(3600),
        credentials: Some(credentials()),
        stale_check_interval: Some(Duration::from_millis(20)),
    });

    let status = wait_for_status(&handle, |s| s.cache_available && !s.refreshing).await;
    assert!(status.logged_in);
    assert_eq!(status.channel_count, 4);
    assert_eq!(source.calls(), 1);

    // A fresh cache is not refreshed again.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_staleness_refresh_for_other_host() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::new(dir.path());
    store
        .save(&CacheFile::build("old.example", Vec::new(), Utc::now()))
        .unwrap();

    let source = ScriptedSource::new([Outcome::Body(PLAYLIST)]);
    let handle = spawn_state(StateConfig {
        source: source.clone(),
        store,
        cache_ttl: Duration::from_secs(3600),
        credentials: Some(credentials()),
        stale_check_interval: Some(Duration::from_millis(20)),
    });

    wait_for_status(&handle, |s| s.channel_count == 4 && !s.refreshing).await;
    assert_eq!(handle.cache().await.unwrap().host, "tv.example");
}
