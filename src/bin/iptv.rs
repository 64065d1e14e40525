//! IPTV - terminal client for the IPTV aggregator backend
//!
//! # Usage
//!
//! ```text
//! iptv                                    # Backend on 127.0.0.1:8000
//! iptv --backend-url http://nas:8000      # Remote backend
//! IPTV_BACKEND_URL=http://nas:8000 iptv   # Same, from the environment
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use iptv_tui::app::App;
use iptv_tui::client::{
    BackendApi, BackendClient, ClientConfig, DEFAULT_BACKEND_URL, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT,
};
use iptv_tui::error::{Result as TuiResult, TuiError};
use iptv_tui::input::{handle_key_event, Action, Event};
use iptv_tui::session::{spawn_session, SessionHandle, SessionView};
use iptv_tui::ui;

// ============================================================================
// CLI Arguments
// ============================================================================

/// IPTV - browse and refresh your IPTV playlist from the terminal
#[derive(Parser, Debug)]
#[command(name = "iptv")]
#[command(about = "Terminal client for the IPTV aggregator backend")]
#[command(version)]
struct Args {
    /// Backend base URL
    #[arg(long, env = "IPTV_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Upper bound for any single backend call, in milliseconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_millis() as u64)]
    request_timeout_ms: u64,

    /// Status polling period while a refresh runs, in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    poll_interval_ms: u64,
}

impl Args {
    fn client_config(&self) -> Result<ClientConfig> {
        if self.request_timeout_ms == 0 {
            anyhow::bail!("--request-timeout-ms must be greater than 0");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("--poll-interval-ms must be greater than 0");
        }
        Ok(ClientConfig {
            backend_url: self.backend_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        })
    }
}

// ============================================================================
// Terminal Setup / Cleanup
// ============================================================================

fn setup_terminal() -> TuiResult<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| TuiError::TerminalInit(e.to_string()))
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> TuiResult<()> {
    disable_raw_mode().map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    terminal
        .show_cursor()
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    Ok(())
}

// ============================================================================
// Background Tasks
// ============================================================================

/// Waits up to 50ms for a terminal event the client cares about.
fn read_terminal_event() -> Option<Event> {
    if !event::poll(Duration::from_millis(50)).unwrap_or(false) {
        return None;
    }
    match event::read().ok()? {
        CrosstermEvent::Key(key) => Some(Event::Key(key)),
        CrosstermEvent::Resize(width, height) => Some(Event::Resize(width, height)),
        _ => None,
    }
}

fn spawn_keyboard_task(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while !cancel_token.is_cancelled() {
            match tokio::task::spawn_blocking(read_terminal_event).await {
                Ok(Some(event)) => {
                    if event_tx.send(event).is_err() {
                        debug!("Event loop gone, keyboard task exiting");
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Terminal reader panicked");
                    return;
                }
            }
        }
        debug!("Keyboard task shutting down");
    })
}

/// Forwards every session view change into the event loop.
fn spawn_session_forwarder(
    mut views: watch::Receiver<SessionView>,
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let view = views.borrow_and_update().clone();
            if event_tx.send(Event::Session(view)).is_err() {
                break;
            }
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                changed = views.changed() => {
                    if changed.is_err() {
                        debug!("Session task ended");
                        break;
                    }
                }
            }
        }
    })
}

/// Loads the current channel page and, if asked, the stats.
fn spawn_dashboard_load(
    api: &Arc<dyn BackendApi>,
    app: &mut App,
    with_stats: bool,
    event_tx: &mpsc::UnboundedSender<Event>,
) {
    let (seq, query) = app.begin_channel_load();
    debug!(seq, ?query, "Loading channels");

    let channels_api = Arc::clone(api);
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let result = channels_api.channels(&query).await;
        let _ = tx.send(Event::Channels { seq, result });
    });

    if with_stats {
        let stats_api = Arc::clone(api);
        let tx = event_tx.clone();
        tokio::spawn(async move {
            let result = stats_api.stats().await;
            let _ = tx.send(Event::Stats(result));
        });
    }
}

// ============================================================================
// Main Event Loop
// ============================================================================

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    session: &SessionHandle,
    api: &Arc<dyn BackendApi>,
    event_tx: &mpsc::UnboundedSender<Event>,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        app.tick();
        terminal.draw(|frame| ui::render(frame, app))?;

        let event = tokio::time::timeout(tick_rate, event_rx.recv()).await;

        match event {
            Ok(Some(Event::Key(key))) => {
                let sent = match handle_key_event(key, app) {
                    Action::Quit => {
                        info!("User requested quit");
                        cancel_token.cancel();
                        break;
                    }
                    Action::Login(credentials) => {
                        info!(host = %credentials.host, "User submitted login");
                        session.login(credentials)
                    }
                    Action::Refresh => {
                        info!("User requested refresh");
                        session.refresh()
                    }
                    Action::Logout => {
                        info!("User requested logout");
                        session.logout()
                    }
                    Action::CheckStatus => {
                        debug!("User requested status check");
                        session.check_status()
                    }
                    Action::LoadChannels => {
                        spawn_dashboard_load(api, app, false, event_tx);
                        Ok(())
                    }
                    Action::None => Ok(()),
                };
                if let Err(e) = sent {
                    warn!(error = %e, "Session command dropped");
                }
            }
            Ok(Some(Event::Resize(_width, _height))) => {
                debug!("Terminal resized");
            }
            Ok(Some(Event::Session(view))) => {
                debug!(phase = %view.phase, error = ?view.error, "Session update");
                if app.update_session(view) {
                    spawn_dashboard_load(api, app, true, event_tx);
                }
            }
            Ok(Some(Event::Channels { seq, result })) => {
                if let Err(e) = &result {
                    warn!(error = ?e, "Channel load failed");
                }
                app.apply_channels(seq, result);
            }
            Ok(Some(Event::Stats(result))) => {
                if let Err(e) = &result {
                    warn!(error = ?e, "Stats load failed");
                }
                app.apply_stats(result);
            }
            Ok(None) => {
                warn!("Event channel closed");
                break;
            }
            Err(_) => {}
        }

        if app.should_quit {
            cancel_token.cancel();
            break;
        }

        if cancel_token.is_cancelled() {
            break;
        }
    }

    Ok(())
}

// ============================================================================
// Logging Setup
// ============================================================================

const LOG_FILE_NAME: &str = "tui.log";

/// `$XDG_STATE_HOME/iptv`, else `~/.local/state/iptv`.
fn log_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_STATE_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))
        .map(|base| base.join("iptv"))
}

fn open_log_file() -> Result<(PathBuf, File)> {
    let dir = log_dir().context("no home directory for logs")?;
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok((path, file))
}

/// Logs to `tui.log` in [`log_dir`]. Logging is off when the file cannot
/// be opened.
fn init_logging() -> Option<PathBuf> {
    match open_log_file() {
        Ok((path, file)) => {
            let directive = "iptv_tui=info"
                .parse()
                .unwrap_or_else(|_| tracing_subscriber::filter::Directive::from(tracing::Level::INFO));
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
            Some(path)
        }
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .init();
            None
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.client_config()?;

    let log_path = init_logging();
    info!(
        backend = %config.backend_url,
        log = ?log_path,
        "IPTV TUI starting"
    );

    let client = BackendClient::new(&config).context("Failed to create backend client")?;
    let api: Arc<dyn BackendApi> = Arc::new(client);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let cancel_token = CancellationToken::new();

    let mut terminal = match setup_terminal() {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to initialize terminal");
            return Err(e.into());
        }
    };

    let mut app = App::new();

    let (session, session_handle) =
        spawn_session(Arc::clone(&api), config, cancel_token.clone());
    let forwarder_handle =
        spawn_session_forwarder(session.watch(), event_tx.clone(), cancel_token.clone());
    let keyboard_handle = spawn_keyboard_task(event_tx.clone(), cancel_token.clone());

    let result = run_event_loop(
        &mut terminal,
        &mut app,
        &session,
        &api,
        &event_tx,
        &mut event_rx,
        &cancel_token,
    )
    .await;

    cancel_token.cancel();

    let _ = tokio::time::timeout(Duration::from_millis(100), session_handle).await;
    let _ = tokio::time::timeout(Duration::from_millis(100), forwarder_handle).await;
    let _ = tokio::time::timeout(Duration::from_millis(100), keyboard_handle).await;

    if let Err(e) = cleanup_terminal(&mut terminal) {
        error!(error = %e, "Failed to cleanup terminal");
    }

    info!("IPTV TUI stopped");

    result
}
