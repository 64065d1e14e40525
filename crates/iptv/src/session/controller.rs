//! Session controller task.
//!
//! Owns the [`SessionMachine`] and turns its effects into backend calls.
//! Effect results come back to the same loop as inputs, so the machine is
//! only ever touched from one task.
//!
//! The UI talks to it through [`SessionHandle`]: commands go in over an
//! mpsc channel, the current [`SessionView`] comes out over a watch
//! channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use iptv_core::Credentials;

use crate::client::{BackendApi, ClientConfig};
use crate::error::ClientError;
use crate::poller::{fetch_status, PollOutcome, SequenceCounter, StatusPoller};
use crate::session::machine::{Effect, Input, SessionMachine, SessionView};

/// User commands accepted by the session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Login(Credentials),
    Refresh,
    Logout,
    CheckStatus,
}

impl From<SessionCommand> for Input {
    fn from(command: SessionCommand) -> Self {
        match command {
            SessionCommand::Login(credentials) => Input::Login(credentials),
            SessionCommand::Refresh => Input::Refresh,
            SessionCommand::Logout => Input::Logout,
            SessionCommand::CheckStatus => Input::CheckStatus,
        }
    }
}

/// The session task has stopped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Session task is not running")]
pub struct SessionClosed;

// ============================================================================
// Session Handle
// ============================================================================

/// Handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> Result<(), SessionClosed> {
        self.commands.send(command).map_err(|_| SessionClosed)
    }

    pub fn login(&self, credentials: Credentials) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Login(credentials))
    }

    pub fn refresh(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Refresh)
    }

    pub fn logout(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Logout)
    }

    pub fn check_status(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::CheckStatus)
    }

    /// Current view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// A receiver that is notified on every view change.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }
}

// ============================================================================
// Spawning
// ============================================================================

/// Starts the session task. It boots immediately and runs until `cancel`
/// fires or every handle is dropped.
pub fn spawn_session(
    api: Arc<dyn BackendApi>,
    config: ClientConfig,
    cancel: CancellationToken,
) -> (SessionHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let machine = SessionMachine::new(SequenceCounter::new());
    let (view_tx, view_rx) = watch::channel(machine.view());
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (poll_tx, poll_rx) = mpsc::unbounded_channel();

    let controller = SessionController {
        api,
        config,
        machine,
        view_tx,
        input_tx,
        poll_tx,
        poller: None,
    };
    let task = tokio::spawn(controller.run(command_rx, input_rx, poll_rx, cancel));

    let handle = SessionHandle {
        commands: command_tx,
        view: view_rx,
    };
    (handle, task)
}

// ============================================================================
// Controller
// ============================================================================

struct SessionController {
    api: Arc<dyn BackendApi>,
    config: ClientConfig,
    machine: SessionMachine,
    view_tx: watch::Sender<SessionView>,
    input_tx: mpsc::UnboundedSender<Input>,
    poll_tx: mpsc::UnboundedSender<PollOutcome>,
    poller: Option<StatusPoller>,
}

impl SessionController {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        mut inputs: mpsc::UnboundedReceiver<Input>,
        mut polls: mpsc::UnboundedReceiver<PollOutcome>,
        cancel: CancellationToken,
    ) {
        info!(backend = %self.config.backend_url, "Session started");
        self.apply(Input::Start);

        loop {
            let input = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Session cancelled");
                    break;
                }
                command = commands.recv() => match command {
                    Some(command) => Input::from(command),
                    None => {
                        debug!("All session handles dropped");
                        break;
                    }
                },
                Some(input) = inputs.recv() => input,
                Some(outcome) = polls.recv() => Input::Polled(outcome),
            };
            self.apply(input);
        }

        self.poller = None;
        info!("Session stopped");
    }

    fn apply(&mut self, input: Input) {
        for effect in self.machine.handle(input) {
            self.run_effect(effect);
        }

        let view = self.machine.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    fn run_effect(&mut self, effect: Effect) {
        debug!(?effect, "Running effect");
        let api = Arc::clone(&self.api);
        let limit = self.config.request_timeout;

        match effect {
            Effect::FetchStatus { seq } => self.spawn_call(async move {
                let result = fetch_status(api.as_ref(), limit).await;
                Input::StatusFetched { seq, result }
            }),
            Effect::SubmitLogin(credentials) => self.spawn_call(async move {
                Input::LoginFinished(within(limit, api.login(&credentials)).await)
            }),
            Effect::TriggerRefresh { auto } => self.spawn_call(async move {
                let result = within(limit, api.refresh()).await;
                Input::RefreshFinished { auto, result }
            }),
            Effect::SubmitLogout => self.spawn_call(async move {
                Input::LogoutFinished(within(limit, api.logout()).await)
            }),
            Effect::StartPolling => {
                self.poller = Some(StatusPoller::spawn(
                    api,
                    self.machine.sequence().clone(),
                    self.config.poll_interval,
                    limit,
                    self.poll_tx.clone(),
                ));
            }
            Effect::StopPolling => {
                if let Some(poller) = self.poller.take() {
                    poller.stop();
                }
            }
        }
    }

    /// Runs a backend call and feeds its result back into the loop.
    fn spawn_call<F>(&self, call: F)
    where
        F: Future<Output = Input> + Send + 'static,
    {
        let input_tx = self.input_tx.clone();
        tokio::spawn(async move {
            let input = call.await;
            let _ = input_tx.send(input);
        });
    }
}

/// Bounds a backend call by `limit`.
async fn within<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    timeout(limit, call).await.unwrap_or_else(|_| {
        Err(ClientError::transport(format!(
            "request timed out after {}ms",
            limit.as_millis()
        )))
    })
}
