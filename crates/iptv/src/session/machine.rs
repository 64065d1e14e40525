//! The session state machine.
//!
//! `SessionMachine` is a synchronous reducer: every input goes through
//! [`SessionMachine::handle`], which updates the phase and returns the side
//! effects to run. It never performs IO, so every transition can be tested
//! without a runtime.
//!
//! # Transitions
//!
//! ```text
//!            Start                    status ok
//!   Boot ───────────▶ fetch ────────────────────▶ resolve_phase(snapshot)
//!     │ status err
//!     ▼
//!   NotLoggedIn ── login(valid) ──▶ LoggingIn ── login ok ──▶ fetch ──▶ resolve
//!     ▲                                 │ any failure
//!     └─────────────────────────────────┘
//!
//!   Ready ── refresh() ──▶ Refreshing ── poll: refreshing=false ──▶ resolve
//! ```
//!
//! Entering `Refreshing` emits `StartPolling`; leaving it emits
//! `StopPolling`. While a refresh trigger awaits its response, an idle
//! snapshot does not leave `Refreshing`: the backend may not have seen the
//! trigger yet.
//!
//! # Ordering
//!
//! Every status request carries a sequence number from a shared
//! [`SequenceCounter`]. A response whose number is not above `floor` is
//! dropped. `floor` advances on every applied response, and jumps to the
//! latest issued number when a login or logout makes older answers
//! meaningless.

use tracing::{debug, info, warn};

use iptv_core::{needs_auto_refresh, resolve_phase, Credentials, SessionPhase, StatusSnapshot};

use crate::error::{ClientError, ALREADY_REFRESHING, NOT_LOGGED_IN};
use crate::poller::{PollOutcome, SequenceCounter};

// ============================================================================
// Inputs / Effects
// ============================================================================

/// Everything the machine reacts to: user commands and effect results.
#[derive(Debug, Clone)]
pub enum Input {
    /// Leave `Boot` by fetching status.
    Start,
    Login(Credentials),
    Refresh,
    Logout,
    /// Re-fetch status now.
    CheckStatus,

    StatusFetched {
        seq: u64,
        result: Result<StatusSnapshot, ClientError>,
    },
    Polled(PollOutcome),
    LoginFinished(Result<(), ClientError>),
    RefreshFinished {
        auto: bool,
        result: Result<(), ClientError>,
    },
    LogoutFinished(Result<(), ClientError>),
}

/// Side effects requested by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchStatus { seq: u64 },
    SubmitLogin(Credentials),
    /// `auto` is true when the machine fired it for a missing cache.
    TriggerRefresh { auto: bool },
    SubmitLogout,
    StartPolling,
    StopPolling,
}

/// What the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub phase: SessionPhase,
    /// Current error message, if any.
    pub error: Option<String>,
    /// Latest backend status.
    pub snapshot: Option<StatusSnapshot>,
}

// ============================================================================
// Session Machine
// ============================================================================

#[derive(Debug)]
pub struct SessionMachine {
    phase: SessionPhase,
    snapshot: Option<StatusSnapshot>,
    error: Option<String>,

    seq: SequenceCounter,
    /// Responses with a sequence number at or below this are stale.
    floor: u64,
    /// Sequence number of the outstanding explicit status request.
    in_flight: Option<u64>,
    /// The auto-refresh for the current `Refreshing` episode has fired.
    auto_refresh_fired: bool,
    /// A refresh trigger was sent and its response has not arrived. Until
    /// it does, an idle snapshot predates the trigger and cannot end the
    /// episode.
    refresh_pending: bool,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new(SequenceCounter::new())
    }
}

impl SessionMachine {
    /// Creates a machine in `Boot`. `seq` must be shared with the poller.
    pub fn new(seq: SequenceCounter) -> Self {
        Self {
            phase: SessionPhase::Boot,
            snapshot: None,
            error: None,
            seq,
            floor: 0,
            in_flight: None,
            auto_refresh_fired: false,
            refresh_pending: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn sequence(&self) -> &SequenceCounter {
        &self.seq
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            error: self.error.clone(),
            snapshot: self.snapshot.clone(),
        }
    }

    /// Applies one input and returns the effects to run, in order.
    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut effects = Vec::new();
        match input {
            Input::Start => self.on_start(&mut effects),
            Input::Login(credentials) => self.on_login(credentials, &mut effects),
            Input::Refresh => self.on_refresh(&mut effects),
            Input::Logout => self.on_logout(&mut effects),
            Input::CheckStatus => {
                if self.phase != SessionPhase::LoggingIn {
                    self.request_status(&mut effects);
                }
            }
            Input::StatusFetched { seq, result } => {
                self.on_status_fetched(seq, result, &mut effects);
            }
            Input::Polled(outcome) => self.on_polled(outcome, &mut effects),
            Input::LoginFinished(result) => self.on_login_finished(result, &mut effects),
            Input::RefreshFinished { auto, result } => {
                self.on_refresh_finished(auto, result, &mut effects);
            }
            Input::LogoutFinished(result) => self.on_logout_finished(result, &mut effects),
        }
        effects
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn on_start(&mut self, effects: &mut Vec<Effect>) {
        if self.phase == SessionPhase::Boot {
            self.request_status(effects);
        }
    }

    fn on_login(&mut self, credentials: Credentials, effects: &mut Vec<Effect>) {
        if self.phase != SessionPhase::NotLoggedIn {
            debug!(phase = %self.phase, "Login ignored");
            return;
        }
        if let Err(e) = credentials.validate() {
            self.error = Some(ClientError::from(e).to_string());
            return;
        }

        info!(host = %credentials.host, "Submitting login");
        self.discard_outstanding();
        self.transition_to(SessionPhase::LoggingIn, effects);
        effects.push(Effect::SubmitLogin(credentials));
    }

    fn on_refresh(&mut self, effects: &mut Vec<Effect>) {
        let logged_in = self.snapshot.as_ref().is_some_and(|s| s.logged_in);
        match self.phase {
            SessionPhase::Ready if logged_in => {
                self.transition_to(SessionPhase::Refreshing, effects);
                self.trigger_refresh(false, effects);
            }
            SessionPhase::Ready => {
                self.error = Some(NOT_LOGGED_IN.to_string());
                self.reresolve(effects);
            }
            SessionPhase::Refreshing => {
                let idle = self
                    .snapshot
                    .as_ref()
                    .is_some_and(|s| s.logged_in && !s.refreshing);
                if idle {
                    self.trigger_refresh(false, effects);
                } else {
                    self.error = Some(ALREADY_REFRESHING.to_string());
                }
            }
            SessionPhase::NotLoggedIn => {
                self.error = Some(NOT_LOGGED_IN.to_string());
            }
            SessionPhase::Boot | SessionPhase::LoggingIn => {
                debug!(phase = %self.phase, "Refresh ignored");
            }
        }
    }

    fn on_logout(&mut self, effects: &mut Vec<Effect>) {
        if self.phase.is_logged_in() {
            info!("Submitting logout");
            effects.push(Effect::SubmitLogout);
        }
    }

    // ========================================================================
    // Effect Results
    // ========================================================================

    fn on_status_fetched(
        &mut self,
        seq: u64,
        result: Result<StatusSnapshot, ClientError>,
        effects: &mut Vec<Effect>,
    ) {
        if self.in_flight == Some(seq) {
            self.in_flight = None;
        }
        if seq <= self.floor {
            debug!(seq, floor = self.floor, "Dropping stale status response");
            return;
        }
        self.floor = seq;

        match result {
            Ok(snapshot) => self.apply_snapshot(snapshot, effects),
            Err(e) => {
                warn!(error = ?e, phase = %self.phase, "Status request failed");
                self.error = Some(e.to_string());
                if self.phase != SessionPhase::Refreshing {
                    self.transition_to(SessionPhase::NotLoggedIn, effects);
                }
            }
        }
    }

    fn on_polled(&mut self, outcome: PollOutcome, effects: &mut Vec<Effect>) {
        if self.phase != SessionPhase::Refreshing {
            debug!(seq = outcome.seq, "Dropping poll result outside Refreshing");
            return;
        }
        if outcome.seq <= self.floor {
            debug!(seq = outcome.seq, floor = self.floor, "Dropping stale poll result");
            return;
        }
        self.floor = outcome.seq;

        match outcome.result {
            Ok(snapshot) => self.apply_snapshot(snapshot, effects),
            Err(e) => {
                debug!(error = ?e, "Poll failed, still refreshing");
                self.error = Some(e.to_string());
            }
        }
    }

    fn on_login_finished(&mut self, result: Result<(), ClientError>, effects: &mut Vec<Effect>) {
        if self.phase != SessionPhase::LoggingIn {
            debug!(phase = %self.phase, "Login result ignored");
            return;
        }
        match result {
            Ok(()) => self.request_status(effects),
            Err(e) => {
                warn!(error = ?e, "Login failed");
                self.error = Some(e.to_string());
                self.transition_to(SessionPhase::NotLoggedIn, effects);
            }
        }
    }

    fn on_refresh_finished(
        &mut self,
        auto: bool,
        result: Result<(), ClientError>,
        effects: &mut Vec<Effect>,
    ) {
        let was_pending = std::mem::take(&mut self.refresh_pending);
        match result {
            Ok(()) => {
                debug!(auto, "Refresh accepted");
                if was_pending && self.phase != SessionPhase::Refreshing {
                    self.request_status(effects);
                }
            }
            Err(e) if auto && e.is_already_refreshing() => {
                debug!("Auto-refresh found a refresh already running");
            }
            Err(e) => {
                warn!(error = ?e, auto, "Refresh request failed");
                self.error = Some(e.to_string());
                self.request_status(effects);
            }
        }
    }

    fn on_logout_finished(&mut self, result: Result<(), ClientError>, effects: &mut Vec<Effect>) {
        match result {
            Ok(()) => {
                self.discard_outstanding();
                self.request_status(effects);
            }
            Err(e) => {
                warn!(error = ?e, "Logout failed");
                self.error = Some(e.to_string());
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Issues a status fetch unless one is already outstanding.
    fn request_status(&mut self, effects: &mut Vec<Effect>) {
        if let Some(seq) = self.in_flight {
            debug!(seq, "Status request already in flight");
            return;
        }
        let seq = self.seq.next();
        self.in_flight = Some(seq);
        effects.push(Effect::FetchStatus { seq });
    }

    /// Makes every status request issued so far stale.
    fn discard_outstanding(&mut self) {
        self.floor = self.floor.max(self.seq.current());
        self.in_flight = None;
        self.refresh_pending = false;
    }

    fn trigger_refresh(&mut self, auto: bool, effects: &mut Vec<Effect>) {
        self.auto_refresh_fired = true;
        self.refresh_pending = true;
        effects.push(Effect::TriggerRefresh { auto });
    }

    fn apply_snapshot(&mut self, snapshot: StatusSnapshot, effects: &mut Vec<Effect>) {
        if let Err(e) = snapshot.validate() {
            warn!(error = %e, "Backend status violates an invariant");
        }

        let mut target = resolve_phase(&snapshot);
        if target == SessionPhase::Ready
            && self.phase == SessionPhase::Refreshing
            && self.refresh_pending
        {
            debug!("Idle status before the refresh was acknowledged, still refreshing");
            target = SessionPhase::Refreshing;
        }
        let auto_refresh = needs_auto_refresh(&snapshot);
        self.snapshot = Some(snapshot);
        self.transition_to(target, effects);

        if matches!(target, SessionPhase::Ready | SessionPhase::Refreshing) {
            self.error = None;
        }

        if target == SessionPhase::Refreshing && auto_refresh && !self.auto_refresh_fired {
            info!("Cache missing, triggering refresh");
            self.trigger_refresh(true, effects);
        }
    }

    /// Resolves the phase again from the latest snapshot.
    fn reresolve(&mut self, effects: &mut Vec<Effect>) {
        let target = self
            .snapshot
            .as_ref()
            .map(resolve_phase)
            .unwrap_or(SessionPhase::NotLoggedIn);
        self.transition_to(target, effects);
    }

    /// Moves to `target`, running exit and entry hooks on a change.
    fn transition_to(&mut self, target: SessionPhase, effects: &mut Vec<Effect>) {
        if self.phase == target {
            return;
        }
        debug!(from = %self.phase, to = %target, "Phase transition");

        if self.phase == SessionPhase::Refreshing {
            effects.push(Effect::StopPolling);
        }

        self.phase = target;

        match target {
            SessionPhase::Refreshing => {
                self.auto_refresh_fired = false;
                self.error = None;
                effects.push(Effect::StartPolling);
            }
            SessionPhase::Ready => self.error = None,
            SessionPhase::Boot | SessionPhase::NotLoggedIn | SessionPhase::LoggingIn => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{empty_cache_snapshot, ready_snapshot, refreshing_snapshot};

    fn creds() -> Credentials {
        Credentials::new("tv.example", "alice", "secret")
    }

    fn transport() -> ClientError {
        ClientError::transport("connection refused")
    }

    /// Runs `Start` and answers the boot fetch with `snapshot`.
    fn booted(snapshot: StatusSnapshot) -> (SessionMachine, Vec<Effect>) {
        let mut machine = SessionMachine::default();
        let effects = machine.handle(Input::Start);
        assert_eq!(effects, vec![Effect::FetchStatus { seq: 1 }]);
        let effects = machine.handle(Input::StatusFetched {
            seq: 1,
            result: Ok(snapshot),
        });
        (machine, effects)
    }

    fn fetch_seq(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::FetchStatus { seq } => Some(*seq),
                _ => None,
            })
            .expect("a FetchStatus effect")
    }

    // ------------------------------------------------------------------------
    // Boot
    // ------------------------------------------------------------------------

    #[test]
    fn test_cold_boot_without_login() {
        let (machine, effects) = booted(StatusSnapshot::logged_out());
        assert_eq!(machine.phase(), SessionPhase::NotLoggedIn);
        assert!(effects.is_empty());
        assert!(machine.error().is_none());
    }

    #[test]
    fn test_boot_failure_goes_to_not_logged_in() {
        let mut machine = SessionMachine::default();
        machine.handle(Input::Start);
        let effects = machine.handle(Input::StatusFetched {
            seq: 1,
            result: Err(transport()),
        });
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::NotLoggedIn);
        assert_eq!(machine.error(), Some("Unable to reach backend"));
    }

    #[test]
    fn test_boot_into_ready() {
        let (machine, effects) = booted(ready_snapshot(10));
        assert_eq!(machine.phase(), SessionPhase::Ready);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_boot_while_backend_refreshing_starts_polling_without_trigger() {
        let (machine, effects) = booted(refreshing_snapshot());
        assert_eq!(machine.phase(), SessionPhase::Refreshing);
        assert_eq!(effects, vec![Effect::StartPolling]);
    }

    #[test]
    fn test_start_is_ignored_after_boot() {
        let (mut machine, _) = booted(ready_snapshot(1));
        assert!(machine.handle(Input::Start).is_empty());
    }

    // ------------------------------------------------------------------------
    // Login
    // ------------------------------------------------------------------------

    #[test]
    fn test_invalid_credentials_never_leave_not_logged_in() {
        let (mut machine, _) = booted(StatusSnapshot::logged_out());
        let effects = machine.handle(Input::Login(Credentials::new("ab", "alice", "pw")));
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::NotLoggedIn);
        assert_eq!(
            machine.error(),
            Some("Invalid host: must be at least 3 characters")
        );
    }

    #[test]
    fn test_login_then_empty_cache_auto_refreshes() {
        let (mut machine, _) = booted(StatusSnapshot::logged_out());

        let effects = machine.handle(Input::Login(creds()));
        assert_eq!(effects, vec![Effect::SubmitLogin(creds())]);
        assert_eq!(machine.phase(), SessionPhase::LoggingIn);

        let effects = machine.handle(Input::LoginFinished(Ok(())));
        let seq = fetch_seq(&effects);

        let effects = machine.handle(Input::StatusFetched {
            seq,
            result: Ok(empty_cache_snapshot()),
        });
        assert_eq!(machine.phase(), SessionPhase::Refreshing);
        assert_eq!(
            effects,
            vec![Effect::StartPolling, Effect::TriggerRefresh { auto: true }]
        );
    }

    #[test]
    fn test_login_failure_returns_to_not_logged_in() {
        let (mut machine, _) = booted(StatusSnapshot::logged_out());
        machine.handle(Input::Login(creds()));

        let effects = machine.handle(Input::LoginFinished(Err(ClientError::Validation(
            "Invalid host: must be at least 3 characters".to_string(),
        ))));
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::NotLoggedIn);
        assert!(machine.error().unwrap().contains("Invalid host"));
    }

    #[test]
    fn test_status_failure_after_login_returns_to_not_logged_in() {
        let (mut machine, _) = booted(StatusSnapshot::logged_out());
        machine.handle(Input::Login(creds()));
        let seq = fetch_seq(&machine.handle(Input::LoginFinished(Ok(()))));

        machine.handle(Input::StatusFetched {
            seq,
            result: Err(transport()),
        });
        assert_eq!(machine.phase(), SessionPhase::NotLoggedIn);
        assert_eq!(machine.error(), Some("Unable to reach backend"));
    }

    #[test]
    fn test_status_issued_before_login_is_dropped() {
        let (mut machine, _) = booted(StatusSnapshot::logged_out());
        let early = fetch_seq(&machine.handle(Input::CheckStatus));

        machine.handle(Input::Login(creds()));
        let effects = machine.handle(Input::StatusFetched {
            seq: early,
            result: Ok(StatusSnapshot::logged_out()),
        });
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::LoggingIn);
    }

    // ------------------------------------------------------------------------
    // Refreshing
    // ------------------------------------------------------------------------

    #[test]
    fn test_auto_refresh_fires_once_per_episode() {
        let (mut machine, effects) = booted(empty_cache_snapshot());
        assert_eq!(
            effects,
            vec![Effect::StartPolling, Effect::TriggerRefresh { auto: true }]
        );

        // Repeated identical snapshots never re-trigger.
        for seq in 2..5 {
            let effects = machine.handle(Input::Polled(PollOutcome {
                seq,
                result: Ok(empty_cache_snapshot()),
            }));
            assert!(effects.is_empty(), "seq {seq}");
        }
        assert_eq!(machine.phase(), SessionPhase::Refreshing);
    }

    #[test]
    fn test_refresh_completes_into_ready() {
        let (mut machine, _) = booted(refreshing_snapshot());
        let effects = machine.handle(Input::Polled(PollOutcome {
            seq: 2,
            result: Ok(ready_snapshot(42)),
        }));
        assert_eq!(effects, vec![Effect::StopPolling]);
        assert_eq!(machine.phase(), SessionPhase::Ready);
        assert_eq!(machine.snapshot().unwrap().channel_count, 42);
    }

    #[test]
    fn test_poll_failure_keeps_refreshing() {
        let (mut machine, _) = booted(refreshing_snapshot());
        let effects = machine.handle(Input::Polled(PollOutcome {
            seq: 2,
            result: Err(transport()),
        }));
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::Refreshing);
        assert_eq!(machine.error(), Some("Unable to reach backend"));
    }

    #[test]
    fn test_stale_poll_result_is_dropped() {
        let (mut machine, _) = booted(refreshing_snapshot());
        machine.handle(Input::Polled(PollOutcome {
            seq: 5,
            result: Ok(refreshing_snapshot()),
        }));

        let effects = machine.handle(Input::Polled(PollOutcome {
            seq: 4,
            result: Ok(ready_snapshot(1)),
        }));
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::Refreshing);
    }

    #[test]
    fn test_poll_result_after_leaving_refreshing_is_dropped() {
        let (mut machine, _) = booted(refreshing_snapshot());
        machine.handle(Input::Polled(PollOutcome {
            seq: 2,
            result: Ok(ready_snapshot(3)),
        }));
        assert_eq!(machine.phase(), SessionPhase::Ready);

        let effects = machine.handle(Input::Polled(PollOutcome {
            seq: 3,
            result: Ok(refreshing_snapshot()),
        }));
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::Ready);
    }

    #[test]
    fn test_failed_refresh_with_stale_cache_is_ready_with_error() {
        let (mut machine, _) = booted(refreshing_snapshot());
        let mut failed = ready_snapshot(7);
        failed.refresh_status = iptv_core::RefreshStatus::Failed;
        failed.last_error = Some("IPTV server returned HTTP 503".to_string());

        machine.handle(Input::Polled(PollOutcome {
            seq: 2,
            result: Ok(failed),
        }));
        let view = machine.view();
        assert_eq!(view.phase, SessionPhase::Ready);
        assert_eq!(
            view.snapshot.unwrap().last_error.as_deref(),
            Some("IPTV server returned HTTP 503")
        );
    }

    #[test]
    fn test_manual_retry_after_failed_auto_refresh() {
        let (mut machine, _) = booted(empty_cache_snapshot());
        let mut failed = empty_cache_snapshot();
        failed.refresh_status = iptv_core::RefreshStatus::Failed;
        failed.last_error = Some("IPTV request timed out".to_string());
        machine.handle(Input::Polled(PollOutcome {
            seq: 2,
            result: Ok(failed),
        }));
        assert_eq!(machine.phase(), SessionPhase::Refreshing);

        let effects = machine.handle(Input::Refresh);
        assert_eq!(effects, vec![Effect::TriggerRefresh { auto: false }]);
    }

    #[test]
    fn test_refresh_while_backend_refreshing_is_rejected() {
        let (mut machine, _) = booted(refreshing_snapshot());
        let effects = machine.handle(Input::Refresh);
        assert!(effects.is_empty());
        assert_eq!(machine.error(), Some("already refreshing"));
    }

    #[test]
    fn test_auto_refresh_conflict_is_silent() {
        let (mut machine, _) = booted(empty_cache_snapshot());
        let effects = machine.handle(Input::RefreshFinished {
            auto: true,
            result: Err(ClientError::Rejected(ALREADY_REFRESHING.to_string())),
        });
        assert!(effects.is_empty());
        assert!(machine.error().is_none());
    }

    // ------------------------------------------------------------------------
    // Ready
    // ------------------------------------------------------------------------

    #[test]
    fn test_refresh_from_ready() {
        let (mut machine, _) = booted(ready_snapshot(5));
        let effects = machine.handle(Input::Refresh);
        assert_eq!(
            effects,
            vec![Effect::StartPolling, Effect::TriggerRefresh { auto: false }]
        );
        assert_eq!(machine.phase(), SessionPhase::Refreshing);
    }

    #[test]
    fn test_idle_status_before_refresh_ack_stays_refreshing() {
        let (mut machine, _) = booted(ready_snapshot(5));
        machine.handle(Input::Refresh);

        // Answered before the backend saw the trigger.
        let early = machine.sequence().next();
        let effects = machine.handle(Input::Polled(PollOutcome {
            seq: early,
            result: Ok(ready_snapshot(5)),
        }));
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::Refreshing);

        let effects = machine.handle(Input::RefreshFinished {
            auto: false,
            result: Ok(()),
        });
        assert!(effects.is_empty());

        let running = machine.sequence().next();
        machine.handle(Input::Polled(PollOutcome {
            seq: running,
            result: Ok(refreshing_snapshot()),
        }));
        assert_eq!(machine.phase(), SessionPhase::Refreshing);

        let done = machine.sequence().next();
        let effects = machine.handle(Input::Polled(PollOutcome {
            seq: done,
            result: Ok(ready_snapshot(6)),
        }));
        assert_eq!(effects, vec![Effect::StopPolling]);
        assert_eq!(machine.phase(), SessionPhase::Ready);
    }

    #[test]
    fn test_refresh_ack_after_leaving_refreshing_rechecks_status() {
        let (mut machine, _) = booted(ready_snapshot(5));
        machine.handle(Input::Refresh);

        let seq = machine.sequence().next();
        machine.handle(Input::Polled(PollOutcome {
            seq,
            result: Ok(StatusSnapshot::logged_out()),
        }));
        assert_eq!(machine.phase(), SessionPhase::NotLoggedIn);

        let effects = machine.handle(Input::RefreshFinished {
            auto: false,
            result: Ok(()),
        });
        assert_eq!(fetch_seq(&effects), seq + 1);
    }

    #[test]
    fn test_refresh_ack_after_relogin_is_ignored() {
        let (mut machine, _) = booted(ready_snapshot(5));
        machine.handle(Input::Refresh);
        let seq = machine.sequence().next();
        machine.handle(Input::Polled(PollOutcome {
            seq,
            result: Ok(StatusSnapshot::logged_out()),
        }));
        machine.handle(Input::Login(creds()));

        let effects = machine.handle(Input::RefreshFinished {
            auto: false,
            result: Ok(()),
        });
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::LoggingIn);
    }

    #[test]
    fn test_manual_refresh_rejected_by_backend() {
        let (mut machine, _) = booted(ready_snapshot(5));
        machine.handle(Input::Refresh);

        let effects = machine.handle(Input::RefreshFinished {
            auto: false,
            result: Err(ClientError::Rejected(NOT_LOGGED_IN.to_string())),
        });
        let seq = fetch_seq(&effects);
        assert_eq!(machine.error(), Some("not logged in"));

        machine.handle(Input::StatusFetched {
            seq,
            result: Ok(StatusSnapshot::logged_out()),
        });
        assert_eq!(machine.phase(), SessionPhase::NotLoggedIn);
        assert_eq!(machine.error(), Some("not logged in"));
    }

    #[test]
    fn test_status_failure_from_ready_goes_to_not_logged_in() {
        let (mut machine, _) = booted(ready_snapshot(5));
        let seq = fetch_seq(&machine.handle(Input::CheckStatus));
        machine.handle(Input::StatusFetched {
            seq,
            result: Err(transport()),
        });
        assert_eq!(machine.phase(), SessionPhase::NotLoggedIn);
    }

    #[test]
    fn test_check_status_is_noop_while_in_flight() {
        let (mut machine, _) = booted(ready_snapshot(5));
        let first = machine.handle(Input::CheckStatus);
        assert_eq!(first.len(), 1);
        assert!(machine.handle(Input::CheckStatus).is_empty());
    }

    #[test]
    fn test_error_cleared_on_entering_ready() {
        let (mut machine, _) = booted(refreshing_snapshot());
        machine.handle(Input::Polled(PollOutcome {
            seq: 2,
            result: Err(transport()),
        }));
        assert!(machine.error().is_some());

        machine.handle(Input::Polled(PollOutcome {
            seq: 3,
            result: Ok(ready_snapshot(1)),
        }));
        assert!(machine.error().is_none());
    }

    #[test]
    fn test_error_cleared_by_recovered_poll_while_still_refreshing() {
        let (mut machine, _) = booted(refreshing_snapshot());
        machine.handle(Input::Polled(PollOutcome {
            seq: 2,
            result: Err(transport()),
        }));
        assert_eq!(machine.error(), Some("Unable to reach backend"));

        let effects = machine.handle(Input::Polled(PollOutcome {
            seq: 3,
            result: Ok(refreshing_snapshot()),
        }));
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), SessionPhase::Refreshing);
        assert!(machine.error().is_none());
    }

    #[test]
    fn test_error_kept_when_status_resolves_to_not_logged_in() {
        let (mut machine, _) = booted(StatusSnapshot::logged_out());
        machine.handle(Input::Refresh);
        assert_eq!(machine.error(), Some("not logged in"));

        let seq = fetch_seq(&machine.handle(Input::CheckStatus));
        machine.handle(Input::StatusFetched {
            seq,
            result: Ok(StatusSnapshot::logged_out()),
        });
        assert_eq!(machine.error(), Some("not logged in"));
    }

    // ------------------------------------------------------------------------
    // Logout
    // ------------------------------------------------------------------------

    #[test]
    fn test_logout_from_refreshing_stops_polling() {
        let (mut machine, _) = booted(refreshing_snapshot());
        assert_eq!(machine.handle(Input::Logout), vec![Effect::SubmitLogout]);

        let seq = fetch_seq(&machine.handle(Input::LogoutFinished(Ok(()))));
        let effects = machine.handle(Input::StatusFetched {
            seq,
            result: Ok(StatusSnapshot::logged_out()),
        });
        assert_eq!(effects, vec![Effect::StopPolling]);
        assert_eq!(machine.phase(), SessionPhase::NotLoggedIn);
    }

    #[test]
    fn test_logout_ignored_when_not_logged_in() {
        let (mut machine, _) = booted(StatusSnapshot::logged_out());
        assert!(machine.handle(Input::Logout).is_empty());
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    #[test]
    fn test_same_snapshot_same_phase() {
        for snapshot in [
            StatusSnapshot::logged_out(),
            ready_snapshot(3),
            refreshing_snapshot(),
            empty_cache_snapshot(),
        ] {
            let (first, _) = booted(snapshot.clone());
            let (second, _) = booted(snapshot.clone());
            assert_eq!(first.phase(), second.phase());
            assert_eq!(first.phase(), resolve_phase(&snapshot));
        }
    }
}
