//! Keyboard input handling for the IPTV terminal client.
//!
//! Key handling depends on the session phase: the login form captures
//! printable keys, the dashboard maps them to commands.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use iptv_core::{ChannelStats, Credentials, SessionPhase};
use iptv_protocol::ChannelListResponse;

use crate::app::{App, InputMode};
use crate::error::ClientError;
use crate::session::SessionView;

// ============================================================================
// Event Types
// ============================================================================

/// Events processed by the main loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input from the user.
    Key(KeyEvent),

    /// Terminal window resize event.
    Resize(u16, u16),

    /// The session published a new view.
    Session(SessionView),

    /// A channel page finished loading.
    Channels {
        seq: u64,
        result: Result<ChannelListResponse, ClientError>,
    },

    /// Stats finished loading.
    Stats(Result<ChannelStats, ClientError>),
}

// ============================================================================
// Action Types
// ============================================================================

/// What the main loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Login(Credentials),
    Refresh,
    Logout,
    /// Re-fetch the backend status.
    CheckStatus,
    /// Reload the channel page with the current query.
    LoadChannels,
}

// ============================================================================
// Input Handler
// ============================================================================

/// Handles a keyboard event and updates application state accordingly.
///
/// # Key Bindings
///
/// Login form (`NOT_LOGGED_IN`):
///
/// | Key                 | Action                    |
/// |---------------------|---------------------------|
/// | `Tab`, `Down`       | Next field                |
/// | `Shift+Tab`, `Up`   | Previous field            |
/// | `Enter`             | Submit                    |
/// | `Backspace`         | Delete last character     |
/// | `Esc`               | Quit                      |
///
/// Dashboard (`READY`):
///
/// | Key                 | Action                    |
/// |---------------------|---------------------------|
/// | `j`, `Down`         | Next channel              |
/// | `k`, `Up`           | Previous channel          |
/// | `n`, `Right`        | Next page                 |
/// | `p`, `Left`         | Previous page             |
/// | `/`                 | Edit search               |
/// | `c`                 | Cycle category filter     |
/// | `r`                 | Refresh playlist          |
/// | `l`                 | Logout                    |
/// | `q`, `Esc`          | Quit                      |
///
/// While refreshing `r` retries and `l` logs out. `F5` re-checks the backend
/// status in every phase. `Ctrl+C` always quits.
#[must_use]
pub fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return Action::Quit;
    }
    if key.code == KeyCode::F(5) {
        return Action::CheckStatus;
    }

    match app.phase() {
        SessionPhase::NotLoggedIn => handle_login_key(key, app),
        SessionPhase::Ready if app.mode == InputMode::Search => handle_search_key(key, app),
        SessionPhase::Ready => handle_dashboard_key(key, app),
        SessionPhase::Refreshing => match key.code {
            KeyCode::Char('r') | KeyCode::Char('R') => Action::Refresh,
            KeyCode::Char('l') | KeyCode::Char('L') => Action::Logout,
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => quit(app),
            _ => Action::None,
        },
        SessionPhase::Boot | SessionPhase::LoggingIn => match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => quit(app),
            _ => Action::None,
        },
    }
}

fn quit(app: &mut App) -> Action {
    app.quit();
    Action::Quit
}

fn handle_login_key(key: KeyEvent, app: &mut App) -> Action {
    match key.code {
        KeyCode::Esc => quit(app),
        KeyCode::Tab | KeyCode::Down => {
            app.login.focus_next();
            Action::None
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.login.focus_previous();
            Action::None
        }
        KeyCode::Enter => Action::Login(app.login.credentials()),
        KeyCode::Backspace => {
            app.login.pop();
            Action::None
        }
        KeyCode::Char(c) => {
            app.login.push(c);
            Action::None
        }
        _ => Action::None,
    }
}

fn handle_search_key(key: KeyEvent, app: &mut App) -> Action {
    match key.code {
        KeyCode::Esc => {
            app.cancel_search();
            Action::None
        }
        KeyCode::Enter => {
            app.submit_search();
            Action::LoadChannels
        }
        KeyCode::Backspace => {
            app.search_input.pop();
            Action::None
        }
        KeyCode::Char(c) => {
            app.search_input.push(c);
            Action::None
        }
        _ => Action::None,
    }
}

fn handle_dashboard_key(key: KeyEvent, app: &mut App) -> Action {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => quit(app),

        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next();
            Action::None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_previous();
            Action::None
        }

        KeyCode::Char('n') | KeyCode::Right => {
            if app.next_page() {
                Action::LoadChannels
            } else {
                Action::None
            }
        }
        KeyCode::Char('p') | KeyCode::Left => {
            if app.previous_page() {
                Action::LoadChannels
            } else {
                Action::None
            }
        }

        KeyCode::Char('/') => {
            app.begin_search();
            Action::None
        }
        KeyCode::Char('c') | KeyCode::Char('C') => {
            app.cycle_category();
            Action::LoadChannels
        }

        KeyCode::Char('r') | KeyCode::Char('R') => Action::Refresh,
        KeyCode::Char('l') | KeyCode::Char('L') => Action::Logout,

        _ => Action::None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::LoginField;
    use crate::test_support::ready_snapshot;
    use iptv_core::Channel;

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn key_event_with_mod(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn app_in(phase: SessionPhase) -> App {
        let mut app = App::new();
        app.update_session(SessionView {
            phase,
            error: None,
            snapshot: Some(ready_snapshot(3)),
        });
        app
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert_eq!(handle_key_event(key_event(KeyCode::Char(c)), app), Action::None);
        }
    }

    #[test]
    fn test_ctrl_c_quits_in_every_phase() {
        for phase in [
            SessionPhase::Boot,
            SessionPhase::NotLoggedIn,
            SessionPhase::LoggingIn,
            SessionPhase::Refreshing,
            SessionPhase::Ready,
        ] {
            let mut app = app_in(phase);
            let key = key_event_with_mod(KeyCode::Char('c'), KeyModifiers::CONTROL);
            assert_eq!(handle_key_event(key, &mut app), Action::Quit, "{phase}");
            assert!(app.should_quit);
        }
    }

    #[test]
    fn test_login_form_typing_does_not_trigger_commands() {
        let mut app = app_in(SessionPhase::NotLoggedIn);
        // 'q', 'r' and 'l' are text here.
        type_text(&mut app, "qrl.tv");
        assert_eq!(app.login.host, "qrl.tv");
        assert!(!app.should_quit);
    }

    #[test]
    fn test_login_form_submit() {
        let mut app = app_in(SessionPhase::NotLoggedIn);
        type_text(&mut app, "tv.example");
        let _ = handle_key_event(key_event(KeyCode::Tab), &mut app);
        type_text(&mut app, "alice");
        let _ = handle_key_event(key_event(KeyCode::Down), &mut app);
        assert_eq!(app.login.focus, LoginField::Password);
        type_text(&mut app, "secret");

        let action = handle_key_event(key_event(KeyCode::Enter), &mut app);
        assert_eq!(
            action,
            Action::Login(Credentials::new("tv.example", "alice", "secret"))
        );
    }

    #[test]
    fn test_login_form_backtab_and_backspace() {
        let mut app = app_in(SessionPhase::NotLoggedIn);
        let _ = handle_key_event(key_event(KeyCode::BackTab), &mut app);
        assert_eq!(app.login.focus, LoginField::Password);
        type_text(&mut app, "pw");
        let _ = handle_key_event(key_event(KeyCode::Backspace), &mut app);
        assert_eq!(app.login.password, "p");
    }

    #[test]
    fn test_login_form_esc_quits() {
        let mut app = app_in(SessionPhase::NotLoggedIn);
        assert_eq!(handle_key_event(key_event(KeyCode::Esc), &mut app), Action::Quit);
    }

    #[test]
    fn test_dashboard_commands() {
        let mut app = app_in(SessionPhase::Ready);
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('r')), &mut app),
            Action::Refresh
        );
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('l')), &mut app),
            Action::Logout
        );
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('c')), &mut app),
            Action::LoadChannels
        );
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('q')), &mut app),
            Action::Quit
        );
    }

    #[test]
    fn test_dashboard_paging() {
        let mut app = app_in(SessionPhase::Ready);
        let (seq, _) = app.begin_channel_load();
        app.apply_channels(
            seq,
            Ok(ChannelListResponse {
                channels: vec![Channel::new("BBC One", "UK | News", "http://s/1")],
                total: 30,
                page: 1,
                page_size: 25,
                cached: true,
            }),
        );

        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('p')), &mut app),
            Action::None
        );
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('n')), &mut app),
            Action::LoadChannels
        );
        assert_eq!(app.page, 2);
        assert_eq!(
            handle_key_event(key_event(KeyCode::Right), &mut app),
            Action::None
        );
    }

    #[test]
    fn test_search_mode_captures_keys() {
        let mut app = app_in(SessionPhase::Ready);
        let _ = handle_key_event(key_event(KeyCode::Char('/')), &mut app);
        assert_eq!(app.mode, InputMode::Search);

        type_text(&mut app, "bbc q");
        assert!(!app.should_quit);

        let action = handle_key_event(key_event(KeyCode::Enter), &mut app);
        assert_eq!(action, Action::LoadChannels);
        assert_eq!(app.search.as_deref(), Some("bbc q"));
        assert_eq!(app.mode, InputMode::Normal);
    }

    #[test]
    fn test_search_esc_cancels_without_quitting() {
        let mut app = app_in(SessionPhase::Ready);
        let _ = handle_key_event(key_event(KeyCode::Char('/')), &mut app);
        type_text(&mut app, "news");
        assert_eq!(handle_key_event(key_event(KeyCode::Esc), &mut app), Action::None);
        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.search, None);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_refreshing_allows_retry_and_logout() {
        let mut app = app_in(SessionPhase::Refreshing);
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('r')), &mut app),
            Action::Refresh
        );
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('l')), &mut app),
            Action::Logout
        );
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('/')), &mut app),
            Action::None
        );
    }

    #[test]
    fn test_f5_checks_status_everywhere() {
        for phase in [SessionPhase::NotLoggedIn, SessionPhase::Refreshing, SessionPhase::Ready] {
            let mut app = app_in(phase);
            assert_eq!(
                handle_key_event(key_event(KeyCode::F(5)), &mut app),
                Action::CheckStatus,
                "{phase}"
            );
        }
        let mut app = app_in(SessionPhase::NotLoggedIn);
        let _ = handle_key_event(key_event(KeyCode::F(5)), &mut app);
        assert!(app.login.host.is_empty());
    }

    #[test]
    fn test_boot_ignores_commands() {
        let mut app = app_in(SessionPhase::Boot);
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('r')), &mut app),
            Action::None
        );
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('q')), &mut app),
            Action::Quit
        );
    }
}
