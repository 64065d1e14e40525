//! UI rendering for the IPTV terminal client.
//!
//! # Layout Structure
//!
//! ```text
//! +--------------------------------------------------+
//! |  Header: Title, Phase and Cache Summary          |  <- 3 lines
//! +--------------------------------------------------+
//! |                                                  |
//! |  Login form | Loading screen | Dashboard         |  <- fills remaining
//! |                                                  |
//! +--------------------------------------------------+
//! |  Footer: Error or Keybinding Hints               |  <- 3 lines
//! +--------------------------------------------------+
//! ```
//!
//! What fills the content area depends only on the session phase.

pub mod dashboard;
pub mod layout;
pub mod loading;
pub mod login_form;
pub mod status_bar;
pub mod theme;

use chrono::Utc;
use ratatui::Frame;

use iptv_core::SessionPhase;

use crate::app::App;
use layout::AppLayout;

pub use dashboard::render_dashboard;
pub use loading::render_loading;
pub use login_form::render_login_form;
pub use status_bar::{render_footer, render_header};

/// Renders the complete interface.
///
/// ```ignore
/// terminal.draw(|frame| {
///     ui::render(frame, &app);
/// })?;
/// ```
pub fn render(frame: &mut Frame, app: &App) {
    let layout = AppLayout::new(frame.area());

    render_header(frame, layout.header, app);
    render_footer(frame, layout.footer, app);

    match app.phase() {
        SessionPhase::NotLoggedIn => render_login_form(frame, layout.content, &app.login),
        SessionPhase::Ready => render_dashboard(frame, layout.content, app),
        SessionPhase::Boot | SessionPhase::LoggingIn | SessionPhase::Refreshing => {
            render_loading(frame, layout.content, app, Utc::now());
        }
    }
}
