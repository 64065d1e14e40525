//! Shared theme utilities for the IPTV terminal client.

use iptv_core::{ChannelCategory, RefreshStatus, SessionPhase};
use ratatui::style::{Color, Modifier, Style};

/// Frames of the loading spinner.
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Border and label color for a session phase.
///
/// - Green: ready
/// - Yellow: booting, signing in or refreshing
/// - Red: not logged in
pub fn phase_color(phase: SessionPhase) -> Color {
    match phase {
        SessionPhase::Ready => Color::Green,
        SessionPhase::Boot | SessionPhase::LoggingIn | SessionPhase::Refreshing => Color::Yellow,
        SessionPhase::NotLoggedIn => Color::Red,
    }
}

/// Human label for a session phase.
pub fn phase_label(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Boot => "Connecting...",
        SessionPhase::NotLoggedIn => "Not logged in",
        SessionPhase::LoggingIn => "Signing in...",
        SessionPhase::Refreshing => "Refreshing",
        SessionPhase::Ready => "Ready",
    }
}

pub fn refresh_status_color(status: RefreshStatus) -> Color {
    match status {
        RefreshStatus::Success => Color::Green,
        RefreshStatus::Loading => Color::Yellow,
        RefreshStatus::Failed => Color::Red,
        RefreshStatus::Missing => Color::DarkGray,
    }
}

pub fn category_color(category: ChannelCategory) -> Color {
    match category {
        ChannelCategory::Tv => Color::Blue,
        ChannelCategory::Movies => Color::Magenta,
        ChannelCategory::Series => Color::LightCyan,
        ChannelCategory::Other => Color::DarkGray,
    }
}

/// Spinner glyph for `tick`.
pub fn spinner(tick: u32) -> &'static str {
    let index = usize::try_from(tick).unwrap_or(0) % SPINNER.len();
    SPINNER.get(index).copied().unwrap_or("|")
}

pub fn key_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

pub fn separator_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn error_style() -> Style {
    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
}
