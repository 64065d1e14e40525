//! Header and footer bars.
//!
//! - Header: title, session phase and cache summary
//! - Footer: the current error if there is one, keybinding hints otherwise

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use iptv_core::SessionPhase;

use crate::app::{App, InputMode};
use crate::ui::theme::{error_style, key_style, phase_color, phase_label, separator_style};

/// Renders the header bar.
pub fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let phase = app.phase();
    let color = phase_color(phase);

    let mut spans = vec![
        Span::styled(
            "IPTV",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" - Playlist Aggregator | "),
        Span::styled(
            phase_label(phase),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(summary) = summary(app) {
        spans.push(Span::styled(summary, Style::default().fg(Color::DarkGray)));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color)),
    );
    frame.render_widget(header, area);
}

/// Cache summary shown next to the phase once logged in.
fn summary(app: &App) -> Option<String> {
    if !app.phase().is_logged_in() {
        return None;
    }
    let snapshot = app.session.snapshot.as_ref()?;

    let mut text = format!(" | {} channels", snapshot.channel_count);
    if let Some(stats) = &app.stats {
        text.push_str(&format!(
            " ({} tv, {} movies, {} series)",
            stats.tv, stats.movies, stats.series
        ));
    }
    if let Some(last) = snapshot.last_refresh {
        text.push_str(&format!(" | updated {}", last.format("%Y-%m-%d %H:%M UTC")));
    }
    Some(text)
}

/// Renders the footer bar.
pub fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let line = match app.error_message() {
        Some(error) => Line::from(vec![
            Span::styled(" Error: ", error_style()),
            Span::styled(error.to_string(), Style::default().fg(Color::Red)),
        ]),
        None => Line::from(hints(app)),
    };

    let footer = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

/// Keybinding hints for the current phase and mode.
fn hints(app: &App) -> Vec<Span<'static>> {
    let bindings: &[(&str, &str)] = match (app.phase(), app.mode) {
        (SessionPhase::NotLoggedIn, _) => &[
            ("Tab", "next field"),
            ("Enter", "sign in"),
            ("F5", "recheck"),
            ("Esc", "quit"),
        ],
        (SessionPhase::Ready, InputMode::Search) => {
            &[("Enter", "apply"), ("Esc", "cancel")]
        }
        (SessionPhase::Ready, InputMode::Normal) => &[
            ("j/k", "move"),
            ("n/p", "page"),
            ("/", "search"),
            ("c", "category"),
            ("r", "refresh"),
            ("l", "logout"),
            ("q", "quit"),
        ],
        (SessionPhase::Refreshing, _) => &[("r", "retry"), ("l", "logout"), ("q", "quit")],
        (SessionPhase::Boot | SessionPhase::LoggingIn, _) => &[("q", "quit")],
    };

    let mut spans = Vec::new();
    for (index, (key, label)) in bindings.iter().enumerate() {
        if index > 0 {
            spans.push(Span::styled("  |  ", separator_style()));
        } else {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(*key, key_style()));
        spans.push(Span::raw(format!(" {label}")));
    }
    spans
}
