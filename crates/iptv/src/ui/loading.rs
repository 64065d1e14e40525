//! Connecting, signing-in and refreshing screens.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use iptv_core::{SessionPhase, StatusSnapshot};

use crate::app::App;
use crate::ui::layout::centered;
use crate::ui::theme::{refresh_status_color, spinner};

const PANEL_WIDTH: u16 = 64;
const PANEL_HEIGHT: u16 = 9;

/// Renders the loading screen for `Boot`, `LoggingIn` and `Refreshing`.
pub fn render_loading(frame: &mut Frame, area: Rect, app: &App, now: DateTime<Utc>) {
    let lines = loading_lines(app, now);
    let panel = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    frame.render_widget(panel, centered(area, PANEL_WIDTH, PANEL_HEIGHT));
}

fn loading_lines(app: &App, now: DateTime<Utc>) -> Vec<Line<'static>> {
    let title = match app.phase() {
        SessionPhase::Boot => "Connecting to backend",
        SessionPhase::LoggingIn => "Signing in",
        _ => "Refreshing playlist",
    };
    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(
                format!("{} ", spinner(app.tick_count)),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        ]),
    ];

    if app.phase() == SessionPhase::Refreshing {
        if let Some(snapshot) = &app.session.snapshot {
            lines.extend(refresh_details(snapshot, now));
        }
    }
    lines
}

/// Elapsed time, cached channel count and last refresh outcome.
fn refresh_details(snapshot: &StatusSnapshot, now: DateTime<Utc>) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];

    let progress = match snapshot.refresh_elapsed_secs(now) {
        Some(secs) => format!("Running for {} | ", format_elapsed(secs)),
        None => String::new(),
    };
    lines.push(Line::from(Span::styled(
        format!("{progress}{} channels cached", snapshot.channel_count),
        Style::default().fg(Color::DarkGray),
    )));

    lines.push(Line::from(Span::styled(
        format!("Last refresh: {}", snapshot.refresh_status),
        Style::default().fg(refresh_status_color(snapshot.refresh_status)),
    )));

    if let Some(error) = &snapshot.last_error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    lines
}

/// `75` becomes `"1m 15s"`.
fn format_elapsed(secs: i64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
