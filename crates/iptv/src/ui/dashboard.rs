//! Channel dashboard: search line and paginated channel table.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table},
    Frame,
};

use iptv_core::Channel;

use crate::app::{App, InputMode};
use crate::ui::layout::DashboardLayout;
use crate::ui::theme::category_color;

/// Renders the dashboard into the content area.
pub fn render_dashboard(frame: &mut Frame, area: Rect, app: &App) {
    let layout = DashboardLayout::new(area);
    render_search(frame, layout.search, app);
    render_channels(frame, layout.table, app);
}

fn render_search(frame: &mut Frame, area: Rect, app: &App) {
    let editing = app.mode == InputMode::Search;

    let mut spans = vec![Span::styled("Search: ", Style::default().fg(Color::DarkGray))];
    if editing {
        spans.push(Span::raw(app.search_input.clone()));
        spans.push(Span::styled("_", Style::default().fg(Color::Cyan)));
    } else {
        spans.push(Span::raw(
            app.search.clone().unwrap_or_else(|| "(none)".to_string()),
        ));
    }
    spans.push(Span::styled("  Category: ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::raw(
        app.category.map(|c| c.as_str()).unwrap_or("all").to_string(),
    ));

    let border = if editing { Color::Cyan } else { Color::DarkGray };
    let search = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(search, area);
}

fn render_channels(frame: &mut Frame, area: Rect, app: &App) {
    let Some(listing) = &app.channels else {
        render_message(frame, area, "Loading channels...");
        return;
    };
    if listing.channels.is_empty() {
        let message = if listing.cached {
            "No channels match the current filters"
        } else {
            "No playlist cached yet"
        };
        render_message(frame, area, message);
        return;
    }

    let rows: Vec<Row> = listing
        .channels
        .iter()
        .enumerate()
        .map(|(index, channel)| channel_row(channel, index == app.selected_index))
        .collect();

    let title = format!(
        " Channels ({}) | page {}/{} ",
        listing.total,
        listing.page,
        listing.page_count()
    );
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(45),
            Constraint::Percentage(40),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(["Name", "Group", "Type"])
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::White)),
    );
    frame.render_widget(table, area);
}

fn channel_row(channel: &Channel, selected: bool) -> Row<'static> {
    let marker = if selected { ">" } else { " " };
    let row = Row::new(vec![
        Line::from(vec![
            Span::styled(
                marker,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(channel.name.clone()),
        ]),
        Line::from(Span::styled(
            channel.group.clone(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            channel.category.as_str(),
            Style::default().fg(category_color(channel.category)),
        )),
    ]);
    if selected {
        row.style(Style::default().bg(Color::Rgb(30, 30, 40)))
    } else {
        row
    }
}

fn render_message(frame: &mut Frame, area: Rect, message: &str) {
    let paragraph = Paragraph::new(Span::styled(
        message.to_string(),
        Style::default().fg(Color::DarkGray),
    ))
    .block(Block::default().borders(Borders::ALL).title(" Channels "));
    frame.render_widget(paragraph, area);
}
