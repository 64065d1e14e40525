//! Login form screen.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{LoginField, LoginForm};
use crate::ui::layout::centered;

const FORM_WIDTH: u16 = 60;
/// Three bordered inputs plus the outer border.
const FORM_HEIGHT: u16 = 11;

/// Renders the host / username / password form.
pub fn render_login_form(frame: &mut Frame, area: Rect, form: &LoginForm) {
    let outer = centered(area, FORM_WIDTH, FORM_HEIGHT);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Sign in to your IPTV provider ")
        .border_style(Style::default().fg(Color::White));
    let inner = block.inner(outer);
    frame.render_widget(block, outer);

    let rows = Layout::vertical([Constraint::Length(3); 3]).split(inner);
    for (field, row) in LoginField::ALL.iter().zip(rows.iter()) {
        render_field(frame, *row, form, *field);
    }
}

fn render_field(frame: &mut Frame, area: Rect, form: &LoginForm, field: LoginField) {
    let focused = form.focus == field;
    let border_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut spans = vec![Span::raw(form.display_value(field))];
    if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Cyan)));
    }

    let input = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", field.label()))
            .border_style(border_style),
    );
    frame.render_widget(input, area);
}
