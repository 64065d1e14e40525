//! Layout helpers for the IPTV terminal client.

use ratatui::layout::{Constraint, Direction, Flex, Layout, Rect};

/// Main application layout areas.
///
/// - Header (3 lines): title, phase and stats
/// - Content (fills remaining): login form, loading screen or dashboard
/// - Footer (3 lines): error line or keybinding help
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub header: Rect,
    pub content: Rect,
    pub footer: Rect,
}

impl AppLayout {
    pub fn new(area: Rect) -> Self {
        let [header, content, footer] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(10),   // Content (minimum 10 lines)
                Constraint::Length(3), // Footer
            ])
            .areas(area);

        Self {
            header,
            content,
            footer,
        }
    }
}

/// Dashboard split: a search line above the channel table.
#[derive(Debug, Clone, Copy)]
pub struct DashboardLayout {
    pub search: Rect,
    pub table: Rect,
}

impl DashboardLayout {
    pub fn new(area: Rect) -> Self {
        let [search, table] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(5)])
            .areas(area);
        Self { search, table }
    }
}

/// A `width` x `height` rectangle centered in `area`, clamped to it.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}
