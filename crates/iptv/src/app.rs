//! Application state for the IPTV terminal client.
//!
//! `App` combines the latest [`SessionView`] published by the session task
//! with view-local state: the login form, the channel search, the current
//! page and the dashboard data loaded from the backend.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use iptv_core::{ChannelCategory, ChannelStats, Credentials, SessionPhase};
use iptv_protocol::{ChannelListResponse, ChannelQuery};

use crate::error::ClientError;
use crate::session::SessionView;

/// Channels per dashboard page.
pub const PAGE_SIZE: u32 = 25;

// ============================================================================
// Login Form
// ============================================================================

/// Focused login form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Host,
    Username,
    Password,
}

impl LoginField {
    pub const ALL: [LoginField; 3] = [Self::Host, Self::Username, Self::Password];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Host => "Host",
            Self::Username => "Username",
            Self::Password => "Password",
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Host => Self::Username,
            Self::Username => Self::Password,
            Self::Password => Self::Host,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Host => Self::Password,
            Self::Username => Self::Host,
            Self::Password => Self::Username,
        }
    }
}

/// Login form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub host: String,
    pub username: String,
    pub password: String,
    pub focus: LoginField,
}

impl LoginForm {
    /// Text to display for `field`. The password is masked.
    pub fn display_value(&self, field: LoginField) -> String {
        match field {
            LoginField::Host => self.host.clone(),
            LoginField::Username => self.username.clone(),
            LoginField::Password => "*".repeat(self.password.chars().count()),
        }
    }

    pub fn push(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    pub fn pop(&mut self) {
        self.focused_mut().pop();
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    /// Credentials as typed. Validation is left to the session.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.host.trim(),
            self.username.trim(),
            self.password.clone(),
        )
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Host => &mut self.host,
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }
}

// ============================================================================
// Dashboard State
// ============================================================================

/// How key presses are interpreted on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing into the search box.
    Search,
}

/// Cycles `None -> tv -> movies -> series -> other -> None`.
fn next_category(current: Option<ChannelCategory>) -> Option<ChannelCategory> {
    match current {
        None => Some(ChannelCategory::Tv),
        Some(ChannelCategory::Tv) => Some(ChannelCategory::Movies),
        Some(ChannelCategory::Movies) => Some(ChannelCategory::Series),
        Some(ChannelCategory::Series) => Some(ChannelCategory::Other),
        Some(ChannelCategory::Other) => None,
    }
}

// ============================================================================
// Application
// ============================================================================

/// Core application state.
#[derive(Debug, Clone, Default)]
pub struct App {
    /// Latest session view.
    pub session: SessionView,

    pub login: LoginForm,

    pub mode: InputMode,

    /// Search box contents while editing.
    pub search_input: String,

    /// Search applied to the channel list.
    pub search: Option<String>,

    /// Category applied to the channel list.
    pub category: Option<ChannelCategory>,

    /// 1-based page number.
    pub page: u32,

    /// Last channel page loaded.
    pub channels: Option<ChannelListResponse>,

    pub stats: Option<ChannelStats>,

    /// Error of the last dashboard load.
    pub load_error: Option<String>,

    /// Index into `channels` of the highlighted row.
    pub selected_index: usize,

    /// Spinner frame for the loading screens.
    pub tick_count: u32,

    pub should_quit: bool,

    /// Id of the newest channel load. Older results are dropped.
    load_seq: u64,
}

impl App {
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    /// Stores a new session view.
    ///
    /// Returns true when the dashboard data should be (re)loaded: on
    /// entering `Ready`, or when the cache timestamp changed while ready.
    pub fn update_session(&mut self, view: SessionView) -> bool {
        let previous = std::mem::replace(&mut self.session, view);
        let phase = self.session.phase;

        if phase == SessionPhase::NotLoggedIn && previous.phase != SessionPhase::NotLoggedIn {
            self.reset_dashboard();
        }
        if previous.phase == SessionPhase::NotLoggedIn && phase != SessionPhase::NotLoggedIn {
            self.login.password.clear();
        }

        if phase != SessionPhase::Ready {
            return false;
        }
        previous.phase != SessionPhase::Ready
            || cache_stamp(&previous) != cache_stamp(&self.session)
    }

    fn reset_dashboard(&mut self) {
        self.mode = InputMode::Normal;
        self.search_input.clear();
        self.search = None;
        self.category = None;
        self.page = 1;
        self.channels = None;
        self.stats = None;
        self.load_error = None;
        self.selected_index = 0;
    }

    // ------------------------------------------------------------------------
    // Channel loading
    // ------------------------------------------------------------------------

    /// Query for the current page, search and category.
    pub fn channel_query(&self) -> ChannelQuery {
        let mut query = ChannelQuery::page(self.page, PAGE_SIZE);
        if let Some(search) = &self.search {
            query = query.with_search(search.clone());
        }
        if let Some(category) = self.category {
            query = query.with_category(category.as_str());
        }
        query
    }

    /// Starts a channel load and returns its id and query.
    pub fn begin_channel_load(&mut self) -> (u64, ChannelQuery) {
        self.load_seq = self.load_seq.wrapping_add(1);
        (self.load_seq, self.channel_query())
    }

    /// Applies a channel load result, unless a newer load was started.
    pub fn apply_channels(&mut self, seq: u64, result: Result<ChannelListResponse, ClientError>) {
        if seq != self.load_seq {
            return;
        }
        match result {
            Ok(response) => {
                self.page = response.page.max(1);
                self.channels = Some(response);
                self.load_error = None;
                self.clamp_selection();
            }
            Err(e) => self.load_error = Some(e.to_string()),
        }
    }

    pub fn apply_stats(&mut self, result: Result<ChannelStats, ClientError>) {
        match result {
            Ok(stats) => self.stats = Some(stats),
            Err(e) => self.load_error = Some(e.to_string()),
        }
    }

    /// Total pages of the current listing (at least 1).
    pub fn page_count(&self) -> u64 {
        self.channels
            .as_ref()
            .map(ChannelListResponse::page_count)
            .unwrap_or(1)
    }

    /// Moves to the next page. Returns true if the page changed.
    pub fn next_page(&mut self) -> bool {
        if u64::from(self.page) >= self.page_count() {
            return false;
        }
        self.page = self.page.saturating_add(1);
        self.selected_index = 0;
        true
    }

    /// Moves to the previous page. Returns true if the page changed.
    pub fn previous_page(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page = self.page.saturating_sub(1);
        self.selected_index = 0;
        true
    }

    /// Switches to the next category filter and back to page 1.
    pub fn cycle_category(&mut self) {
        self.category = next_category(self.category);
        self.page = 1;
        self.selected_index = 0;
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    pub fn begin_search(&mut self) {
        self.mode = InputMode::Search;
        self.search_input = self.search.clone().unwrap_or_default();
    }

    pub fn cancel_search(&mut self) {
        self.mode = InputMode::Normal;
        self.search_input.clear();
    }

    /// Applies the typed search. An empty box clears the filter.
    pub fn submit_search(&mut self) {
        self.mode = InputMode::Normal;
        let text = self.search_input.trim();
        self.search = if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
        self.search_input.clear();
        self.page = 1;
        self.selected_index = 0;
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    fn row_count(&self) -> usize {
        self.channels.as_ref().map(|c| c.channels.len()).unwrap_or(0)
    }

    fn clamp_selection(&mut self) {
        let rows = self.row_count();
        if rows == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= rows {
            self.selected_index = rows.saturating_sub(1);
        }
    }

    pub fn select_next(&mut self) {
        let rows = self.row_count();
        if rows == 0 {
            self.selected_index = 0;
            return;
        }
        self.selected_index = self.selected_index.saturating_add(1) % rows;
    }

    pub fn select_previous(&mut self) {
        let rows = self.row_count();
        if rows == 0 {
            self.selected_index = 0;
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = rows.saturating_sub(1);
        } else {
            self.selected_index = self.selected_index.saturating_sub(1);
        }
    }

    // ------------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------------

    /// The single error shown in the footer. Session errors win.
    pub fn error_message(&self) -> Option<&str> {
        self.session
            .error
            .as_deref()
            .or(self.load_error.as_deref())
    }

    /// Advances the spinner by one frame.
    pub fn tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn cache_stamp(view: &SessionView) -> Option<(Option<chrono::DateTime<chrono::Utc>>, u64)> {
    view.snapshot
        .as_ref()
        .map(|s| (s.last_refresh, s.channel_count))
}
