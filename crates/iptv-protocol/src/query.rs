//! `GET /channels` query parameters, validation, filtering and pagination.
//!
//! Filtering always happens before pagination, so `total` counts every
//! matching channel and `page` selects a window of the filtered sequence.

use iptv_core::{Channel, ChannelCategory};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size used when the query does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Raw Query
// ============================================================================

/// Query string of `GET /channels`, as sent by clients.
///
/// Numbers are signed so that out-of-range values reach validation and
/// are reported as such instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    /// Case-insensitive substring of the channel name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Exact category (`tv`, `movies`, `series`, `other`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Case-insensitive substring of the raw group title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl ChannelQuery {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(i64::from(page)),
            page_size: Some(i64::from(page_size)),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Validates the raw parameters.
    ///
    /// # Errors
    ///
    /// - `QueryError::Page` if `page < 1`
    /// - `QueryError::PageSize` if `page_size` is outside `1..=100`
    /// - `QueryError::EmptyFilter` if a filter is present but empty
    ///
    /// An unknown category is not an error: it yields a page that matches
    /// nothing.
    pub fn validate(&self) -> Result<ChannelPage, QueryError> {
        let page = match self.page {
            None => 1,
            Some(p) if p >= 1 => u32::try_from(p).map_err(|_| QueryError::Page(p))?,
            Some(p) => return Err(QueryError::Page(p)),
        };

        let page_size = match self.page_size {
            None => DEFAULT_PAGE_SIZE,
            Some(s) if (1..=i64::from(MAX_PAGE_SIZE)).contains(&s) => {
                u32::try_from(s).map_err(|_| QueryError::PageSize(s))?
            }
            Some(s) => return Err(QueryError::PageSize(s)),
        };

        let search = non_empty("search", self.search.as_deref())?;
        let group = non_empty("group", self.group.as_deref())?;
        let category = match non_empty("category", self.category.as_deref())? {
            None => CategoryFilter::Any,
            Some(label) => match label.parse::<ChannelCategory>() {
                Ok(category) => CategoryFilter::Only(category),
                Err(_) => CategoryFilter::Unknown(label),
            },
        };

        Ok(ChannelPage {
            page,
            page_size,
            search,
            category,
            group,
        })
    }
}

/// Lowercases a filter value, rejecting empty strings.
fn non_empty(field: &'static str, value: Option<&str>) -> Result<Option<String>, QueryError> {
    match value {
        None => Ok(None),
        Some(v) if v.is_empty() => Err(QueryError::EmptyFilter(field)),
        Some(v) => Ok(Some(v.to_lowercase())),
    }
}

// ============================================================================
// Validated Query
// ============================================================================

/// Category part of a validated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    Any,
    Only(ChannelCategory),
    /// A label that is not a known category; matches nothing.
    Unknown(String),
}

/// A validated `GET /channels` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPage {
    pub page: u32,
    pub page_size: u32,
    search: Option<String>,
    category: CategoryFilter,
    group: Option<String>,
}

impl ChannelPage {
    pub fn category(&self) -> &CategoryFilter {
        &self.category
    }

    /// True when the category filter can never match.
    pub fn matches_nothing(&self) -> bool {
        matches!(self.category, CategoryFilter::Unknown(_))
    }

    /// Applies the filters to one channel.
    pub fn matches(&self, channel: &Channel) -> bool {
        if let Some(search) = &self.search {
            if !channel.name.to_lowercase().contains(search) {
                return false;
            }
        }
        match &self.category {
            CategoryFilter::Any => {}
            CategoryFilter::Only(category) if *category == channel.category => {}
            CategoryFilter::Only(_) | CategoryFilter::Unknown(_) => return false,
        }
        if let Some(group) = &self.group {
            if !channel.group.to_lowercase().contains(group) {
                return false;
            }
        }
        true
    }

    /// Filters `channels` and returns the requested page plus the total
    /// number of matches.
    pub fn select<'a>(&self, channels: impl IntoIterator<Item = &'a Channel>) -> (Vec<Channel>, u64) {
        let size = u64::from(self.page_size);
        let offset = u64::from(self.page.saturating_sub(1)).saturating_mul(size);
        let end = offset.saturating_add(size);

        let mut items = Vec::new();
        let mut total: u64 = 0;
        for channel in channels.into_iter().filter(|c| self.matches(c)) {
            if (offset..end).contains(&total) {
                items.push(channel.clone());
            }
            total = total.saturating_add(1);
        }
        (items, total)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Rejected `GET /channels` parameters (HTTP 422).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("page must be greater than or equal to 1 (got {0})")]
    Page(i64),

    #[error("page_size must be between 1 and {max} (got {0})", max = MAX_PAGE_SIZE)]
    PageSize(i64),

    #[error("{0} must not be empty")]
    EmptyFilter(&'static str),
}
