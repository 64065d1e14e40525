//! Channel entries and category normalization.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

// ============================================================================
// Channel Category
// ============================================================================

/// Coarse bucket a channel is sorted into, derived from its group title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelCategory {
    Tv,
    Movies,
    Series,
    #[default]
    Other,
}

/// Keyword table checked in order; the first bucket with a keyword contained
/// in the lowercased group wins.
const CATEGORY_KEYWORDS: &[(ChannelCategory, &[&str])] = &[
    (
        ChannelCategory::Movies,
        &["movie", "movies", "vod", "film", "cinema"],
    ),
    (
        ChannelCategory::Series,
        &["series", "shows", "show", "season", "episode"],
    ),
    (
        ChannelCategory::Tv,
        &[
            "live",
            "tv",
            "sports",
            "sport",
            "news",
            "kids",
            "music",
            "entertainment",
        ],
    ),
];

impl ChannelCategory {
    pub const ALL: [ChannelCategory; 4] = [Self::Tv, Self::Movies, Self::Series, Self::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tv => "tv",
            Self::Movies => "movies",
            Self::Series => "series",
            Self::Other => "other",
        }
    }

    /// Derives a category from a raw group title.
    ///
    /// Matching is a case-insensitive substring search, so `"UK | Sports HD"`
    /// lands in `Tv` and `"VOD - Action"` in `Movies`.
    pub fn from_group(group: &str) -> Self {
        let normalized = group.trim().to_lowercase();
        if normalized.is_empty() {
            return Self::Other;
        }
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| normalized.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(Self::Other)
    }

    /// Accepts an explicit category label, falling back to the group title
    /// (or the label itself) when the label is not one of the known buckets.
    pub fn coerce(label: Option<&str>, group: Option<&str>) -> Self {
        let normalized = label.unwrap_or_default().trim().to_lowercase();
        if let Ok(category) = normalized.parse() {
            return category;
        }
        Self::from_group(group.unwrap_or(&normalized))
    }
}

impl FromStr for ChannelCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tv" => Ok(Self::Tv),
            "movies" => Ok(Self::Movies),
            "series" => Ok(Self::Series),
            "other" => Ok(Self::Other),
            other => Err(DomainError::ParseError {
                field: "category".to_string(),
                reason: format!("unknown category '{other}'"),
            }),
        }
    }
}

impl fmt::Display for ChannelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Channel
// ============================================================================

/// A single playlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub group: String,
    pub category: ChannelCategory,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvg_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvg_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvg_chno: Option<String>,
}

impl Channel {
    /// Creates a channel, deriving the category from the group.
    pub fn new(name: impl Into<String>, group: impl Into<String>, url: impl Into<String>) -> Self {
        let group = group.into();
        Self {
            name: name.into(),
            category: ChannelCategory::from_group(&group),
            group,
            url: url.into(),
            tvg_id: None,
            tvg_name: None,
            tvg_logo: None,
            tvg_chno: None,
        }
    }
}

// ============================================================================
// Channel Stats
// ============================================================================

/// Per-category channel counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelStats {
    pub total: u64,
    pub tv: u64,
    pub movies: u64,
    pub series: u64,
    pub other: u64,
}

impl ChannelStats {
    pub fn from_channels<'a>(channels: impl IntoIterator<Item = &'a Channel>) -> Self {
        let mut stats = Self::default();
        for channel in channels {
            stats.record(channel.category);
        }
        stats
    }

    fn record(&mut self, category: ChannelCategory) {
        self.total = self.total.saturating_add(1);
        let bucket = match category {
            ChannelCategory::Tv => &mut self.tv,
            ChannelCategory::Movies => &mut self.movies,
            ChannelCategory::Series => &mut self.series,
            ChannelCategory::Other => &mut self.other,
        };
        *bucket = bucket.saturating_add(1);
    }

    pub fn count(&self, category: ChannelCategory) -> u64 {
        match category {
            ChannelCategory::Tv => self.tv,
            ChannelCategory::Movies => self.movies,
            ChannelCategory::Series => self.series,
            ChannelCategory::Other => self.other,
        }
    }
}
