//! Core data models shared by the parser, adapters, ranker, and stores.
//!
//! An [`Intent`] is the structured reading of one free-text query. Adapters
//! turn it into store queries and return normalized [`SearchResult`]s, which
//! the ranker scores and merges.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A searchable content type. Each has exactly one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    Files,
    People,
    Events,
    ForumPosts,
    Stories,
    Videos,
    Equipment,
    Suppliers,
}

impl SourceType {
    /// Every known source type, in fan-out order.
    pub const ALL: [SourceType; 8] = [
        SourceType::Files,
        SourceType::People,
        SourceType::Events,
        SourceType::ForumPosts,
        SourceType::Stories,
        SourceType::Videos,
        SourceType::Equipment,
        SourceType::Suppliers,
    ];

    /// Canonical wire name (matches the language-model contract).
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Files => "files",
            SourceType::People => "people",
            SourceType::Events => "events",
            SourceType::ForumPosts => "forumPosts",
            SourceType::Stories => "stories",
            SourceType::Videos => "videos",
            SourceType::Equipment => "equipment",
            SourceType::Suppliers => "suppliers",
        }
    }

    /// Lenient lookup accepting the canonical name plus common synonyms.
    ///
    /// Case and separators are ignored, so `"forum_posts"`, `"Forum Posts"`
    /// and `"forumPosts"` all resolve to [`SourceType::ForumPosts`].
    pub fn parse_loose(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let source = match folded.as_str() {
            "files" | "file" | "documents" | "document" | "docs" => SourceType::Files,
            "people" | "person" | "owners" | "owner" | "members" | "users" => SourceType::People,
            "events" | "event" => SourceType::Events,
            "forumposts" | "forumpost" | "forum" | "posts" | "threads" => SourceType::ForumPosts,
            "stories" | "story" => SourceType::Stories,
            "videos" | "video" => SourceType::Videos,
            "equipment" => SourceType::Equipment,
            "suppliers" | "supplier" | "vendors" => SourceType::Suppliers,
            _ => return None,
        };
        Some(source)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceType::parse_loose(s).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown source type: '{}'. Use one of: {}",
                s,
                SourceType::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }
}

/// Requested result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortPreference {
    #[default]
    Relevance,
    Recency,
    Popularity,
}

impl SortPreference {
    pub fn parse_loose(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "relevance" | "relevant" | "best" => Some(SortPreference::Relevance),
            "recency" | "recent" | "date" | "newest" | "latest" => Some(SortPreference::Recency),
            "popularity" | "popular" | "views" | "trending" => Some(SortPreference::Popularity),
            _ => None,
        }
    }
}

/// Named date bucket a query may ask for ("this week", "upcoming", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateRange {
    Today,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    ThisYear,
    Upcoming,
}

impl DateRange {
    pub fn parse_loose(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "today" => Some(DateRange::Today),
            "thisweek" | "week" => Some(DateRange::ThisWeek),
            "lastweek" | "pastweek" => Some(DateRange::LastWeek),
            "thismonth" | "month" => Some(DateRange::ThisMonth),
            "lastmonth" | "pastmonth" => Some(DateRange::LastMonth),
            "thisyear" | "year" => Some(DateRange::ThisYear),
            "upcoming" | "future" | "soon" => Some(DateRange::Upcoming),
            _ => None,
        }
    }

    /// Resolve the bucket to a concrete `[start, end]` window relative to `now`.
    ///
    /// Weeks start on Monday. `Upcoming` covers the next 30 days.
    pub fn resolve(&self, now: DateTime<Utc>) -> TimeWindow {
        let today = now.date_naive();
        let week_start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        let month_start = today.with_day(1).unwrap_or(today);

        let (start, end) = match self {
            DateRange::Today => (start_of(today), start_of(today + Duration::days(1))),
            DateRange::ThisWeek => (start_of(week_start), start_of(week_start + Duration::days(7))),
            DateRange::LastWeek => (start_of(week_start - Duration::days(7)), start_of(week_start)),
            DateRange::ThisMonth => (start_of(month_start), start_of(next_month(month_start))),
            DateRange::LastMonth => (start_of(prev_month(month_start)), start_of(month_start)),
            DateRange::ThisYear => {
                let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let next_year = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(today);
                (start_of(year_start), start_of(next_year))
            }
            DateRange::Upcoming => (now, now + Duration::days(30)),
        };

        // Windows are half-open in spirit; store filters are inclusive, so
        // pull the end back by one millisecond.
        let end = if matches!(self, DateRange::Upcoming) {
            end
        } else {
            end - Duration::milliseconds(1)
        };

        TimeWindow { start, end }
    }
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

fn next_month(first: NaiveDate) -> NaiveDate {
    let (y, m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(first)
}

fn prev_month(first: NaiveDate) -> NaiveDate {
    let (y, m) = if first.month() == 1 {
        (first.year() - 1, 12)
    } else {
        (first.year(), first.month() - 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(first)
}

/// Concrete inclusive time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A date bucket together with the window it resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDateRange {
    pub bucket: DateRange,
    #[serde(flatten)]
    pub window: TimeWindow,
}

/// Filters extracted from a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentFilters {
    /// Inclusion filter: a record matches when it carries any of these tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub date_range: Option<ResolvedDateRange>,
    /// Free-text place name matched against city/state fields.
    #[serde(default)]
    pub location: Option<String>,
}

impl IntentFilters {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.date_range.is_none() && self.location.is_none()
    }
}

/// Structured interpretation of a free-text query.
///
/// `source_types` is never empty: every constructor in this crate falls back
/// to [`SourceType::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub source_types: BTreeSet<SourceType>,
    pub filters: IntentFilters,
    pub keywords: Vec<String>,
    pub sort_preference: SortPreference,
}

impl Intent {
    /// An intent that searches every source with the given keywords.
    pub fn all_sources(keywords: Vec<String>) -> Self {
        Self {
            source_types: SourceType::ALL.into_iter().collect(),
            filters: IntentFilters::default(),
            keywords,
            sort_preference: SortPreference::Relevance,
        }
    }

    pub fn targets(&self, source_type: SourceType) -> bool {
        self.source_types.contains(&source_type)
    }
}

/// A normalized hit from one content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Unique within `source_type` only.
    pub id: String,
    pub source_type: SourceType,
    pub title: String,
    pub description: String,
    /// Deep link for the UI.
    pub link: String,
    /// Source-specific display fields (author, counts, dates).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Creation time; `None` scores as the Unix epoch.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Assigned by the ranker; zero until scored.
    #[serde(default)]
    pub score: f64,
}

/// One prior turn of a conversational search session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

/// A persisted record of one search invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_context: Option<Vec<ConversationTurn>>,
}

/// A query string and how often it was searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularSearch {
    pub query: String,
    pub count: u64,
}
