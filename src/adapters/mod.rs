//! Content source adapters.
//!
//! Each of the eight content types has a [`SourceProfile`] describing its
//! collection, searchable fields, filterable fields and sort fields, plus a
//! `normalize` function mapping a raw record to a [`SearchResult`]. The
//! generic [`StoreAdapter`] turns an [`Intent`] into a [`FindQuery`] using
//! that profile and runs it against a [`ContentStore`].
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               AdapterRegistry                │
//! │  files  people  events  forumPosts  stories  │
//! │  videos  equipment  suppliers  (+ custom)    │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!          QueryOrchestrator::execute() → fan-out
//! ```
//!
//! # Query construction
//!
//! | Intent part | Store filter |
//! |-------------|--------------|
//! | keywords | `Or` of `Contains` over every searchable field × keyword |
//! | `tags` | `AnyOf` on the profile's tag field |
//! | `location` | `Or` of `Contains` over the profile's location fields |
//! | `dateRange` | `Between` on the profile's date field |
//!
//! Parts that a profile has no field for are ignored. Sorting maps
//! `relevance` to store order, `recency` to newest first, and `popularity`
//! to the profile's popularity field (then newest first).

pub mod equipment;
pub mod events;
pub mod files;
pub mod forum;
pub mod people;
pub mod stories;
pub mod suppliers;
pub mod videos;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use federated_search_core::models::{Intent, SearchResult, SortPreference, SourceType};
use federated_search_core::store::{
    value_as_datetime, ContentStore, Filter, FindQuery, Record, SortKey,
};

/// Hard cap on results from any one adapter.
pub const PER_SOURCE_CAP: usize = 10;

/// A searchable content source.
///
/// Implementations must be read-only: `search` never mutates a store.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn source_type(&self) -> SourceType;

    /// Return at most `limit` (and never more than [`PER_SOURCE_CAP`])
    /// normalized results for the intent.
    async fn search(&self, intent: &Intent, limit: usize) -> Result<Vec<SearchResult>>;
}

/// Display fields produced by a profile's normalizer.
pub struct Normalized {
    pub title: String,
    pub description: String,
    pub metadata: Record,
}

/// Static description of one content source.
pub struct SourceProfile {
    pub source_type: SourceType,
    pub collection: &'static str,
    pub searchable: &'static [&'static str],
    pub tag_field: Option<&'static str>,
    pub location_fields: &'static [&'static str],
    pub date_field: Option<&'static str>,
    pub popularity_field: Option<&'static str>,
    /// Path segment for deep links, e.g. `"forum"` → `/forum/{id}`.
    pub link_segment: &'static str,
    /// Field/values pair a record must not match.
    pub exclude: Option<(&'static str, &'static [&'static str])>,
    pub normalize: fn(&Record) -> Normalized,
}

/// Field used for `recency` ordering and for [`SearchResult::created_at`].
pub const CREATED_AT: &str = "created_at";

/// Translate an intent into a store query for one profile.
pub fn build_query(profile: &SourceProfile, intent: &Intent, limit: usize) -> FindQuery {
    let mut parts = Vec::new();

    if !intent.keywords.is_empty() {
        parts.push(Filter::any_field_contains(profile.searchable, &intent.keywords));
    }

    let filters = &intent.filters;
    if let Some(tag_field) = profile.tag_field {
        if !filters.tags.is_empty() {
            parts.push(Filter::AnyOf {
                field: tag_field.to_string(),
                values: filters.tags.iter().cloned().collect(),
            });
        }
    }
    if let Some(location) = &filters.location {
        if !profile.location_fields.is_empty() {
            parts.push(Filter::any_field_contains(
                profile.location_fields,
                std::slice::from_ref(location),
            ));
        }
    }
    if let (Some(date_field), Some(range)) = (profile.date_field, &filters.date_range) {
        parts.push(Filter::Between {
            field: date_field.to_string(),
            start: range.window.start,
            end: range.window.end,
        });
    }
    if let Some((field, values)) = profile.exclude {
        parts.push(Filter::NoneOf {
            field: field.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        });
    }

    let sort = match intent.sort_preference {
        SortPreference::Relevance => Vec::new(),
        SortPreference::Recency => vec![SortKey::desc(CREATED_AT)],
        SortPreference::Popularity => match profile.popularity_field {
            Some(field) => vec![SortKey::desc(field), SortKey::desc(CREATED_AT)],
            None => vec![SortKey::desc(CREATED_AT)],
        },
    };

    FindQuery {
        filter: Filter::all(parts),
        sort,
        limit: limit.min(PER_SOURCE_CAP),
    }
}

/// Map a raw record to a [`SearchResult`]. Records without an id are dropped.
pub fn to_result(profile: &SourceProfile, record: &Record, base_url: &str) -> Option<SearchResult> {
    let id = match record.get("id")? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let normalized = (profile.normalize)(record);
    Some(SearchResult {
        link: format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            profile.link_segment,
            id
        ),
        id,
        source_type: profile.source_type,
        title: normalized.title,
        description: normalized.description,
        metadata: normalized.metadata,
        created_at: record.get(CREATED_AT).and_then(value_as_datetime),
        score: 0.0,
    })
}

/// The adapter used for every built-in source.
pub struct StoreAdapter {
    profile: &'static SourceProfile,
    store: Arc<dyn ContentStore>,
    base_url: String,
}

impl StoreAdapter {
    pub fn new(profile: &'static SourceProfile, store: Arc<dyn ContentStore>, base_url: &str) -> Self {
        Self {
            profile,
            store,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for StoreAdapter {
    fn name(&self) -> &str {
        self.profile.collection
    }

    fn source_type(&self) -> SourceType {
        self.profile.source_type
    }

    async fn search(&self, intent: &Intent, limit: usize) -> Result<Vec<SearchResult>> {
        let query = build_query(self.profile, intent, limit);
        let records = self.store.find(self.profile.collection, &query).await?;
        Ok(records
            .iter()
            .filter_map(|r| to_result(self.profile, r, &self.base_url))
            .take(query.limit)
            .collect())
    }
}

/// Profiles of all built-in sources, in [`SourceType::ALL`] order.
pub fn builtin_profiles() -> [&'static SourceProfile; 8] {
    [
        &files::PROFILE,
        &people::PROFILE,
        &events::PROFILE,
        &forum::PROFILE,
        &stories::PROFILE,
        &videos::PROFILE,
        &equipment::PROFILE,
        &suppliers::PROFILE,
    ]
}

pub fn profile_for(source_type: SourceType) -> &'static SourceProfile {
    match source_type {
        SourceType::Files => &files::PROFILE,
        SourceType::People => &people::PROFILE,
        SourceType::Events => &events::PROFILE,
        SourceType::ForumPosts => &forum::PROFILE,
        SourceType::Stories => &stories::PROFILE,
        SourceType::Videos => &videos::PROFILE,
        SourceType::Equipment => &equipment::PROFILE,
        SourceType::Suppliers => &suppliers::PROFILE,
    }
}

/// Registry of adapters, at most one per source type.
///
/// Use [`AdapterRegistry::with_store`] for the eight built-in adapters over
/// one store, then optionally [`register`](AdapterRegistry::register) a
/// replacement for any source.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// All built-in adapters reading from `store`, with links under `base_url`.
    pub fn with_store(store: Arc<dyn ContentStore>, base_url: &str) -> Self {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            registry.register(Arc::new(StoreAdapter::new(profile, store.clone(), base_url)));
        }
        registry
    }

    /// Register an adapter, replacing any existing one for the same source type.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        let st = adapter.source_type();
        match self.adapters.iter().position(|a| a.source_type() == st) {
            Some(pos) => self.adapters[pos] = adapter,
            None => self.adapters.push(adapter),
        }
    }

    pub fn get(&self, source_type: SourceType) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.source_type() == source_type)
            .cloned()
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Shared normalizer helpers.

pub(crate) fn text(record: &Record, field: &str) -> Option<String> {
    match record.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// First non-empty string among `fields`.
pub(crate) fn first_text(record: &Record, fields: &[&str]) -> String {
    fields
        .iter()
        .find_map(|f| text(record, f))
        .unwrap_or_default()
}

/// Cut `s` to at most `max` characters on a char boundary, adding an ellipsis.
pub(crate) fn excerpt(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    format!("{}…", cut.trim_end())
}

/// Copy the listed fields that are present and non-null.
pub(crate) fn pick(record: &Record, fields: &[&str]) -> Record {
    fields
        .iter()
        .filter_map(|f| match record.get(*f) {
            None | Some(Value::Null) => None,
            Some(v) => Some((f.to_string(), v.clone())),
        })
        .collect()
}

/// `"Austin, TX"` from whichever of city/state exist.
pub(crate) fn place(record: &Record) -> Option<String> {
    let parts: Vec<String> = ["city", "state"]
        .iter()
        .filter_map(|f| text(record, f))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
