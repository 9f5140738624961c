//! Intent coercion and the deterministic fallback.
//!
//! The language model's reply is untrusted: every field is validated and
//! coerced into the fixed [`Intent`] shape, with an explicit default for
//! anything missing or malformed. When the reply cannot be read at all the
//! caller uses [`fallback_intent`], which needs nothing but the query text.
//!
//! # Reply shape
//!
//! ```json
//! {
//!   "dataTypes": ["forumPosts", "videos"],
//!   "filters": { "tags": ["led"], "dateRange": "thisMonth", "location": "Austin" },
//!   "keywords": ["led", "installation"],
//!   "sortBy": "recency"
//! }
//! ```

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::models::{
    DateRange, Intent, IntentFilters, ResolvedDateRange, SortPreference, SourceType,
};

/// Tokens shorter than this are treated as stop-words.
pub const MIN_KEYWORD_LEN: usize = 3;

/// Split a query into lowercase keywords.
///
/// Splits on whitespace and drops tokens shorter than [`MIN_KEYWORD_LEN`]
/// characters. Tokens are kept verbatim otherwise, so `c++` and `3/4"`
/// survive; scoring counts each distinct keyword once.
pub fn split_keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= MIN_KEYWORD_LEN)
        .collect()
}

/// The intent used whenever the language model is unavailable or unreadable:
/// all sources, no filters, keywords from [`split_keywords`], relevance order.
pub fn fallback_intent(query: &str) -> Intent {
    Intent::all_sources(split_keywords(query))
}

/// Parse a raw model reply into an [`Intent`].
///
/// Accepts a bare JSON object or one wrapped in a Markdown code fence.
/// Returns an error if the text is not a JSON object; callers treat that as a
/// signal to use [`fallback_intent`].
pub fn parse_model_reply(reply: &str, query: &str, now: DateTime<Utc>) -> Result<Intent> {
    let body = strip_code_fence(reply);
    let value: Value =
        serde_json::from_str(body).with_context(|| "Model reply is not valid JSON")?;
    if !value.is_object() {
        bail!("Model reply is not a JSON object");
    }
    Ok(coerce_intent(&value, query, now))
}

/// Coerce an already-parsed JSON value into an [`Intent`].
///
/// Never fails; every field has a default.
pub fn coerce_intent(raw: &Value, query: &str, now: DateTime<Utc>) -> Intent {
    let mut source_types: BTreeSet<SourceType> = string_list(raw.get("dataTypes"))
        .iter()
        .filter_map(|name| SourceType::parse_loose(name))
        .collect();
    if source_types.is_empty() {
        source_types = SourceType::ALL.into_iter().collect();
    }

    let keywords = {
        let joined = string_list(raw.get("keywords")).join(" ");
        let coerced = split_keywords(&joined);
        if coerced.is_empty() {
            split_keywords(query)
        } else {
            coerced
        }
    };

    let sort_preference = raw
        .get("sortBy")
        .and_then(|v| v.as_str())
        .and_then(SortPreference::parse_loose)
        .unwrap_or_default();

    Intent {
        source_types,
        filters: coerce_filters(raw.get("filters"), now),
        keywords,
        sort_preference,
    }
}

fn coerce_filters(raw: Option<&Value>, now: DateTime<Utc>) -> IntentFilters {
    let Some(obj) = raw.and_then(|v| v.as_object()) else {
        return IntentFilters::default();
    };

    let tags: BTreeSet<String> = string_list(obj.get("tags"))
        .iter()
        .flat_map(|t| t.split(','))
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let date_range = obj
        .get("dateRange")
        .and_then(|v| v.as_str())
        .and_then(DateRange::parse_loose)
        .map(|bucket| ResolvedDateRange {
            bucket,
            window: bucket.resolve(now),
        });

    let location = obj
        .get("location")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    IntentFilters {
        tags,
        date_range,
        location,
    }
}

/// Read a field that should be an array of strings but may be a lone string.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
