//! Relevance scoring and merge.
//!
//! # Scoring
//!
//! 1. Serialize the result (everything except its current score) and case-fold it.
//! 2. Add [`KEYWORD_WEIGHT`] for every distinct keyword found in that text.
//!    Presence counts once; repeated occurrences add nothing.
//! 3. Add [`WEEK_BOOST`] if created within 7 days of `now`, otherwise
//!    [`MONTH_BOOST`] if within 30 days. The boosts do not stack.
//!
//! # Merge
//!
//! Results are stable-sorted by score descending, so ties keep their input
//! order, then truncated to [`MAX_RANKED_RESULTS`].

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::{Intent, SearchResult, SourceType};

pub const KEYWORD_WEIGHT: f64 = 10.0;
pub const WEEK_BOOST: f64 = 5.0;
pub const MONTH_BOOST: f64 = 3.0;
/// Upper bound on the merged list, whatever the caller asks for.
pub const MAX_RANKED_RESULTS: usize = 20;

/// Borrowed view of a result used for keyword matching; excludes `score` so
/// that re-ranking an already scored list gives the same answer.
#[derive(Serialize)]
struct ScoringView<'a> {
    id: &'a str,
    source_type: SourceType,
    title: &'a str,
    description: &'a str,
    link: &'a str,
    metadata: &'a serde_json::Map<String, serde_json::Value>,
    created_at: &'a Option<DateTime<Utc>>,
}

fn scoring_text(result: &SearchResult) -> String {
    let view = ScoringView {
        id: &result.id,
        source_type: result.source_type,
        title: &result.title,
        description: &result.description,
        link: &result.link,
        metadata: &result.metadata,
        created_at: &result.created_at,
    };
    serde_json::to_string(&view)
        .unwrap_or_else(|_| format!("{} {}", result.title, result.description))
        .to_lowercase()
}

/// Recency boost for a creation time. Missing timestamps count as the epoch.
pub fn recency_boost(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let created = created_at.unwrap_or_default();
    let age = now - created;
    if age <= Duration::days(7) {
        WEEK_BOOST
    } else if age <= Duration::days(30) {
        MONTH_BOOST
    } else {
        0.0
    }
}

/// Score a single result against a keyword list.
pub fn score_result(result: &SearchResult, keywords: &[String], now: DateTime<Utc>) -> f64 {
    let text = scoring_text(result);
    let distinct: BTreeSet<String> = keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let keyword_score = distinct
        .iter()
        .filter(|k| text.contains(k.as_str()))
        .count() as f64
        * KEYWORD_WEIGHT;

    keyword_score + recency_boost(result.created_at, now)
}

/// Score, order and cap a concatenated result list.
///
/// Pure: the same inputs always produce the same output.
pub fn rank(results: Vec<SearchResult>, intent: &Intent, now: DateTime<Utc>) -> Vec<SearchResult> {
    rank_top(results, intent, now, MAX_RANKED_RESULTS)
}

/// Like [`rank`] but with a caller-chosen cap, itself clamped to
/// [`MAX_RANKED_RESULTS`].
pub fn rank_top(
    mut results: Vec<SearchResult>,
    intent: &Intent,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<SearchResult> {
    for result in &mut results {
        result.score = score_result(result, &intent.keywords, now);
    }

    // `sort_by` is stable, so equal scores keep concatenation order.
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    results.truncate(limit.min(MAX_RANKED_RESULTS));
    results
}
