//! Read-only content store abstraction.
//!
//! Every content source (files, owners, events, ...) lives in a collection of
//! JSON records. Adapters never write; they only issue [`FindQuery`]s through
//! the [`ContentStore`] trait, which keeps backends pluggable (SQLite in the
//! application crate, [`memory::InMemoryContentStore`] for tests).
//!
//! # Filter semantics
//!
//! [`Filter::matches`] is the reference semantics. Backends that push filters
//! down into a query language must agree with it.
//!
//! | Filter | Matches when |
//! |--------|--------------|
//! | `MatchAll` | always |
//! | `And` / `Or` | all / any children match (`Or([])` never matches) |
//! | `Contains` | field contains `needle`, case-insensitively; arrays match if any element does |
//! | `AnyOf` | field equals one of `values`, case-insensitively; arrays match on intersection |
//! | `NoneOf` | negation of `AnyOf`; a missing field matches |
//! | `Between` | field parses as RFC 3339 and lies in `[start, end]` |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// A raw store record.
pub type Record = serde_json::Map<String, Value>;

/// Store-agnostic filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    MatchAll,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Contains {
        field: String,
        needle: String,
    },
    AnyOf {
        field: String,
        values: Vec<String>,
    },
    NoneOf {
        field: String,
        values: Vec<String>,
    },
    Between {
        field: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Filter {
    pub fn contains(field: &str, needle: &str) -> Self {
        Filter::Contains {
            field: field.to_string(),
            needle: needle.to_string(),
        }
    }

    /// `Or` of `Contains` over every field × needle pair.
    pub fn any_field_contains(fields: &[&str], needles: &[String]) -> Self {
        Filter::Or(
            needles
                .iter()
                .flat_map(|n| fields.iter().map(move |f| Filter::contains(f, n)))
                .collect(),
        )
    }

    /// Conjunction that collapses trivial cases.
    pub fn all(mut parts: Vec<Filter>) -> Self {
        parts.retain(|p| *p != Filter::MatchAll);
        match parts.len() {
            0 => Filter::MatchAll,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        }
    }

    /// Evaluate the filter against a record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::MatchAll => true,
            Filter::And(parts) => parts.iter().all(|p| p.matches(record)),
            Filter::Or(parts) => parts.iter().any(|p| p.matches(record)),
            Filter::Contains { field, needle } => {
                let needle = needle.to_lowercase();
                field_strings(record, field)
                    .iter()
                    .any(|s| s.to_lowercase().contains(&needle))
            }
            Filter::AnyOf { field, values } => any_of(record, field, values),
            Filter::NoneOf { field, values } => !any_of(record, field, values),
            Filter::Between { field, start, end } => record
                .get(field)
                .and_then(value_as_datetime)
                .map(|t| t >= *start && t <= *end)
                .unwrap_or(false),
        }
    }
}

fn any_of(record: &Record, field: &str, values: &[String]) -> bool {
    let wanted: Vec<String> = values.iter().map(|v| v.to_lowercase()).collect();
    field_strings(record, field)
        .iter()
        .any(|s| wanted.contains(&s.to_lowercase()))
}

/// String projections of a field: scalars yield one value, arrays one per
/// scalar element, anything else nothing.
pub fn field_strings(record: &Record, field: &str) -> Vec<String> {
    match record.get(field) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(v) => scalar_string(v).into_iter().collect(),
        None => Vec::new(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a timestamp stored as an RFC 3339 string or as epoch milliseconds.
pub fn value_as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// One sort key; records lacking the field sort after those that have it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// A `find`-style query: filter, ordered sort keys, and a result cap.
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    /// Empty means store order.
    pub sort: Vec<SortKey>,
    pub limit: usize,
}

/// Compare two records under a list of sort keys.
pub fn compare_records(a: &Record, b: &Record, sort: &[SortKey]) -> Ordering {
    for key in sort {
        let ord = match (a.get(&key.field), b.get(&key.field)) {
            (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
            (None | Some(Value::Null), _) => Ordering::Greater,
            (_, None | Some(Value::Null)) => Ordering::Less,
            (Some(x), Some(y)) => {
                let natural = compare_values(x, y);
                if key.descending {
                    natural.reverse()
                } else {
                    natural
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_values(x: &Value, y: &Value) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_f64(), y.as_f64()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    if let (Some(a), Some(b)) = (value_as_datetime(x), value_as_datetime(y)) {
        return a.cmp(&b);
    }
    match (x.as_str(), y.as_str()) {
        (Some(a), Some(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Read-only query capability over named record collections.
///
/// Implementations must never mutate data in `find`; search is read-only.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Return at most `query.limit` records of `collection` matching
    /// `query.filter`, ordered by `query.sort`.
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Record>>;
}
