//! In-memory [`ContentStore`] implementation for testing.
//!
//! Collections are `Vec<Record>` in insertion order behind `std::sync::RwLock`.
//! `find` is a linear scan using [`Filter::matches`].

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::{compare_records, ContentStore, FindQuery, Record};

/// In-memory content store.
pub struct InMemoryContentStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a record, replacing any record in the same collection with the
    /// same `id`.
    pub fn insert(&self, collection: &str, record: Record) {
        let mut collections = self.collections.write().unwrap();
        let rows = collections.entry(collection.to_string()).or_default();
        let id = record.get("id").cloned();
        match id.and_then(|id| rows.iter().position(|r| r.get("id") == Some(&id))) {
            Some(pos) => rows[pos] = record,
            None => rows.push(record),
        }
    }

    /// Insert every JSON object in `values`; non-objects are skipped.
    pub fn extend(&self, collection: &str, values: impl IntoIterator<Item = Value>) {
        for value in values {
            if let Value::Object(record) = value {
                self.insert(collection, record);
            }
        }
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Record>> {
        let collections = self.collections.read().unwrap();
        let Some(rows) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<Record> = rows
            .iter()
            .filter(|r| query.filter.matches(r))
            .cloned()
            .collect();
        if !query.sort.is_empty() {
            hits.sort_by(|a, b| compare_records(a, b, &query.sort));
        }
        hits.truncate(query.limit);
        Ok(hits)
    }
}
