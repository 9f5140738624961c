//! Search history, autocomplete, and popularity.
//!
//! Every search is appended to a per-user history. The per-user cap is
//! enforced right after each insert by counting the user's entries and
//! deleting the oldest overflow. Two writers for the same user may race
//! between the count and the delete; history is advisory, so the window is
//! accepted.
//!
//! Read-side aggregations group entries by exact query text:
//!
//! | Operation | Scope | Order |
//! |-----------|-------|-------|
//! | [`SearchHistory::suggestions`] | all users, case-insensitive prefix | count desc, then query |
//! | [`SearchHistory::popular_searches`] | all users, last [`POPULAR_WINDOW_DAYS`] days | count desc, then query |
//! | [`SearchHistory::recent_searches`] | one user | newest first |

use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::{ConversationTurn, HistoryEntry, PopularSearch};

/// Most-recent entries retained per user.
pub const HISTORY_CAP: usize = 100;
pub const POPULAR_WINDOW_DAYS: i64 = 7;

/// Persistence for [`HistoryEntry`] rows.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`append`](HistoryStore::append) | Insert one entry |
/// | [`count_for_user`](HistoryStore::count_for_user) | Number of entries for a user |
/// | [`delete_oldest_for_user`](HistoryStore::delete_oldest_for_user) | Drop a user's `n` oldest entries |
/// | [`query_counts`](HistoryStore::query_counts) | Group by query text and count |
/// | [`recent_for_user`](HistoryStore::recent_for_user) | A user's newest entries |
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, entry: &HistoryEntry) -> Result<()>;

    async fn count_for_user(&self, user_id: &str) -> Result<usize>;

    /// Returns the number of rows removed.
    async fn delete_oldest_for_user(&self, user_id: &str, n: usize) -> Result<usize>;

    /// Group entries by query text across all users.
    ///
    /// `prefix` restricts to queries starting with it (case-insensitive);
    /// `since` restricts to entries at or after that instant. Results are
    /// ordered by count descending, then query ascending.
    async fn query_counts(
        &self,
        prefix: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<PopularSearch>>;

    async fn recent_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>>;
}

/// History service over a [`HistoryStore`].
#[derive(Clone)]
pub struct SearchHistory {
    store: Arc<dyn HistoryStore>,
    cap: usize,
}

impl SearchHistory {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self::with_cap(store, HISTORY_CAP)
    }

    pub fn with_cap(store: Arc<dyn HistoryStore>, cap: usize) -> Self {
        Self { store, cap }
    }

    /// Append an entry, then trim the user's history to the cap.
    pub async fn record_search(
        &self,
        user_id: &str,
        query: &str,
        conversation: Option<Vec<ConversationTurn>>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let entry = HistoryEntry {
            user_id: user_id.to_string(),
            query: query.to_string(),
            timestamp: now,
            conversation_context: conversation.filter(|turns| !turns.is_empty()),
        };
        self.store.append(&entry).await?;

        let count = self.store.count_for_user(user_id).await?;
        if count > self.cap {
            self.store
                .delete_oldest_for_user(user_id, count - self.cap)
                .await?;
        }
        Ok(())
    }

    /// Most frequent past queries starting with `prefix`. A blank prefix
    /// yields nothing.
    pub async fn suggestions(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let prefix = prefix.trim();
        if prefix.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let counts = self.store.query_counts(Some(prefix), None, limit).await?;
        Ok(counts.into_iter().map(|p| p.query).collect())
    }

    /// Most frequent queries in the trailing popularity window.
    pub async fn popular_searches(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<PopularSearch>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let since = now - Duration::days(POPULAR_WINDOW_DAYS);
        self.store.query_counts(None, Some(since), limit).await
    }

    pub async fn recent_searches(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.store.recent_for_user(user_id, limit).await
    }
}

/// Order grouped counts: count descending, then query ascending.
pub fn sort_counts(counts: &mut [PopularSearch]) {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
}

/// In-memory [`HistoryStore`] for tests.
///
/// Entries are kept in insertion order; "oldest" means smallest timestamp,
/// with insertion order breaking ties.
#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries_for(&self, user_id: &str) -> Vec<HistoryEntry> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        self.entries.write().unwrap().push(entry.clone());
        Ok(())
    }

    async fn count_for_user(&self, user_id: &str) -> Result<usize> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .count())
    }

    async fn delete_oldest_for_user(&self, user_id: &str, n: usize) -> Result<usize> {
        let mut entries = self.entries.write().unwrap();
        let mut owned: Vec<(usize, DateTime<Utc>)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.user_id == user_id)
            .map(|(i, e)| (i, e.timestamp))
            .collect();
        owned.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut doomed: Vec<usize> = owned.into_iter().take(n).map(|(i, _)| i).collect();
        doomed.sort_unstable();
        for idx in doomed.iter().rev() {
            entries.remove(*idx);
        }
        Ok(doomed.len())
    }

    async fn query_counts(
        &self,
        prefix: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<PopularSearch>> {
        let prefix = prefix.map(|p| p.to_lowercase());
        let entries = self.entries.read().unwrap();

        let mut counts: Vec<PopularSearch> = Vec::new();
        for entry in entries.iter() {
            if let Some(p) = &prefix {
                if !entry.query.to_lowercase().starts_with(p.as_str()) {
                    continue;
                }
            }
            if let Some(since) = since {
                if entry.timestamp < since {
                    continue;
                }
            }
            match counts.iter_mut().find(|c| c.query == entry.query) {
                Some(c) => c.count += 1,
                None => counts.push(PopularSearch {
                    query: entry.query.clone(),
                    count: 1,
                }),
            }
        }

        sort_counts(&mut counts);
        counts.truncate(limit);
        Ok(counts)
    }

    async fn recent_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut mine = self.entries_for(user_id);
        // Newest first; later inserts win ties.
        mine.reverse();
        mine.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        mine.truncate(limit);
        Ok(mine)
    }
}
