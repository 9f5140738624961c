//! SQLite-backed [`HistoryStore`].
//!
//! `created_at` is epoch milliseconds; the autoincrement `id` breaks ties so
//! "oldest" and "newest" stay well defined for entries in the same
//! millisecond.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use federated_search_core::history::HistoryStore;
use federated_search_core::models::{ConversationTurn, HistoryEntry, PopularSearch};

pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let conversation_json = match &entry.conversation_context {
            Some(turns) => Some(serde_json::to_string(turns)?),
            None => None,
        };
        sqlx::query(
            "INSERT INTO search_history (user_id, query, created_at, conversation_json) VALUES (?, ?, ?, ?)",
        )
        .bind(&entry.user_id)
        .bind(&entry.query)
        .bind(entry.timestamp.timestamp_millis())
        .bind(conversation_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_for_user(&self, user_id: &str) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_history WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as usize)
    }

    async fn delete_oldest_for_user(&self, user_id: &str, n: usize) -> Result<usize> {
        let result = sqlx::query(
            r#"
            DELETE FROM search_history WHERE id IN (
                SELECT id FROM search_history WHERE user_id = ?
                ORDER BY created_at ASC, id ASC LIMIT ?
            )
            "#,
        )
        .bind(user_id)
        .bind(n as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn query_counts(
        &self,
        prefix: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<PopularSearch>> {
        let rows = sqlx::query(
            r#"
            SELECT query, COUNT(*) AS n FROM search_history
            WHERE (?1 IS NULL OR substr(lower(query), 1, length(?1)) = lower(?1))
              AND (?2 IS NULL OR created_at >= ?2)
            GROUP BY query
            ORDER BY n DESC, query ASC
            LIMIT ?3
            "#,
        )
        .bind(prefix)
        .bind(since.map(|t| t.timestamp_millis()))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PopularSearch {
                query: row.get("query"),
                count: row.get::<i64, _>("n").max(0) as u64,
            })
            .collect())
    }

    async fn recent_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, query, created_at, conversation_json FROM search_history
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let millis: i64 = row.get("created_at");
            let conversation: Option<String> = row.get("conversation_json");
            let conversation_context = match conversation {
                Some(json) => Some(serde_json::from_str::<Vec<ConversationTurn>>(&json)?),
                None => None,
            };
            out.push(HistoryEntry {
                user_id: row.get("user_id"),
                query: row.get("query"),
                timestamp: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
                conversation_context,
            });
        }
        Ok(out)
    }
}
