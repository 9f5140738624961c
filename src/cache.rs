//! SQLite-backed [`ResultCache`].
//!
//! Rows store the ranked list as JSON with an absolute expiry in epoch
//! milliseconds. Expired rows read as misses and are purged on the next write.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::time::Duration;

use federated_search_core::cache::ResultCache;
use federated_search_core::models::SearchResult;

pub struct SqliteResultCache {
    pool: SqlitePool,
}

impl SqliteResultCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl ResultCache for SqliteResultCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<SearchResult>>> {
        let row: Option<String> = sqlx::query_scalar(
            "SELECT results_json FROM search_cache WHERE cache_key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, results: &[SearchResult], ttl: Duration) -> Result<()> {
        let now = now_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_ms);
        let json = serde_json::to_string(results)?;

        sqlx::query("DELETE FROM search_cache WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO search_cache (cache_key, results_json, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                results_json = excluded.results_json,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(&json)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
