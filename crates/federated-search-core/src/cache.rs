//! Result cache abstraction.
//!
//! Ranked result lists are cached per `(user, query)` for a fixed TTL. There
//! is no invalidation path; entries simply expire. The key is an opaque hex
//! digest so backends never see raw query text in their index.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::models::SearchResult;

/// Lifetime of a cached result list.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Build the cache key for a user and query.
///
/// With `normalize` the query is trimmed and lowercased first, so
/// `"Vinyl Signs "` and `"vinyl signs"` share an entry.
pub fn cache_key(user_id: &str, query: &str, normalize: bool) -> String {
    let query = if normalize {
        query.trim().to_lowercase()
    } else {
        query.to_string()
    };
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}

/// Key/value cache of ranked result lists.
///
/// Callers treat any error as a miss; implementations should not retry.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<SearchResult>>>;
    async fn put(&self, key: &str, results: &[SearchResult], ttl: Duration) -> Result<()>;
}

/// Process-local cache backed by a `HashMap`. Expired entries are dropped
/// when read and swept on every write.
pub struct MemoryResultCache {
    /// `None` expiry means the TTL overflowed `Instant`; such entries never expire.
    entries: RwLock<HashMap<String, (Option<Instant>, Vec<SearchResult>)>>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<SearchResult>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                None => return Ok(None),
                Some((expires_at, results)) if is_live(*expires_at, now) => {
                    return Ok(Some(results.clone()))
                }
                Some(_) => {}
            }
        }
        self.entries.write().unwrap().remove(key);
        Ok(None)
    }

    async fn put(&self, key: &str, results: &[SearchResult], ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap();
        entries.retain(|_, (expires_at, _)| is_live(*expires_at, now));
        entries.insert(key.to_string(), (now.checked_add(ttl), results.to_vec()));
        Ok(())
    }
}

fn is_live(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.map_or(true, |t| t > now)
}
