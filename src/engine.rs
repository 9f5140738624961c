//! Search entrypoint.
//!
//! ```text
//! query ─▶ cache ──hit──────────────────────────────┐
//!            │ miss                                  │
//!            ▼                                       │
//!      IntentParser ─▶ QueryOrchestrator ─▶ rank ─▶ cache.put
//!                                                    │
//!                          history.record_search ◀───┘ (detached)
//! ```
//!
//! Blank queries return an empty list without touching any collaborator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use anyhow::Result;
use chrono::Utc;

use federated_search_core::cache::{cache_key, ResultCache};
use federated_search_core::history::{HistoryStore, SearchHistory};
use federated_search_core::models::{ConversationTurn, HistoryEntry, PopularSearch, SearchResult};
use federated_search_core::rank::rank_top;
use federated_search_core::store::ContentStore;

use crate::adapters::AdapterRegistry;
use crate::cache::SqliteResultCache;
use crate::config::{Config, SearchConfig};
use crate::db;
use crate::error::SearchError;
use crate::history::SqliteHistoryStore;
use crate::intent::IntentParser;
use crate::llm::{create_model, LanguageModel};
use crate::migrate;
use crate::orchestrator::QueryOrchestrator;
use crate::sqlite_store::SqliteContentStore;

/// Counts detached history writes so callers can wait for them.
#[derive(Default)]
struct BackgroundWrites {
    in_flight: AtomicUsize,
    idle: Notify,
}

impl BackgroundWrites {
    fn finish(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Explicitly wired search service. Every collaborator is injected.
#[derive(Clone)]
pub struct SearchEngine {
    parser: Arc<IntentParser>,
    orchestrator: Arc<QueryOrchestrator>,
    cache: Arc<dyn ResultCache>,
    history: SearchHistory,
    background: Arc<BackgroundWrites>,
    final_limit: usize,
    cache_ttl: Duration,
    normalize_cache_key: bool,
}

impl SearchEngine {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: Arc<AdapterRegistry>,
        cache: Arc<dyn ResultCache>,
        history: Arc<dyn HistoryStore>,
        settings: &SearchConfig,
    ) -> Self {
        Self {
            parser: Arc::new(IntentParser::new(model)),
            orchestrator: Arc::new(QueryOrchestrator::new(
                registry,
                settings.per_source_limit,
                settings.adapter_timeout(),
            )),
            cache,
            history: SearchHistory::with_cap(history, settings.history_cap),
            background: Arc::new(BackgroundWrites::default()),
            final_limit: settings.final_limit,
            cache_ttl: settings.cache_ttl(),
            normalize_cache_key: settings.normalize_cache_key,
        }
    }

    /// Connect to the configured database, apply migrations, and wire the
    /// SQLite stores, the configured model and the built-in adapters.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;

        let content: Arc<dyn ContentStore> = Arc::new(SqliteContentStore::new(pool.clone()));
        let registry = AdapterRegistry::with_store(content, &config.links.base_url);

        Ok(Self::new(
            create_model(&config.intent)?,
            Arc::new(registry),
            Arc::new(SqliteResultCache::new(pool.clone())),
            Arc::new(SqliteHistoryStore::new(pool)),
            &config.search,
        ))
    }

    pub async fn perform_search(
        &self,
        query: &str,
        user_id: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.perform_search_with_context(query, user_id, Vec::new())
            .await
    }

    /// Run a search, using earlier conversation turns to refine intent.
    ///
    /// Returns `Ok(vec![])` when nothing matched. Fails only with
    /// [`SearchError::Unavailable`] when every targeted source failed.
    pub async fn perform_search_with_context(
        &self,
        query: &str,
        user_id: &str,
        conversation: Vec<ConversationTurn>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let key = cache_key(user_id, query, self.normalize_cache_key);

        let cached = match self.cache.get(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, "cache read failed; treating as miss");
                None
            }
        };

        let results = match cached {
            Some(results) => {
                tracing::debug!(user_id, count = results.len(), "cache hit");
                results
            }
            None => {
                let intent = self.parser.parse(query, &conversation).await;
                let fan_out = self.orchestrator.execute(&intent).await;
                if fan_out.all_failed() {
                    tracing::warn!(attempted = fan_out.attempted, "every content source failed");
                    return Err(SearchError::Unavailable {
                        attempted: fan_out.attempted,
                    });
                }

                let ranked = rank_top(fan_out.results, &intent, Utc::now(), self.final_limit);
                if let Err(e) = self.cache.put(&key, &ranked, self.cache_ttl).await {
                    tracing::warn!(error = %e, "cache write failed");
                }
                ranked
            }
        };

        self.record_in_background(user_id, query, conversation);

        tracing::info!(
            user_id,
            count = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search complete"
        );
        Ok(results)
    }

    /// Append to history on a detached task; failures are logged only.
    fn record_in_background(&self, user_id: &str, query: &str, conversation: Vec<ConversationTurn>) {
        let history = self.history.clone();
        let background = self.background.clone();
        let user_id = user_id.to_string();
        let query = query.to_string();
        let searched_at = Utc::now();
        background.in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            if let Err(e) = history
                .record_search(&user_id, &query, Some(conversation), searched_at)
                .await
            {
                tracing::warn!(error = %e, "history write failed");
            }
            background.finish();
        });
    }

    /// Wait until every detached history write has finished.
    pub async fn wait_for_history(&self) {
        loop {
            let idle = self.background.idle.notified();
            if self.background.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }

    pub async fn get_suggestions(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.history.suggestions(prefix, limit).await
    }

    pub async fn get_popular_searches(&self, limit: usize) -> Result<Vec<PopularSearch>> {
        self.history.popular_searches(limit, Utc::now()).await
    }

    pub async fn recent_searches(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.history.recent_searches(user_id, limit).await
    }
}
