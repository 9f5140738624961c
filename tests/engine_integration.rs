use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use federated_search::adapters::{AdapterRegistry, SourceAdapter};
use federated_search::config::SearchConfig;
use federated_search::engine::SearchEngine;
use federated_search::error::SearchError;
use federated_search::llm::{DisabledModel, LanguageModel};
use federated_search_core::cache::MemoryResultCache;
use federated_search_core::history::MemoryHistoryStore;
use federated_search_core::models::{ConversationTurn, Intent, SearchResult, SourceType};
use federated_search_core::store::memory::InMemoryContentStore;

/// Returns a fixed reply (or fails) and records every prompt.
struct ScriptedModel {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(reply: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.map(|s| s.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(user.to_string());
        match &self.reply {
            Some(r) => Ok(r.clone()),
            None => bail!("provider down"),
        }
    }
}

enum Behavior {
    Fail,
    Hang,
}

struct BrokenAdapter {
    source_type: SourceType,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl BrokenAdapter {
    fn new(source_type: SourceType, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            source_type,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SourceAdapter for BrokenAdapter {
    fn name(&self) -> &str {
        "broken"
    }

    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn search(&self, _intent: &Intent, _limit: usize) -> Result<Vec<SearchResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Fail => bail!("connection refused"),
            Behavior::Hang => {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Delegates to another adapter and counts calls.
struct CountingAdapter {
    inner: Arc<dyn SourceAdapter>,
    calls: AtomicUsize,
}

impl CountingAdapter {
    fn wrap(inner: Arc<dyn SourceAdapter>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for CountingAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn source_type(&self) -> SourceType {
        self.inner.source_type()
    }

    async fn search(&self, intent: &Intent, limit: usize) -> Result<Vec<SearchResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.search(intent, limit).await
    }
}

fn days_ago(days: i64) -> String {
    (Utc::now() - Duration::days(days)).to_rfc3339()
}

fn seeded_store() -> Arc<InMemoryContentStore> {
    let store = Arc::new(InMemoryContentStore::new());
    store.extend(
        "forum_threads",
        vec![
            json!({ "id": "old", "title": "LED Sign Installation Safety", "views": 900,
                    "created_at": days_ago(180) }),
            json!({ "id": "new", "title": "LED Sign Installation Safety", "views": 3,
                    "created_at": days_ago(1) }),
            json!({ "id": "wrap", "title": "Vinyl wrap pricing", "created_at": days_ago(10) }),
        ],
    );
    store.extend(
        "videos",
        vec![json!({ "id": "v1", "title": "Vinyl wrap basics", "created_at": days_ago(60) })],
    );
    store.extend(
        "owners",
        vec![
            json!({ "id": "p1", "name": "Site Admin", "specialties": ["vinyl"], "role": "admin" }),
            json!({ "id": "p2", "name": "Sam", "specialties": ["vinyl", "wraps"], "role": "member" }),
        ],
    );
    store
}

struct Harness {
    engine: SearchEngine,
    history: Arc<MemoryHistoryStore>,
}

fn harness(model: Arc<dyn LanguageModel>, registry: AdapterRegistry, settings: SearchConfig) -> Harness {
    let history = Arc::new(MemoryHistoryStore::new());
    let engine = SearchEngine::new(
        model,
        Arc::new(registry),
        Arc::new(MemoryResultCache::new()),
        history.clone(),
        &settings,
    );
    Harness { engine, history }
}

fn builtin(store: Arc<InMemoryContentStore>) -> AdapterRegistry {
    AdapterRegistry::with_store(store, "https://signs.example")
}

#[tokio::test]
async fn test_led_scenario_recent_post_outranks_old_exact_match() {
    let h = harness(Arc::new(DisabledModel), builtin(seeded_store()), SearchConfig::default());

    let results = h
        .engine
        .perform_search("LED sign installation safety", "u1")
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "new");
    assert_eq!(results[0].score, 45.0);
    assert_eq!(results[1].id, "old");
    assert_eq!(results[1].score, 40.0);
    assert_eq!(results[0].link, "https://signs.example/forum/new");
    assert_eq!(results[0].source_type, SourceType::ForumPosts);
}

#[tokio::test]
async fn test_results_are_sorted_and_capped() {
    let store = Arc::new(InMemoryContentStore::new());
    for collection in ["files", "videos", "stories"] {
        store.extend(
            collection,
            (0..15).map(|i| json!({ "id": format!("{}-{}", collection, i), "title": "channel letters" })),
        );
    }
    let h = harness(Arc::new(DisabledModel), builtin(store), SearchConfig::default());

    let results = h.engine.perform_search("channel letters", "u1").await.unwrap();
    assert_eq!(results.len(), 20);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    for st in [SourceType::Files, SourceType::Videos, SourceType::Stories] {
        assert!(results.iter().filter(|r| r.source_type == st).count() <= 10);
    }
}

#[tokio::test]
async fn test_repeat_search_is_served_from_cache() {
    let model = ScriptedModel::new(Some(r#"{"dataTypes": ["forumPosts"], "keywords": ["vinyl"]}"#));
    let mut registry = builtin(seeded_store());
    let forum = CountingAdapter::wrap(registry.get(SourceType::ForumPosts).unwrap());
    registry.register(forum.clone());
    let h = harness(model.clone(), registry, SearchConfig::default());

    let first = h.engine.perform_search("vinyl", "u1").await.unwrap();
    let second = h.engine.perform_search("  Vinyl ", "u1").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(model.calls(), 1);
    assert_eq!(forum.calls(), 1);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, "wrap");

    // Cache entries are per user.
    h.engine.perform_search("vinyl", "u2").await.unwrap();
    assert_eq!(model.calls(), 2);
    assert_eq!(forum.calls(), 2);

    // Cache hits are still logged to history.
    h.engine.wait_for_history().await;
    assert_eq!(h.history.entries_for("u1").len(), 2);
}

#[tokio::test]
async fn test_model_intent_limits_sources() {
    let model = ScriptedModel::new(Some(r#"{"dataTypes": ["people"], "keywords": ["vinyl"]}"#));
    let h = harness(model, builtin(seeded_store()), SearchConfig::default());

    let results = h.engine.perform_search("vinyl people", "u1").await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    // Admin profiles are never returned.
    assert_eq!(ids, vec!["p2"]);
}

#[tokio::test]
async fn test_provider_outage_falls_back_to_keywords() {
    let model = ScriptedModel::new(None);
    let h = harness(model.clone(), builtin(seeded_store()), SearchConfig::default());

    let results = h.engine.perform_search("vinyl wrap", "u1").await.unwrap();
    assert_eq!(model.calls(), 1);
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert!(ids.contains(&"wrap"));
    assert!(ids.contains(&"v1"));
    assert!(ids.contains(&"p2"));
}

#[tokio::test]
async fn test_failing_source_does_not_fail_search() {
    let broken = BrokenAdapter::new(SourceType::Videos, Behavior::Fail);
    let mut registry = builtin(seeded_store());
    registry.register(broken.clone());
    let h = harness(Arc::new(DisabledModel), registry, SearchConfig::default());

    let results = h.engine.perform_search("vinyl wrap", "u1").await.unwrap();
    assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| r.source_type != SourceType::Videos));
    assert!(results.iter().any(|r| r.id == "wrap"));
}

#[tokio::test]
async fn test_slow_source_is_timed_out() {
    let mut registry = builtin(seeded_store());
    registry.register(BrokenAdapter::new(SourceType::Videos, Behavior::Hang));
    let settings = SearchConfig {
        adapter_timeout_ms: 100,
        ..SearchConfig::default()
    };
    let h = harness(Arc::new(DisabledModel), registry, settings);

    let started = std::time::Instant::now();
    let results = h.engine.perform_search("vinyl wrap", "u1").await.unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert!(results.iter().any(|r| r.id == "wrap"));
}

#[tokio::test]
async fn test_all_sources_failing_is_unavailable() {
    let mut registry = AdapterRegistry::new();
    registry.register(BrokenAdapter::new(SourceType::Files, Behavior::Fail));
    registry.register(BrokenAdapter::new(SourceType::Stories, Behavior::Fail));
    let h = harness(Arc::new(DisabledModel), registry, SearchConfig::default());

    let err = h.engine.perform_search("vinyl", "u1").await.unwrap_err();
    assert!(matches!(err, SearchError::Unavailable { attempted: 2 }));

    h.engine.wait_for_history().await;
    assert!(h.history.entries_for("u1").is_empty());
}

#[tokio::test]
async fn test_nothing_found_is_empty_not_error() {
    let h = harness(Arc::new(DisabledModel), builtin(seeded_store()), SearchConfig::default());
    let results = h.engine.perform_search("zeppelin", "u1").await.unwrap();
    assert!(results.is_empty());

    h.engine.wait_for_history().await;
    assert_eq!(h.history.entries_for("u1").len(), 1);
}

#[tokio::test]
async fn test_blank_query_has_no_side_effects() {
    let model = ScriptedModel::new(Some("{}"));
    let h = harness(model.clone(), builtin(seeded_store()), SearchConfig::default());

    assert!(h.engine.perform_search("   ", "u1").await.unwrap().is_empty());
    h.engine.wait_for_history().await;
    assert_eq!(model.calls(), 0);
    assert!(h.history.entries_for("u1").is_empty());
}

#[tokio::test]
async fn test_conversation_reaches_model_and_history() {
    let model = ScriptedModel::new(Some(r#"{"keywords": ["channel"]}"#));
    let h = harness(model.clone(), builtin(seeded_store()), SearchConfig::default());
    let turns = vec![ConversationTurn {
        role: "user".into(),
        content: "channel letters suppliers".into(),
    }];

    h.engine
        .perform_search_with_context("only in Texas", "u1", turns.clone())
        .await
        .unwrap();
    h.engine.wait_for_history().await;

    let prompt = model.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("channel letters suppliers"));
    assert!(prompt.ends_with("Latest query: only in Texas"));

    let entries = h.history.entries_for("u1");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].query, "only in Texas");
    assert_eq!(entries[0].conversation_context, Some(turns));
}

#[tokio::test]
async fn test_suggestions_and_popular_reflect_searches() {
    let h = harness(Arc::new(DisabledModel), builtin(seeded_store()), SearchConfig::default());
    for (user, q) in [("a", "vinyl wrap"), ("b", "vinyl wrap"), ("c", "vinyl cutter"), ("a", "neon")] {
        h.engine.perform_search(q, user).await.unwrap();
    }
    h.engine.wait_for_history().await;

    assert_eq!(
        h.engine.get_suggestions("VIN", 5).await.unwrap(),
        vec!["vinyl wrap", "vinyl cutter"]
    );
    let popular = h.engine.get_popular_searches(1).await.unwrap();
    assert_eq!(popular.len(), 1);
    assert_eq!(popular[0].query, "vinyl wrap");
    assert_eq!(popular[0].count, 2);

    let recent = h.engine.recent_searches("a", 10).await.unwrap();
    assert_eq!(recent.len(), 2);
}
