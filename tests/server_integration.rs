use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use federated_search::adapters::{AdapterRegistry, SourceAdapter};
use federated_search::config::SearchConfig;
use federated_search::engine::SearchEngine;
use federated_search::llm::DisabledModel;
use federated_search::server::router;
use federated_search_core::cache::MemoryResultCache;
use federated_search_core::history::MemoryHistoryStore;
use federated_search_core::models::{Intent, SearchResult, SourceType};
use federated_search_core::store::memory::InMemoryContentStore;

struct DownAdapter(SourceType);

#[async_trait]
impl SourceAdapter for DownAdapter {
    fn name(&self) -> &str {
        "down"
    }

    fn source_type(&self) -> SourceType {
        self.0
    }

    async fn search(&self, _intent: &Intent, _limit: usize) -> Result<Vec<SearchResult>> {
        bail!("unreachable backend")
    }
}

/// Serve `registry` on an ephemeral port and return the base URL.
async fn spawn_server(registry: AdapterRegistry) -> (String, Arc<SearchEngine>) {
    let engine = Arc::new(SearchEngine::new(
        Arc::new(DisabledModel),
        Arc::new(registry),
        Arc::new(MemoryResultCache::new()),
        Arc::new(MemoryHistoryStore::new()),
        &SearchConfig::default(),
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(engine.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), engine)
}

fn seeded_registry() -> AdapterRegistry {
    let store = Arc::new(InMemoryContentStore::new());
    store.extend(
        "suppliers",
        vec![
            json!({ "id": "s1", "name": "Lone Star Vinyl", "city": "Austin", "state": "TX" }),
            json!({ "id": "s2", "name": "Neon Works", "city": "Denver", "state": "CO" }),
        ],
    );
    AdapterRegistry::with_store(store, "")
}

async fn post_search(base: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (base, _) = spawn_server(seeded_registry()).await;
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_search_returns_results() {
    let (base, _) = spawn_server(seeded_registry()).await;
    let resp = post_search(&base, json!({ "query": "vinyl", "user_id": "u1" })).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], "s1");
    assert_eq!(results[0]["source_type"], "suppliers");
    assert_eq!(results[0]["link"], "/suppliers/s1");
}

#[tokio::test]
async fn test_search_without_matches_is_empty_200() {
    let (base, _) = spawn_server(seeded_registry()).await;
    let resp = post_search(&base, json!({ "query": "zeppelin", "user_id": "u1" })).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn test_search_requires_user_id() {
    let (base, _) = spawn_server(seeded_registry()).await;
    let resp = post_search(&base, json!({ "query": "vinyl", "user_id": " " })).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_unreadable_search_body_is_400() {
    let (base, _) = spawn_server(seeded_registry()).await;

    for body in [json!({ "query": "vinyl" }), json!({ "user_id": "u1" }), json!({ "query": 7, "user_id": "u1" })] {
        let resp = post_search(&base, body.clone()).await;
        assert_eq!(resp.status(), 400, "body {}", body);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(body["error"]["message"].is_string());
    }

    let resp = reqwest::Client::new()
        .post(format!("{}/search", base))
        .header("content-type", "application/json")
        .body("{\"query\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_total_outage_is_503() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(DownAdapter(SourceType::Suppliers)));
    registry.register(Arc::new(DownAdapter(SourceType::Events)));
    let (base, _) = spawn_server(registry).await;

    let resp = post_search(&base, json!({ "query": "vinyl", "user_id": "u1" })).await;
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "search_unavailable");
}

#[tokio::test]
async fn test_history_suggestions_and_popular() {
    let (base, engine) = spawn_server(seeded_registry()).await;
    for (user, q) in [("u1", "vinyl wrap"), ("u2", "vinyl wrap"), ("u1", "neon")] {
        let resp = post_search(&base, json!({ "query": q, "user_id": user })).await;
        assert_eq!(resp.status(), 200);
    }
    engine.wait_for_history().await;

    let body: Value = reqwest::get(format!("{}/history/u1?limit=5", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["query"], "neon");

    let body: Value = reqwest::get(format!("{}/suggestions?prefix=VIN", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["suggestions"], json!(["vinyl wrap"]));

    let body: Value = reqwest::get(format!("{}/popular", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["searches"][0], json!({ "query": "vinyl wrap", "count": 2 }));
}
