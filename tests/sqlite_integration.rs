use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

use federated_search::cache::SqliteResultCache;
use federated_search::config::Config;
use federated_search::history::SqliteHistoryStore;
use federated_search::load::load_values;
use federated_search::sqlite_store::SqliteContentStore;
use federated_search::{db, migrate};
use federated_search_core::cache::{ResultCache, DEFAULT_TTL};
use federated_search_core::history::SearchHistory;
use federated_search_core::models::{PopularSearch, SearchResult, SourceType};
use federated_search_core::store::memory::InMemoryContentStore;
use federated_search_core::store::{ContentStore, Filter, FindQuery, SortKey};

async fn setup() -> (TempDir, SqlitePool) {
    let tmp = TempDir::new().unwrap();
    let config = Config::minimal(tmp.path().join("data/fsearch.sqlite"));
    let pool = db::connect(&config).await.unwrap();
    migrate::apply(&pool).await.unwrap();
    (tmp, pool)
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-16T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn threads() -> Vec<Value> {
    vec![
        json!({ "id": "t1", "title": "LED retrofit tips", "tags": ["LED", "retrofit"], "views": 40,
                "created_at": "2026-10-10T08:00:00Z", "author_name": "Dana" }),
        json!({ "id": "t2", "title": "Vinyl pricing", "tags": ["vinyl"], "views": 300,
                "created_at": "2026-09-01T08:00:00Z" }),
        json!({ "id": "t3", "title": "Neon vs led", "body": "Which lasts longer?", "views": 12,
                "created_at": "2026-10-15T08:00:00Z" }),
        json!({ "id": "t4", "title": "Permit 50% off?", "tags": [], "role": "staff" }),
        json!({ "id": "t5", "title": "Channel letters", "tags": ["channel", "led"], "role": "member",
                "created_at": "2026-10-01T00:00:00Z" }),
    ]
}

fn ids(records: &[federated_search_core::store::Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

fn query(filter: Filter, sort: Vec<SortKey>) -> FindQuery {
    FindQuery {
        filter,
        sort,
        limit: 10,
    }
}

#[tokio::test]
async fn test_sql_filters_agree_with_reference_semantics() {
    let (_tmp, pool) = setup().await;
    let sqlite = SqliteContentStore::new(pool);
    load_values(&sqlite, "forum_threads", threads()).await.unwrap();
    let memory = InMemoryContentStore::new();
    memory.extend("forum_threads", threads());

    let start = DateTime::parse_from_rfc3339("2026-10-01T00:00:00Z").unwrap().with_timezone(&Utc);
    let end = DateTime::parse_from_rfc3339("2026-10-12T00:00:00Z").unwrap().with_timezone(&Utc);

    let cases = vec![
        query(Filter::contains("title", "LED"), vec![]),
        query(Filter::contains("tags", "led"), vec![]),
        query(
            Filter::any_field_contains(&["title", "body"], &["longer".to_string(), "vinyl".to_string()]),
            vec![],
        ),
        query(Filter::contains("title", "50%"), vec![]),
        query(Filter::AnyOf { field: "tags".into(), values: vec!["Vinyl".into(), "channel".into()] }, vec![]),
        query(Filter::NoneOf { field: "role".into(), values: vec!["STAFF".into()] }, vec![]),
        query(Filter::Between { field: "created_at".into(), start, end }, vec![]),
        query(Filter::MatchAll, vec![SortKey::desc("views")]),
        query(Filter::MatchAll, vec![SortKey::desc("created_at")]),
        query(Filter::Or(vec![]), vec![]),
        query(
            Filter::all(vec![
                Filter::contains("title", "e"),
                Filter::NoneOf { field: "role".into(), values: vec!["staff".into()] },
            ]),
            vec![SortKey::desc("views"), SortKey::desc("created_at")],
        ),
    ];

    for q in cases {
        let a = sqlite.find("forum_threads", &q).await.unwrap();
        let b = memory.find("forum_threads", &q).await.unwrap();
        assert_eq!(ids(&a), ids(&b), "disagreement for {:?}", q);
    }
}

#[tokio::test]
async fn test_sort_compares_mixed_timestamp_formats_as_instants() {
    let (_tmp, pool) = setup().await;
    let sqlite = SqliteContentStore::new(pool);
    let records = vec![
        json!({ "id": "utc", "created_at": "2026-10-16T01:00:00Z" }),
        json!({ "id": "offset", "created_at": "2026-10-15T23:00:00-05:00" }),
        json!({ "id": "millis", "created_at": 1792195200000i64 }),
        json!({ "id": "early_millis", "created_at": 1792116000000i64 }),
        json!({ "id": "undated", "title": "no timestamp" }),
    ];
    load_values(&sqlite, "events", records.clone()).await.unwrap();
    let memory = InMemoryContentStore::new();
    memory.extend("events", records);

    for q in [
        query(Filter::MatchAll, vec![SortKey::desc("created_at")]),
        query(Filter::MatchAll, vec![SortKey::desc("title"), SortKey::desc("created_at")]),
    ] {
        let a = sqlite.find("events", &q).await.unwrap();
        let b = memory.find("events", &q).await.unwrap();
        assert_eq!(ids(&a), ids(&b), "disagreement for {:?}", q);
    }

    let newest = sqlite
        .find("events", &query(Filter::MatchAll, vec![SortKey::desc("created_at")]))
        .await
        .unwrap();
    // 2026-10-17T00:00Z, 10-16T04:00Z, 10-16T02:00Z, 10-16T01:00Z.
    assert_eq!(ids(&newest), vec!["millis", "offset", "early_millis", "utc", "undated"]);
}

#[tokio::test]
async fn test_specific_sql_results() {
    let (_tmp, pool) = setup().await;
    let sqlite = SqliteContentStore::new(pool);
    load_values(&sqlite, "forum_threads", threads()).await.unwrap();

    let led = sqlite
        .find("forum_threads", &query(Filter::contains("title", "led"), vec![]))
        .await
        .unwrap();
    assert_eq!(ids(&led), vec!["t1", "t3"]);

    let by_views = sqlite
        .find("forum_threads", &query(Filter::MatchAll, vec![SortKey::desc("views")]))
        .await
        .unwrap();
    // Records without views sort last, in insertion order.
    assert_eq!(ids(&by_views), vec!["t2", "t1", "t3", "t4", "t5"]);

    let limited = sqlite
        .find("forum_threads", &FindQuery { filter: Filter::MatchAll, sort: vec![], limit: 2 })
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    let other = sqlite
        .find("videos", &query(Filter::MatchAll, vec![]))
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn test_upsert_replaces_and_assigns_ids() {
    let (_tmp, pool) = setup().await;
    let store = SqliteContentStore::new(pool);
    let report = load_values(
        &store,
        "videos",
        vec![json!({ "id": "v1", "title": "old" }), json!({ "title": "no id" }), json!(3)],
    )
    .await
    .unwrap();
    assert_eq!(report.loaded, 2);
    assert_eq!(report.assigned_ids, 1);
    assert_eq!(report.skipped, 1);

    load_values(&store, "videos", vec![json!({ "id": "v1", "title": "new" })])
        .await
        .unwrap();
    assert_eq!(store.count("videos").await.unwrap(), 2);
    let hit = store
        .find("videos", &query(Filter::contains("title", "new"), vec![]))
        .await
        .unwrap();
    assert_eq!(ids(&hit), vec!["v1"]);
}

#[tokio::test]
async fn test_invalid_field_name_is_an_error() {
    let (_tmp, pool) = setup().await;
    let store = SqliteContentStore::new(pool);
    let bad = query(Filter::contains("title') OR 1=1 --", "x"), vec![]);
    assert!(store.find("videos", &bad).await.is_err());
}

#[tokio::test]
async fn test_result_cache_roundtrip_and_expiry() {
    let (_tmp, pool) = setup().await;
    let cache = SqliteResultCache::new(pool);
    let results = vec![SearchResult {
        id: "f1".into(),
        source_type: SourceType::Files,
        title: "Vinyl price sheet".into(),
        description: "2026 rates".into(),
        link: "/files/f1".into(),
        metadata: json!({ "downloads": 4 }).as_object().unwrap().clone(),
        created_at: Some(t0()),
        score: 15.0,
    }];

    cache.put("k1", &results, DEFAULT_TTL).await.unwrap();
    assert_eq!(cache.get("k1").await.unwrap(), Some(results.clone()));
    assert_eq!(cache.get("k2").await.unwrap(), None);

    cache.put("k1", &results, std::time::Duration::ZERO).await.unwrap();
    assert_eq!(cache.get("k1").await.unwrap(), None);
}

#[tokio::test]
async fn test_result_cache_clamps_oversized_ttl() {
    let (_tmp, pool) = setup().await;
    let cache = SqliteResultCache::new(pool);
    let results = vec![SearchResult {
        id: "s1".into(),
        source_type: SourceType::Suppliers,
        title: "Lone Star Vinyl".into(),
        description: String::new(),
        link: "/suppliers/s1".into(),
        metadata: serde_json::Map::new(),
        created_at: None,
        score: 10.0,
    }];

    cache
        .put("forever", &results, std::time::Duration::from_secs(u64::MAX))
        .await
        .unwrap();
    assert_eq!(cache.get("forever").await.unwrap(), Some(results.clone()));

    // Writing another entry must not sweep the long-lived one.
    cache.put("brief", &results, DEFAULT_TTL).await.unwrap();
    assert_eq!(cache.get("forever").await.unwrap(), Some(results));
}

#[tokio::test]
async fn test_history_cap_on_sqlite() {
    let (_tmp, pool) = setup().await;
    let store = Arc::new(SqliteHistoryStore::new(pool));
    let history = SearchHistory::new(store.clone());

    for i in 0..105 {
        history
            .record_search("u1", &format!("query {}", i), None, t0() + Duration::seconds(i))
            .await
            .unwrap();
    }
    history.record_search("u2", "other", None, t0()).await.unwrap();

    let recent = history.recent_searches("u1", 200).await.unwrap();
    assert_eq!(recent.len(), 100);
    assert_eq!(recent[0].query, "query 104");
    assert_eq!(recent[99].query, "query 5");
    assert_eq!(history.recent_searches("u2", 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_suggestions_and_popular_on_sqlite() {
    let (_tmp, pool) = setup().await;
    let history = SearchHistory::new(Arc::new(SqliteHistoryStore::new(pool)));

    let seed = [("vinyl wrap", 5), ("Vinyl lettering", 3), ("vinyl cutter", 1), ("neon", 2)];
    for (q, n) in seed {
        for i in 0..n {
            history
                .record_search(&format!("user{}", i), q, None, t0() - Duration::days(1))
                .await
                .unwrap();
        }
    }
    history
        .record_search("u9", "banner stands", None, t0() - Duration::days(20))
        .await
        .unwrap();

    assert_eq!(
        history.suggestions("vinyl", 2).await.unwrap(),
        vec!["vinyl wrap", "Vinyl lettering"]
    );
    assert_eq!(history.suggestions("VINYL C", 5).await.unwrap(), vec!["vinyl cutter"]);

    let popular = history.popular_searches(2, t0()).await.unwrap();
    assert_eq!(
        popular,
        vec![
            PopularSearch { query: "vinyl wrap".into(), count: 5 },
            PopularSearch { query: "Vinyl lettering".into(), count: 3 },
        ]
    );
    let all = history.popular_searches(10, t0()).await.unwrap();
    assert!(all.iter().all(|p| p.query != "banner stands"));
}

#[tokio::test]
async fn test_history_keeps_conversation() {
    let (_tmp, pool) = setup().await;
    let history = SearchHistory::new(Arc::new(SqliteHistoryStore::new(pool)));
    let turns = vec![federated_search_core::models::ConversationTurn {
        role: "user".into(),
        content: "channel letters".into(),
    }];
    history
        .record_search("u1", "in Texas", Some(turns.clone()), t0())
        .await
        .unwrap();
    let entries = history.recent_searches("u1", 1).await.unwrap();
    assert_eq!(entries[0].conversation_context, Some(turns));
    assert_eq!(entries[0].timestamp, t0());
}
