use anyhow::Result;

use federated_search_core::models::SourceType;

use crate::adapters::builtin_profiles;
use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteContentStore;

/// One row of `fsearch sources`.
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub source_type: SourceType,
    pub collection: &'static str,
    pub records: i64,
}

pub async fn source_statuses(store: &SqliteContentStore) -> Result<Vec<SourceStatus>> {
    let mut out = Vec::new();
    for profile in builtin_profiles() {
        out.push(SourceStatus {
            source_type: profile.source_type,
            collection: profile.collection,
            records: store.count(profile.collection).await?,
        });
    }
    Ok(out)
}

pub async fn list_sources(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let statuses = source_statuses(&SqliteContentStore::new(pool.clone())).await?;
    pool.close().await;

    println!("{:<12} {:<16} RECORDS", "SOURCE", "COLLECTION");
    for s in statuses {
        println!("{:<12} {:<16} {}", s.source_type, s.collection, s.records);
    }
    Ok(())
}
