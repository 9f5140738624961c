//! Bulk loading of content records.
//!
//! Reads a JSON array or JSON-lines file and upserts each object into the
//! collection of the named source. Objects without an `id` get a UUID v4.
//! Search itself never writes to content collections; this is the only
//! write path.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

use federated_search_core::models::SourceType;
use federated_search_core::store::Record;

use crate::adapters::profile_for;
use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteContentStore;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub assigned_ids: usize,
    pub skipped: usize,
}

pub async fn run_load(config: &Config, source: &str, path: &Path) -> Result<()> {
    let source_type: SourceType = source.parse()?;
    let collection = profile_for(source_type).collection;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let values = parse_records(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let store = SqliteContentStore::new(pool.clone());

    let report = load_values(&store, collection, values).await?;
    pool.close().await;

    println!("load {} → {}", source_type, collection);
    println!("  records loaded: {}", report.loaded);
    if report.assigned_ids > 0 {
        println!("  ids assigned: {}", report.assigned_ids);
    }
    if report.skipped > 0 {
        println!("  skipped (not objects): {}", report.skipped);
    }
    Ok(())
}

/// Upsert every object in `values` into `collection`.
pub async fn load_values(
    store: &SqliteContentStore,
    collection: &str,
    values: Vec<Value>,
) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    for value in values {
        let Value::Object(mut record) = value else {
            report.skipped += 1;
            continue;
        };
        if ensure_id(&mut record) {
            report.assigned_ids += 1;
        }
        store.upsert(collection, &record).await?;
        report.loaded += 1;
    }
    Ok(report)
}

/// Give the record a fresh id if it lacks a usable one. Returns true if assigned.
fn ensure_id(record: &mut Record) -> bool {
    let usable = match record.get("id") {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    };
    if !usable {
        record.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }
    !usable
}

/// Accept a JSON array, a single object, or one JSON value per line.
pub fn parse_records(content: &str) -> Result<Vec<Value>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    if let Ok(single) = serde_json::from_str::<Value>(trimmed) {
        return Ok(vec![single]);
    }

    let mut out = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(v) => out.push(v),
            Err(e) => bail!("line {}: {}", lineno + 1, e),
        }
    }
    Ok(out)
}
