//! SQLite-backed [`ContentStore`] implementation.
//!
//! All collections share the `records` table; each row holds one JSON
//! document. [`FindQuery`] filters are compiled to SQL over `json_extract`
//! and `json_each`, mirroring [`Filter::matches`]:
//!
//! * `Contains` → `LIKE` on the lowercased value of each scalar element.
//! * `AnyOf` / `NoneOf` → `[NOT] EXISTS` over `json_each` with `IN (...)`.
//! * `Between` → `julianday` comparison; integer fields are read as epoch
//!   milliseconds.
//!
//! Sort keys order numbers numerically and timestamps as instants, whether
//! stored as RFC 3339 text with any offset or as epoch milliseconds. Other
//! text orders lexically. Ordering falls back to `rowid`, so ties keep
//! insertion order.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use federated_search_core::store::{ContentStore, Filter, FindQuery, Record};

/// SQLite implementation of the [`ContentStore`] trait.
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a record. The record must carry a string or numeric `id`.
    pub async fn upsert(&self, collection: &str, record: &Record) -> Result<()> {
        let id = match record.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => bail!("record in '{}' has no usable id", collection),
        };
        let doc = serde_json::to_string(record)?;

        sqlx::query(
            r#"
            INSERT INTO records (collection, id, doc) VALUES (?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET doc = excluded.doc
            "#,
        )
        .bind(collection)
        .bind(&id)
        .bind(&doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count(&self, collection: &str) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

/// Accumulates SQL text and positional text binds.
#[derive(Default)]
struct SqlBuilder {
    sql: String,
    binds: Vec<String>,
}

/// Leading shape of an RFC 3339 timestamp.
const RFC3339_GLOB: &str = "[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9][T ][0-9][0-9]:*";

/// Text of a scalar `json_each` element, with booleans spelled out.
const ELEMENT_TEXT: &str = "lower(CASE je.type WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' \
                            ELSE CAST(je.value AS TEXT) END)";

impl SqlBuilder {
    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn bind(&mut self, value: impl Into<String>) {
        self.sql.push('?');
        self.binds.push(value.into());
    }

    fn compile(&mut self, filter: &Filter) -> Result<()> {
        match filter {
            Filter::MatchAll => self.push("1"),
            Filter::And(parts) => self.join(parts, " AND ", "1")?,
            Filter::Or(parts) => self.join(parts, " OR ", "0")?,
            Filter::Contains { field, needle } => {
                self.push("EXISTS (SELECT 1 FROM json_each(doc, ");
                self.bind(json_path(field)?);
                self.push(&format!(
                    ") je WHERE je.type NOT IN ('object', 'array', 'null') AND {} LIKE ",
                    ELEMENT_TEXT
                ));
                self.bind(format!("%{}%", escape_like(&needle.to_lowercase())));
                self.push(" ESCAPE '\\')");
            }
            Filter::AnyOf { field, values } => self.membership(field, values, false)?,
            Filter::NoneOf { field, values } => self.membership(field, values, true)?,
            Filter::Between { field, start, end } => {
                self.instant_days(&json_path(field)?);
                self.push(" BETWEEN julianday(");
                self.bind(start.to_rfc3339_opts(SecondsFormat::Millis, true));
                self.push(") AND julianday(");
                self.bind(end.to_rfc3339_opts(SecondsFormat::Millis, true));
                self.push(")");
            }
        }
        Ok(())
    }

    /// Julian day of an RFC 3339 text value, NULL for any other text.
    fn text_days(&mut self, path: &str) {
        self.push("(CASE WHEN json_extract(doc, ");
        self.bind(path);
        self.push(&format!(") GLOB '{}' THEN julianday(json_extract(doc, ", RFC3339_GLOB));
        self.bind(path);
        self.push(")) END)");
    }

    /// Julian day of a timestamp field: RFC 3339 text or epoch milliseconds.
    fn instant_days(&mut self, path: &str) {
        self.push("(CASE json_type(doc, ");
        self.bind(path);
        self.push(") WHEN 'text' THEN ");
        self.text_days(path);
        self.push(" WHEN 'integer' THEN julianday(json_extract(doc, ");
        self.bind(path);
        self.push(") / 1000.0, 'unixepoch') END)");
    }

    /// Numeric sort key: numbers as-is, RFC 3339 text as epoch milliseconds,
    /// NULL for other text.
    fn sort_number(&mut self, path: &str) {
        self.push("(CASE json_type(doc, ");
        self.bind(path);
        self.push(") WHEN 'integer' THEN json_extract(doc, ");
        self.bind(path);
        self.push(") WHEN 'real' THEN json_extract(doc, ");
        self.bind(path);
        self.push(") WHEN 'text' THEN round((");
        self.text_days(path);
        self.push(" - 2440587.5) * 86400000.0) END)");
    }

    fn join(&mut self, parts: &[Filter], sep: &str, empty: &str) -> Result<()> {
        if parts.is_empty() {
            self.push(empty);
            return Ok(());
        }
        self.push("(");
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            self.compile(part)?;
        }
        self.push(")");
        Ok(())
    }

    fn membership(&mut self, field: &str, values: &[String], negate: bool) -> Result<()> {
        if values.is_empty() {
            self.push(if negate { "1" } else { "0" });
            return Ok(());
        }
        if negate {
            self.push("NOT ");
        }
        self.push("EXISTS (SELECT 1 FROM json_each(doc, ");
        self.bind(json_path(field)?);
        self.push(&format!(
            ") je WHERE je.type NOT IN ('object', 'array', 'null') AND {} IN (",
            ELEMENT_TEXT
        ));
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.bind(v.to_lowercase());
        }
        self.push("))");
        Ok(())
    }
}

/// JSON path for a top-level field. Field names are restricted to
/// identifier characters.
fn json_path(field: &str) -> Result<String> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid field name in filter: {:?}", field);
    }
    Ok(format!("$.{}", field))
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn build_find_sql(collection: &str, query: &FindQuery) -> Result<SqlBuilder> {
    let mut b = SqlBuilder::default();
    b.push("SELECT doc FROM records WHERE collection = ");
    b.bind(collection);
    b.push(" AND ");
    b.compile(&query.filter)?;

    b.push(" ORDER BY ");
    for key in &query.sort {
        let path = json_path(&key.field)?;
        let dir = if key.descending { " DESC, " } else { " ASC, " };
        b.push("(json_extract(doc, ");
        b.bind(path.as_str());
        b.push(") IS NULL) ASC, ");
        b.sort_number(&path);
        b.push(dir);
        b.push("json_extract(doc, ");
        b.bind(path.as_str());
        b.push(")");
        b.push(dir);
    }
    b.push("rowid ASC LIMIT ?");
    Ok(b)
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Record>> {
        let built = build_find_sql(collection, query)?;

        let mut q = sqlx::query(&built.sql);
        for v in &built.binds {
            q = q.bind(v);
        }
        let rows = q
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("find on '{}' failed", collection))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let doc: String = row.get("doc");
            match serde_json::from_str::<Value>(&doc)? {
                Value::Object(record) => out.push(record),
                _ => bail!("non-object document in '{}'", collection),
            }
        }
        Ok(out)
    }
}
