//! PostgreSQL backend: one table per collection, each row an `(id, doc JSONB, created_at)` triple.

use super::{
    spec_for, validate_field_name, CollectionSpec, Document, DocumentStore, FindQuery, SortOrder,
    CREATED_AT_FIELD,
};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use uuid::Uuid;

type Row = (Uuid, Value, DateTime<Utc>);

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Create the database if needed, open a pool and make sure every collection table exists.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgStore, StoreError> {
    ensure_database_exists(database_url).await?;
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    ensure_collections(&pool, super::COLLECTIONS).await?;
    Ok(PgStore::new(pool))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn table(collection: &str) -> Result<String, StoreError> {
    let spec = spec_for(collection)?;
    Ok(quote_ident(spec.name))
}

/// Create collection tables plus their unique indexes and a GIN index for containment filters.
pub async fn ensure_collections(pool: &PgPool, specs: &[CollectionSpec]) -> Result<(), StoreError> {
    for spec in specs {
        let q_table = quote_ident(spec.name);
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                doc JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            q_table
        );
        sqlx::query(&ddl).execute(pool).await?;

        let gin = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} USING GIN (doc jsonb_path_ops)",
            quote_ident(&format!("{}_doc_idx", spec.name)),
            q_table
        );
        sqlx::query(&gin).execute(pool).await?;

        for field in spec.unique {
            validate_field_name(field)?;
            let idx = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((doc->>'{}'))",
                quote_ident(&unique_index_name(spec.name, field)),
                q_table,
                field
            );
            sqlx::query(&idx).execute(pool).await?;
        }
        tracing::debug!(collection = spec.name, "collection ready");
    }
    Ok(())
}

fn unique_index_name(collection: &str, field: &str) -> String {
    format!("{}_{}_key", collection, field)
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url);
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> (String, String) {
    let Some(slash) = url.rfind('/') else {
        return (url.to_string(), String::new());
    };
    let path_start = slash + 1;
    let db_name = url[path_start..].split('?').next().unwrap_or("").trim();
    let admin_url = format!("{}postgres", &url[..path_start]);
    (admin_url, db_name.to_string())
}

fn order_by(sort: &[(String, SortOrder)]) -> Result<String, StoreError> {
    let mut parts = Vec::with_capacity(sort.len() + 1);
    for (field, order) in sort {
        let dir = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        if field == CREATED_AT_FIELD {
            parts.push(format!("created_at {}", dir));
        } else {
            validate_field_name(field)?;
            parts.push(format!("doc->'{}' {}", field, dir));
        }
    }
    parts.push("created_at ASC".into());
    Ok(parts.join(", "))
}

/// Split `id` out of a filter; it is a column, not part of `doc`.
fn split_filter(filter: &Map<String, Value>) -> (Option<Uuid>, Value) {
    let mut rest = filter.clone();
    let id = rest
        .remove("id")
        .and_then(|v| v.as_str().and_then(|s| Uuid::parse_str(s).ok()));
    (id, Value::Object(rest))
}

fn to_document(collection: &str, (id, doc, created_at): Row) -> Result<Document, StoreError> {
    match doc {
        Value::Object(body) => Ok(Document { id, body, created_at }),
        _ => Err(StoreError::Malformed {
            collection: collection.to_string(),
            message: format!("document {} is not an object", id),
        }),
    }
}

fn map_write_error(collection: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            let field = db
                .constraint()
                .and_then(|c| c.strip_prefix(&format!("{}_", collection)))
                .and_then(|c| c.strip_suffix("_key"))
                .unwrap_or("value")
                .to_string();
            return StoreError::Duplicate {
                collection: collection.to_string(),
                field,
            };
        }
    }
    StoreError::Db(e)
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<Document, StoreError> {
        let sql = format!(
            "INSERT INTO {} (id, doc) VALUES ($1, $2) RETURNING id, doc, created_at",
            table(collection)?
        );
        tracing::debug!(sql = %sql, "query");
        let row: Row = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(Value::Object(body))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(collection, e))?;
        to_document(collection, row)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let sql = format!("SELECT id, doc, created_at FROM {} WHERE id = $1", table(collection)?);
        tracing::debug!(sql = %sql, %id, "query");
        let row: Option<Row> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| to_document(collection, r)).transpose()
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let (id, doc_filter) = split_filter(&query.filter);
        let sql = format!(
            "SELECT id, doc, created_at FROM {} WHERE doc @> $1 AND ($2::uuid IS NULL OR id = $2) ORDER BY {} LIMIT $3 OFFSET $4",
            table(collection)?,
            order_by(&query.sort)?
        );
        tracing::debug!(sql = %sql, filter = %doc_filter, "query");
        let limit = query.limit.map(|l| l as i64);
        let rows: Vec<Row> = sqlx::query_as(&sql)
            .bind(doc_filter)
            .bind(id)
            .bind(limit)
            .bind(i64::try_from(query.offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| to_document(collection, r)).collect()
    }

    async fn count(&self, collection: &str, filter: &Map<String, Value>) -> Result<u64, StoreError> {
        let (id, doc_filter) = split_filter(filter);
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE doc @> $1 AND ($2::uuid IS NULL OR id = $2)",
            table(collection)?
        );
        let (n,): (i64,) = sqlx::query_as(&sql)
            .bind(doc_filter)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        let sql = format!(
            "UPDATE {} SET doc = doc || $2 WHERE id = $1 RETURNING id, doc, created_at",
            table(collection)?
        );
        tracing::debug!(sql = %sql, %id, "query");
        let row: Option<Row> = sqlx::query_as(&sql)
            .bind(id)
            .bind(Value::Object(patch))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(collection, e))?;
        row.map(|r| to_document(collection, r)).transpose()
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 RETURNING id, doc, created_at",
            table(collection)?
        );
        tracing::debug!(sql = %sql, %id, "query");
        let row: Option<Row> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| to_document(collection, r)).transpose()
    }

    async fn delete_many(&self, collection: &str, filter: &Map<String, Value>) -> Result<u64, StoreError> {
        let (id, doc_filter) = split_filter(filter);
        let sql = format!(
            "DELETE FROM {} WHERE doc @> $1 AND ($2::uuid IS NULL OR id = $2)",
            table(collection)?
        );
        tracing::debug!(sql = %sql, filter = %doc_filter, "query");
        let done = sqlx::query(&sql)
            .bind(doc_filter)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_url_swaps_database() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@localhost:5432/vacq?sslmode=disable");
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "vacq");
    }

    #[test]
    fn order_by_maps_created_at_and_rejects_bad_fields() {
        let sql = order_by(&[
            ("name".into(), SortOrder::Asc),
            (CREATED_AT_FIELD.into(), SortOrder::Desc),
        ])
        .unwrap();
        assert_eq!(sql, "doc->'name' ASC, created_at DESC, created_at ASC");
        assert!(order_by(&[("x'--".into(), SortOrder::Asc)]).is_err());
    }

    #[test]
    fn id_filter_is_split_from_doc_filter() {
        let id = Uuid::new_v4();
        let mut filter = Map::new();
        filter.insert("id".into(), Value::String(id.to_string()));
        filter.insert("user".into(), Value::String("u1".into()));
        let (got, rest) = split_filter(&filter);
        assert_eq!(got, Some(id));
        assert_eq!(rest, serde_json::json!({"user": "u1"}));
    }

    #[test]
    fn unknown_collection_has_no_table() {
        assert!(table("widgets").is_err());
        assert_eq!(table("users").unwrap(), "\"users\"");
    }
}
