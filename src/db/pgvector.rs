//! PostgreSQL pgvector integration.
//!
//! Two tables back every store:
//!
//! ```text
//! {table}_collections  id, name (unique), dimensions, metric
//! {table}              id, collection_id -> collections ON DELETE CASCADE,
//!                      content, metadata (jsonb), embedding (vector)
//! ```
//!
//! Vectors are sent as pgvector text literals (`'[0.1,0.2]'::vector`), so no
//! extra type crate is needed. Each collection's metric picks the distance
//! operator its searches order by.
//!
//! # Feature Flag
//!
//! Enable with `--features pgvector`
//!
//! ```rust,ignore
//! let store = PgVectorStore::new("postgres://localhost/ragchat", "ragchat_embeddings", 5).await?;
//! store.create_collection("handbook", 3072, DistanceMetric::Euclidean).await?;
//! ```

use crate::types::{AppError, EmbeddedRecord, RecordMetadata, Result, SearchResult};
use async_trait::async_trait;
use ragchat_vector::DistanceMetric;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use std::time::Duration;
use tracing::{debug, info};

use super::vectorstore::{CollectionInfo, VectorStore};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn store_err(context: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| AppError::Store(format!("pgvector {}: {}", context, e))
}

/// Quotes a Postgres identifier, escaping embedded quotes.
fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

/// pgvector's text form of a vector: `[1,2.5,-3]`.
fn vector_literal(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn check_dimensions(records: &[EmbeddedRecord], dims: usize) -> Result<()> {
    match records.iter().find(|r| r.embedding.len() != dims) {
        Some(bad) => Err(AppError::Embedding(format!(
            "Vector has {} dimensions, collection expects {}",
            bad.embedding.len(),
            dims
        ))),
        None => Ok(()),
    }
}

/// Distance operator matching a metric.
fn distance_operator(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::Euclidean => "<->",
        DistanceMetric::Cosine => "<=>",
        DistanceMetric::DotProduct => "<#>",
        DistanceMetric::Manhattan => "<+>",
    }
}

pub struct PgVectorStore {
    pool: PgPool,
    /// Quoted embeddings table.
    records: String,
    /// Quoted collections table.
    collections: String,
}

impl PgVectorStore {
    /// Connect and make sure the extension and both tables exist.
    pub async fn new(connection_string: &str, table: &str, max_connections: u32) -> Result<Self> {
        if table.trim().is_empty() {
            return Err(AppError::Configuration("pgvector table name is required".into()));
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(connection_string)
            .await
            .map_err(store_err("connect"))?;

        let store = Self {
            pool,
            records: quote_ident(table),
            collections: quote_ident(&format!("{}_collections", table)),
        };
        store.prepare().await?;
        info!(table, "Connected to pgvector");
        Ok(store)
    }

    async fn prepare(&self) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(store_err("create extension"))?;

        let collections_ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                dimensions INTEGER NOT NULL,
                metric TEXT NOT NULL
            )",
            self.collections
        );
        sqlx::query(&collections_ddl)
            .execute(&self.pool)
            .await
            .map_err(store_err("create collections table"))?;

        let records_ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                collection_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                metadata JSONB,
                embedding VECTOR NOT NULL
            )",
            self.records, self.collections
        );
        sqlx::query(&records_ddl)
            .execute(&self.pool)
            .await
            .map_err(store_err("create embeddings table"))?;

        Ok(())
    }

    /// `(id, dimensions, metric)` of a collection, if it exists.
    async fn lookup(&self, name: &str) -> Result<Option<(i64, usize, DistanceMetric)>> {
        let sql = format!(
            "SELECT id, dimensions, metric FROM {} WHERE name = $1",
            self.collections
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err("lookup collection"))?;

        row.map(|row| {
            let id: i64 = row.try_get("id").map_err(store_err("read collection"))?;
            let dims: i32 = row.try_get("dimensions").map_err(store_err("read collection"))?;
            let metric: String = row.try_get("metric").map_err(store_err("read collection"))?;
            let metric = metric.parse().map_err(AppError::Store)?;
            Ok((id, dims as usize, metric))
        })
        .transpose()
    }

    async fn require(&self, name: &str) -> Result<(i64, usize, DistanceMetric)> {
        self.lookup(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}'", name)))
    }

    fn info_from_row(row: &PgRow) -> Result<CollectionInfo> {
        let name: String = row.try_get("name").map_err(store_err("read collection"))?;
        let dims: i32 = row.try_get("dimensions").map_err(store_err("read collection"))?;
        let metric: String = row.try_get("metric").map_err(store_err("read collection"))?;
        let count: i64 = row.try_get("document_count").map_err(store_err("read collection"))?;
        Ok(CollectionInfo {
            name,
            document_count: count as usize,
            dimensions: dims as usize,
            distance_metric: metric.parse().map_err(AppError::Store)?,
        })
    }

    async fn insert_rows(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        collection_id: i64,
        records: &[EmbeddedRecord],
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, collection_id, content, metadata, embedding)
             VALUES ($1, $2, $3, $4::jsonb, $5::vector)
             ON CONFLICT (id) DO UPDATE SET
                content = EXCLUDED.content,
                metadata = EXCLUDED.metadata,
                embedding = EXCLUDED.embedding",
            self.records
        );

        for record in records {
            let metadata = serde_json::to_string(&record.metadata)
                .map_err(|e| AppError::Internal(format!("Failed to serialize metadata: {}", e)))?;
            sqlx::query(&sql)
                .bind(&record.id)
                .bind(collection_id)
                .bind(&record.content)
                .bind(metadata)
                .bind(vector_literal(&record.embedding))
                .execute(&mut **tx)
                .await
                .map_err(store_err("insert"))?;
        }
        Ok(())
    }

    fn info_query(&self, filter: &str) -> String {
        format!(
            "SELECT c.name, c.dimensions, c.metric, COUNT(e.id) AS document_count
             FROM {} c LEFT JOIN {} e ON e.collection_id = c.id
             {}
             GROUP BY c.id, c.name, c.dimensions, c.metric
             ORDER BY c.name",
            self.collections, self.records, filter
        )
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    fn provider_name(&self) -> &'static str {
        "pgvector"
    }

    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (name, dimensions, metric) VALUES ($1, $2, $3)
             ON CONFLICT (name) DO NOTHING",
            self.collections
        );
        let result = sqlx::query(&sql)
            .bind(name)
            .bind(dimensions as i32)
            .bind(metric.name())
            .execute(&self.pool)
            .await
            .map_err(store_err("create collection"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Store(format!("Collection '{}' already exists", name)));
        }
        debug!(name, dimensions, %metric, "Created pgvector collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE name = $1", self.collections);
        let result = sqlx::query(&sql)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(store_err("delete collection"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Collection '{}'", name)));
        }
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let rows = sqlx::query(&self.info_query(""))
            .fetch_all(&self.pool)
            .await
            .map_err(store_err("list collections"))?;
        rows.iter().map(Self::info_from_row).collect()
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lookup(name).await?.is_some())
    }

    async fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        let row = sqlx::query(&self.info_query("WHERE c.name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err("collection info"))?
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}'", name)))?;
        Self::info_from_row(&row)
    }

    async fn replace_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        records: &[EmbeddedRecord],
    ) -> Result<usize> {
        check_dimensions(records, dimensions)?;

        let delete = format!("DELETE FROM {} WHERE name = $1", self.collections);
        let create = format!(
            "INSERT INTO {} (name, dimensions, metric) VALUES ($1, $2, $3) RETURNING id",
            self.collections
        );

        // Old rows follow the collection row (ON DELETE CASCADE).
        let mut tx = self.pool.begin().await.map_err(store_err("begin"))?;
        sqlx::query(&delete)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(store_err("delete collection"))?;
        let collection_id: i64 = sqlx::query_scalar(&create)
            .bind(name)
            .bind(dimensions as i32)
            .bind(metric.name())
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err("create collection"))?;
        self.insert_rows(&mut tx, collection_id, records).await?;
        tx.commit().await.map_err(store_err("commit"))?;

        debug!(name, count = records.len(), "Replaced pgvector collection");
        Ok(records.len())
    }

    async fn insert(&self, collection: &str, records: &[EmbeddedRecord]) -> Result<usize> {
        let (collection_id, dims, _) = self.require(collection).await?;
        check_dimensions(records, dims)?;

        let mut tx = self.pool.begin().await.map_err(store_err("begin"))?;
        self.insert_rows(&mut tx, collection_id, records).await?;
        tx.commit().await.map_err(store_err("commit"))?;

        debug!(collection, count = records.len(), "Inserted pgvector records");
        Ok(records.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let (collection_id, dims, metric) = self.require(collection).await?;
        if embedding.len() != dims {
            return Err(AppError::Embedding(format!(
                "Query has {} dimensions, collection expects {}",
                embedding.len(),
                dims
            )));
        }

        let sql = format!(
            "SELECT id, content, metadata::text AS metadata,
                    (embedding {op} $1::vector)::float8 AS distance
             FROM {}
             WHERE collection_id = $2
             ORDER BY embedding {op} $1::vector
             LIMIT $3",
            self.records,
            op = distance_operator(metric)
        );

        let rows = sqlx::query(&sql)
            .bind(vector_literal(embedding))
            .bind(collection_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err("search"))?;

        rows.iter()
            .map(|row| {
                let metadata: Option<String> =
                    row.try_get("metadata").map_err(store_err("read row"))?;
                let distance: f64 = row.try_get("distance").map_err(store_err("read row"))?;
                Ok(SearchResult {
                    id: row.try_get("id").map_err(store_err("read row"))?,
                    content: row.try_get("content").map_err(store_err("read row"))?,
                    distance: distance as f32,
                    metadata: metadata
                        .and_then(|m| serde_json::from_str::<RecordMetadata>(&m).ok()),
                })
            })
            .collect()
    }
}
