//! Vector Store Abstraction Layer
//!
//! Every backend stores named collections of [`EmbeddedRecord`]s and answers
//! k-nearest-neighbor queries against one collection at a time. Profiles map
//! one-to-one onto collections; the per-profile rules (write policy, id
//! generation, clamping `k`) live one level up in
//! [`ProfileStore`](super::profile::ProfileStore).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    ProfileStore                       │
//! ├──────────────────────────────────────────────────────┤
//! │                  VectorStore trait                    │
//! │  replace_collection │ insert │ search │ delete │ ...  │
//! └──────────────────────────────────────────────────────┘
//!            ▲                              ▲
//!   ┌────────┴─────────┐          ┌────────┴────────┐
//!   │ LocalVectorStore │          │  PgVectorStore  │
//!   │ (ragchat-vector) │          │   (pgvector)    │
//!   └──────────────────┘          └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ragchat::db::vectorstore::{VectorStore, VectorStoreProvider};
//! use ragchat_vector::DistanceMetric;
//!
//! let store = VectorStoreProvider::Local { path: "./data/vectors".into() }
//!     .create_store()
//!     .await?;
//!
//! store.create_collection("handbook", 3072, DistanceMetric::Euclidean).await?;
//! store.insert("handbook", &records).await?;
//! let hits = store.search("handbook", &query_embedding, 10).await?;
//! ```

use crate::types::{AppError, EmbeddedRecord, Result, SearchResult};
use async_trait::async_trait;
use ragchat_vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Vector Store Provider Configuration
// ============================================================================

/// Which backend holds the profiles, and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Embedded store persisted as JSON under `path` (default).
    Local {
        #[serde(default = "default_local_path")]
        path: PathBuf,
    },

    /// Embedded store that lives only as long as the process.
    Memory,

    /// PostgreSQL with the pgvector extension.
    #[serde(rename = "pgvector")]
    PgVector {
        /// Environment variable holding the connection string.
        #[serde(default = "default_connection_string_env")]
        connection_string_env: String,
        /// Table holding embeddings; a `{table}_collections` table sits beside it.
        #[serde(default = "default_pg_table")]
        table: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./data/vectors")
}

fn default_connection_string_env() -> String {
    "DATABASE_URL".to_string()
}

fn default_pg_table() -> String {
    "ragchat_embeddings".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for VectorStoreProvider {
    fn default() -> Self {
        VectorStoreProvider::Local {
            path: default_local_path(),
        }
    }
}

impl VectorStoreProvider {
    /// Connect to (or open) the configured backend.
    ///
    /// # Errors
    ///
    /// `AppError::Store` if the backend cannot be reached,
    /// `AppError::Configuration` if it is not compiled in or its settings are unusable.
    pub async fn create_store(&self) -> Result<Box<dyn VectorStore>> {
        match self {
            VectorStoreProvider::Local { path } => {
                let store = super::local::LocalVectorStore::open(path.clone()).await?;
                Ok(Box::new(store))
            }

            VectorStoreProvider::Memory => {
                let store = super::local::LocalVectorStore::in_memory().await?;
                Ok(Box::new(store))
            }

            #[cfg(feature = "pgvector")]
            VectorStoreProvider::PgVector {
                connection_string_env,
                table,
                max_connections,
            } => {
                let connection_string =
                    crate::utils::toml_config::resolve_env(connection_string_env)?;
                let store =
                    super::pgvector::PgVectorStore::new(&connection_string, table, *max_connections)
                        .await?;
                Ok(Box::new(store))
            }

            #[allow(unreachable_patterns)]
            _ => Err(AppError::Configuration(format!(
                "Vector store provider '{}' not enabled. Check feature flags.",
                self.name()
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VectorStoreProvider::Local { .. } => "local",
            VectorStoreProvider::Memory => "memory",
            VectorStoreProvider::PgVector { .. } => "pgvector",
        }
    }
}

// ============================================================================
// Collection Information
// ============================================================================

/// Shape and size of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: usize,
    pub dimensions: usize,
    pub distance_metric: DistanceMetric,
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Backend contract for collection-scoped vector storage.
///
/// # Implementors
///
/// - `LocalVectorStore` - embedded, in memory or persisted to disk
/// - `PgVectorStore` - PostgreSQL + pgvector (feature `pgvector`)
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this vector store provider.
    fn provider_name(&self) -> &'static str;

    /// Create an empty collection. The metric is stored with it and used by
    /// every later search.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection already exists or creation fails.
    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<()>;

    /// Delete a collection and every record in it.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` if the collection doesn't exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// All collections, sorted by name.
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// # Errors
    ///
    /// `AppError::NotFound` if the collection doesn't exist.
    async fn collection_info(&self, name: &str) -> Result<CollectionInfo>;

    /// Make `name` hold exactly `records`, creating the collection if needed
    /// and dropping whatever it held before.
    ///
    /// Atomic: if anything fails, the previous collection (or its absence)
    /// is left as it was. Returns the number of records written.
    async fn replace_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        records: &[EmbeddedRecord],
    ) -> Result<usize>;

    /// Write records into an existing collection, all or none.
    ///
    /// Records are identified by `id`; an existing id is overwritten.
    /// Returns the number of records written.
    async fn insert(&self, collection: &str, records: &[EmbeddedRecord]) -> Result<usize>;

    /// The `limit` records nearest to `embedding`, ascending by distance.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` if the collection doesn't exist.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Count records in a collection.
    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.collection_info(collection).await?.document_count)
    }
}
