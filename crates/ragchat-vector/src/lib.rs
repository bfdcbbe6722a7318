//! # ragchat-vector
//!
//! A small embedded vector database for ragchat profiles.
//!
//! Each collection holds vectors of one fixed dimensionality, ranked by the
//! distance metric chosen when the collection was created. Search is exact:
//! every stored vector is scored, results come back closest first, and equal
//! distances keep insertion order.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ragchat_vector::{Config, DistanceMetric, VectorDb};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ragchat_vector::Error> {
//!     let db = VectorDb::open(Config::persistent("./data/vectors")).await?;
//!     db.create_collection("handbook", 3, DistanceMetric::Euclidean).await?;
//!
//!     let v = [0.1f32, 0.2, 0.3];
//!     db.insert_batch("handbook", [("chunk-0", &v[..], None)]).await?;
//!
//!     let hits = db.search("handbook", &[0.1, 0.2, 0.25], 5).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Persistence
//!
//! With [`Config::persistent`] every mutation rewrites the affected collection
//! as JSON under the data directory, and [`VectorDb::open`] loads whatever is
//! there. See [`persistence`] for the file layout.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod config;
pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

pub use collection::Collection;
pub use config::Config;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use types::{MetadataValue, SearchResult, StoredVector, VectorId, VectorMetadata};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The vector database handle. Cheap to clone; clones share state.
///
/// Collections live in an `scc::HashMap`, which is safe to touch across
/// `.await` points; each collection guards its own index.
#[derive(Clone)]
pub struct VectorDb {
    inner: Arc<VectorDbInner>,
}

struct VectorDbInner {
    config: Config,
    collections: scc::HashMap<String, Arc<Collection>>,
}

/// Any non-empty name is accepted as long as its on-disk directory name
/// stays within common filesystem limits.
fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Configuration(
            "Collection name cannot be empty".to_string(),
        ));
    }
    if persistence::dir_name(name).len() > persistence::MAX_DIR_NAME_LEN {
        return Err(Error::Configuration(format!(
            "Collection name '{}' is too long",
            name
        )));
    }
    Ok(())
}

impl VectorDb {
    /// Open a database, loading any collections already on disk.
    #[instrument(skip(config), fields(persistent = config.data_path.is_some()))]
    pub async fn open(config: Config) -> Result<Self> {
        info!("Opening vector database");

        let db = Self {
            inner: Arc::new(VectorDbInner {
                config: config.clone(),
                collections: scc::HashMap::new(),
            }),
        };

        if let Some(ref path) = config.data_path {
            tokio::fs::create_dir_all(path).await?;
            db.load_collections(path).await?;
        }

        Ok(db)
    }

    /// Create an empty collection.
    ///
    /// # Errors
    ///
    /// [`Error::CollectionExists`] if the name is taken, [`Error::Configuration`]
    /// for an unusable name or zero dimensions.
    #[instrument(skip(self))]
    pub async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        validate_collection_name(name)?;
        info!(name, dimensions, %metric, "Creating collection");

        let collection = Arc::new(Collection::new(name.to_string(), dimensions, metric)?);
        if self
            .inner
            .collections
            .insert(name.to_string(), collection.clone())
            .is_err()
        {
            return Err(Error::CollectionExists(name.to_string()));
        }

        if let Some(ref path) = self.inner.config.data_path {
            persistence::save_collection(path, &collection).await?;
            self.save_names(path).await?;
        }

        Ok(())
    }

    /// Drop a collection and everything in it.
    #[instrument(skip(self))]
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        info!(name, "Deleting collection");

        if self.inner.collections.remove(name).is_none() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }

        if let Some(ref path) = self.inner.config.data_path {
            persistence::delete_collection_files(path, name).await?;
            self.save_names(path).await?;
        }

        Ok(())
    }

    /// Whether a collection exists.
    pub fn collection_exists(&self, name: &str) -> bool {
        self.inner.collections.contains(name)
    }

    /// Collection names, sorted.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.inner.collections.scan(|k, _| names.push(k.clone()));
        names.sort();
        names
    }

    /// Handle to a collection.
    pub fn get_collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.inner
            .collections
            .read(name, |_, v| v.clone())
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Insert a batch of `(id, vector, metadata)` triples.
    ///
    /// The batch is validated as a whole first: a single bad vector means nothing
    /// is written. Existing IDs are overwritten.
    #[instrument(skip(self, vectors))]
    pub async fn insert_batch<'a, I>(&self, collection: &str, vectors: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32], Option<VectorMetadata>)>,
    {
        let col = self.get_collection(collection)?;
        let count = col.insert_batch(vectors)?;
        self.persist_collection(&col).await?;
        debug!(count, "Inserted batch");
        Ok(count)
    }

    /// Swap in a collection holding exactly `vectors`, creating it if needed.
    ///
    /// The replacement is built and written to disk before it becomes
    /// visible. If any vector is rejected or the snapshot cannot be written,
    /// the previous collection stays as it was, in memory and on disk.
    #[instrument(skip(self, vectors))]
    pub async fn replace_collection<'a, I>(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        vectors: I,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32], Option<VectorMetadata>)>,
    {
        validate_collection_name(name)?;

        let collection = Collection::new(name.to_string(), dimensions, metric)?;
        let count = collection.insert_batch(vectors)?;

        if let Some(ref path) = self.inner.config.data_path {
            persistence::save_collection(path, &collection).await?;
            if !self.collection_exists(name) {
                let mut names = self.list_collections();
                names.push(name.to_string());
                names.sort();
                persistence::save_collection_names(path, &names).await?;
            }
        }

        let previous = self
            .inner
            .collections
            .upsert_async(name.to_string(), Arc::new(collection))
            .await;
        info!(name, count, replaced = previous.is_some(), "Collection replaced");
        Ok(count)
    }

    /// The `limit` vectors nearest to `query`, closest first.
    #[instrument(skip(self, query), fields(dim = query.len()))]
    pub async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let col = self.get_collection(collection)?;
        let results = col.search(query, limit)?;
        debug!(count = results.len(), "Search completed");
        Ok(results)
    }

    /// Number of vectors in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.get_collection(collection)?.len())
    }

    /// Collection statistics.
    pub fn collection_stats(&self, collection: &str) -> Result<CollectionStats> {
        Ok(self.get_collection(collection)?.stats())
    }

    async fn persist_collection(&self, col: &Collection) -> Result<()> {
        match self.inner.config.data_path {
            Some(ref path) => persistence::save_collection(path, col).await,
            None => Ok(()),
        }
    }

    async fn save_names(&self, path: &Path) -> Result<()> {
        persistence::save_collection_names(path, &self.list_collections()).await
    }

    async fn load_collections(&self, path: &Path) -> Result<()> {
        for name in persistence::load_collection_names(path).await? {
            match persistence::load_collection(path, &name).await {
                Ok(collection) => {
                    let _ = self.inner.collections.insert(name, Arc::new(collection));
                }
                Err(e) => warn!(name, error = %e, "Failed to load collection, skipping"),
            }
        }
        Ok(())
    }
}

/// Statistics about a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Collection name.
    pub name: String,
    /// Number of vectors.
    pub vector_count: usize,
    /// Vector dimensionality.
    pub dimensions: usize,
    /// Distance metric.
    pub metric: DistanceMetric,
    /// Approximate memory held by vector data, in bytes.
    pub memory_bytes: usize,
}
