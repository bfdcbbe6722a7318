//! Vector collection.
//!
//! A collection is a named container for vectors with a fixed dimensionality
//! and distance metric.

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::index::FlatIndex;
use crate::types::{SearchResult, StoredVector, VectorMetadata};
use crate::CollectionStats;

/// A named collection of vectors.
pub struct Collection {
    name: String,
    index: FlatIndex,
}

impl Collection {
    /// Create an empty collection.
    pub fn new(name: String, dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        Ok(Self {
            name,
            index: FlatIndex::new(dimensions, metric)?,
        })
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    /// Distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.index.metric()
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the collection holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Insert a batch of vectors; nothing is written if any vector is invalid.
    pub fn insert_batch<'a, I>(&self, vectors: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32], Option<VectorMetadata>)>,
    {
        self.index.insert_batch(vectors)
    }

    /// Nearest neighbors of `query`, closest first.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.index.search(query, limit)
    }

    /// Collection statistics.
    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            name: self.name.clone(),
            vector_count: self.len(),
            dimensions: self.dimensions(),
            metric: self.metric(),
            memory_bytes: self.index.memory_usage(),
        }
    }

    /// All vectors in insertion order, for persistence.
    pub fn export_all(&self) -> Vec<StoredVector> {
        self.index.export_all()
    }
}
