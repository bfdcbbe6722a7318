//! Exact (brute-force) nearest-neighbor index.
//!
//! Every query is scored against every stored vector. For the corpus sizes a
//! single profile holds this is fast enough, and it makes results exact and
//! deterministic: ties keep insertion order.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{SearchResult, StoredVector, VectorId, VectorMetadata};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

/// Thread-safe flat index with ID lookup.
pub struct FlatIndex {
    inner: RwLock<IndexInner>,
    dimensions: usize,
    metric: DistanceMetric,
}

#[derive(Default)]
struct IndexInner {
    /// Vectors in insertion order.
    entries: Vec<StoredVector>,
    /// ID -> position in `entries`.
    positions: HashMap<VectorId, usize>,
}

impl IndexInner {
    fn put(&mut self, stored: StoredVector) {
        match self.positions.get(&stored.id) {
            Some(&pos) => self.entries[pos] = stored,
            None => {
                self.positions.insert(stored.id.clone(), self.entries.len());
                self.entries.push(stored);
            }
        }
    }
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimensions` components.
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Configuration("Dimensions must be > 0".to_string()));
        }

        Ok(Self {
            inner: RwLock::new(IndexInner::default()),
            dimensions,
            metric,
        })
    }

    /// Vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Check a vector against this index's dimensionality.
    pub fn validate(&self, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::InvalidVector("Vector is empty".to_string()));
        }
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(
                "Vector contains NaN or infinite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Insert many vectors atomically, replacing any stored under the same ID.
    ///
    /// Every vector is validated before any is written; if one is rejected the
    /// index is left untouched.
    pub fn insert_batch<'a, I>(&self, vectors: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32], Option<VectorMetadata>)>,
    {
        let mut staged = Vec::new();
        for (id, vector, metadata) in vectors {
            self.validate(vector)?;
            staged.push(StoredVector {
                id: id.to_string(),
                vector: vector.to_vec(),
                metadata,
            });
        }

        let count = staged.len();
        let mut inner = self.inner.write();
        for stored in staged {
            inner.put(stored);
        }
        Ok(count)
    }

    /// The `limit` vectors nearest to `query`, closest first.
    ///
    /// Returns fewer than `limit` results when the index holds fewer vectors.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.validate(query)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let inner = self.inner.read();
        let mut scored: Vec<(f32, &StoredVector)> = inner
            .entries
            .iter()
            .map(|e| (self.metric.distance(query, &e.vector), e))
            .collect();

        // Stable sort: equal distances stay in insertion order.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(distance, e)| SearchResult {
                id: e.id.clone(),
                distance,
                metadata: e.metadata.clone(),
            })
            .collect())
    }

    /// Snapshot of every stored vector, in insertion order.
    pub fn export_all(&self) -> Vec<StoredVector> {
        self.inner.read().entries.clone()
    }

    /// Rough memory footprint in bytes.
    pub fn memory_usage(&self) -> usize {
        self.len() * self.dimensions * std::mem::size_of::<f32>()
    }
}
