//! Profiles: isolated corpora, one collection each.
//!
//! `ProfileStore` wraps any [`VectorStore`] with the rules a profile follows:
//!
//! - every vector in a batch is checked against the configured dimensions
//!   before anything is written;
//! - under [`WritePolicy::Replace`] the new batch takes the place of the
//!   profile's previous contents in one atomic backend call, so re-ingesting
//!   leaves only the latest document and a failed write leaves the old one;
//! - any non-blank name of up to [`MAX_PROFILE_NAME_BYTES`] bytes is a valid
//!   profile, on every backend;
//! - ids are generated here (UUID v4);
//! - searching a profile that was never ingested is an empty result, not an error;
//! - `k` is clamped to the number of stored records.

use crate::types::{AppError, EmbeddedRecord, PendingRecord, Result, RetrievalResult};
use ragchat_vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::vectorstore::{CollectionInfo, VectorStore};

pub const MAX_PROFILE_NAME_BYTES: usize = 80;

/// What a new ingestion does to a profile that already holds records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Swap the profile's contents for the new batch.
    #[default]
    Replace,
    /// Add the new batch next to what is already there.
    Append,
}

pub struct ProfileStore {
    store: Arc<dyn VectorStore>,
    dimensions: usize,
    metric: DistanceMetric,
    policy: WritePolicy,
}

impl ProfileStore {
    pub fn new(
        store: Arc<dyn VectorStore>,
        dimensions: usize,
        metric: DistanceMetric,
        policy: WritePolicy,
    ) -> Result<Self> {
        if dimensions == 0 {
            return Err(AppError::Validation(
                "Embedding dimensions must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            store,
            dimensions,
            metric,
            policy,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn backend(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Reject names no backend can hold. Cheap; run it before embedding.
    pub fn validate_profile_name(profile: &str) -> Result<()> {
        if profile.trim().is_empty() {
            return Err(AppError::Validation("Profile name cannot be empty".to_string()));
        }
        if profile.len() > MAX_PROFILE_NAME_BYTES {
            return Err(AppError::Validation(format!(
                "Profile name is {} bytes, the limit is {}",
                profile.len(),
                MAX_PROFILE_NAME_BYTES
            )));
        }
        Ok(())
    }

    fn check_vector(&self, vector: &[f32], what: &str) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "{} has {} dimensions, expected {}",
                what,
                vector.len(),
                self.dimensions
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Embedding(format!(
                "{} contains NaN or infinite values",
                what
            )));
        }
        Ok(())
    }

    /// Write a batch into `profile` under the configured policy.
    ///
    /// Returns the generated ids, in the order of `records`. On any error the
    /// profile keeps what it held before.
    pub async fn upsert(&self, profile: &str, records: Vec<PendingRecord>) -> Result<Vec<String>> {
        Self::validate_profile_name(profile)?;
        if records.is_empty() {
            return Err(AppError::Validation(format!(
                "No records to write to profile '{}'",
                profile
            )));
        }
        for (i, record) in records.iter().enumerate() {
            self.check_vector(&record.embedding, &format!("Record {}", i))?;
        }

        let records: Vec<EmbeddedRecord> = records
            .into_iter()
            .map(|r| EmbeddedRecord {
                id: Uuid::new_v4().to_string(),
                profile: profile.to_string(),
                content: r.content,
                embedding: r.embedding,
                metadata: r.metadata,
            })
            .collect();

        let written = match self.policy {
            WritePolicy::Replace => {
                debug!(profile, "Replacing profile contents");
                self.store
                    .replace_collection(profile, self.dimensions, self.metric, &records)
                    .await?
            }
            WritePolicy::Append => {
                self.prepare_append(profile).await?;
                self.store.insert(profile, &records).await?
            }
        };
        info!(profile, records = written, policy = ?self.policy, "Profile updated");

        Ok(records.into_iter().map(|r| r.id).collect())
    }

    async fn prepare_append(&self, profile: &str) -> Result<()> {
        if !self.store.collection_exists(profile).await? {
            return self
                .store
                .create_collection(profile, self.dimensions, self.metric)
                .await;
        }

        let info = self.store.collection_info(profile).await?;
        if info.dimensions != self.dimensions {
            return Err(AppError::Validation(format!(
                "Profile '{}' holds {}-dimensional vectors, cannot append {}-dimensional ones",
                profile, info.dimensions, self.dimensions
            )));
        }
        Ok(())
    }

    /// The `k` records of `profile` nearest to `query`, closest first.
    ///
    /// An unknown profile, or `k == 0`, yields an empty result.
    pub async fn search(&self, profile: &str, query: &[f32], k: usize) -> Result<RetrievalResult> {
        Self::validate_profile_name(profile)?;
        self.check_vector(query, "Query vector")?;

        if k == 0 || !self.store.collection_exists(profile).await? {
            debug!(profile, k, "Nothing to search");
            return Ok(RetrievalResult::default());
        }

        let stored = self.store.count(profile).await?;
        let limit = k.min(stored);
        if limit == 0 {
            return Ok(RetrievalResult::default());
        }

        match self.store.search(profile, query, limit).await {
            Ok(hits) => {
                debug!(profile, requested = k, returned = hits.len(), "Profile searched");
                Ok(RetrievalResult { hits })
            }
            // Dropped concurrently; same as never ingested.
            Err(AppError::NotFound(_)) => Ok(RetrievalResult::default()),
            Err(e) => Err(e),
        }
    }

    /// Number of records in `profile` (0 if it does not exist).
    pub async fn count(&self, profile: &str) -> Result<usize> {
        if !self.store.collection_exists(profile).await? {
            return Ok(0);
        }
        self.store.count(profile).await
    }

    pub async fn list_profiles(&self) -> Result<Vec<CollectionInfo>> {
        self.store.list_collections().await
    }

    /// Delete a profile. Returns `false` if it did not exist.
    pub async fn drop_profile(&self, profile: &str) -> Result<bool> {
        Self::validate_profile_name(profile)?;
        if !self.store.collection_exists(profile).await? {
            return Ok(false);
        }
        self.store.delete_collection(profile).await?;
        info!(profile, "Profile dropped");
        Ok(true)
    }
}
