//! Embedded vector store backed by `ragchat-vector`.
//!
//! Record content and provenance travel in each vector's payload, so the
//! on-disk snapshot written by `ragchat-vector` is all there is to persist.
//!
//! ```rust,ignore
//! let store = LocalVectorStore::open("./data/vectors").await?;
//! store.create_collection("handbook", 3072, DistanceMetric::Euclidean).await?;
//! ```

use crate::types::{AppError, EmbeddedRecord, RecordMetadata, Result, SearchResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ragchat_vector::{Config, DistanceMetric, VectorDb, VectorMetadata};
use std::path::PathBuf;
use tracing::debug;

use super::vectorstore::{CollectionInfo, VectorStore};

const KEY_CONTENT: &str = "content";
const KEY_SOURCE: &str = "source";
const KEY_SEQUENCE: &str = "sequence_index";
const KEY_CREATED: &str = "created_at";

impl From<ragchat_vector::Error> for AppError {
    fn from(err: ragchat_vector::Error) -> Self {
        use ragchat_vector::Error as E;
        match err {
            E::CollectionNotFound(name) => AppError::NotFound(format!("Collection '{}'", name)),
            E::DimensionMismatch { expected, actual } => AppError::Embedding(format!(
                "Vector has {} dimensions, collection expects {}",
                actual, expected
            )),
            E::Configuration(msg) => AppError::Validation(msg),
            other => AppError::Store(other.to_string()),
        }
    }
}

pub struct LocalVectorStore {
    db: VectorDb,
    path: Option<PathBuf>,
}

impl LocalVectorStore {
    /// Open (or create) a store persisted under `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let db = VectorDb::open(Config::persistent(path.clone()))
            .await
            .map_err(|e| AppError::Store(format!("Failed to open vector store at {}: {}", path.display(), e)))?;
        Ok(Self {
            db,
            path: Some(path),
        })
    }

    /// A store that keeps everything in memory.
    pub async fn in_memory() -> Result<Self> {
        let db = VectorDb::open(Config::memory()).await?;
        Ok(Self { db, path: None })
    }

    /// Where the snapshot lives, if persisted.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

fn to_payload(record: &EmbeddedRecord) -> VectorMetadata {
    let mut meta = VectorMetadata::new();
    meta.insert(KEY_CONTENT, record.content.as_str());
    meta.insert(KEY_SOURCE, record.metadata.source.as_str());
    meta.insert(KEY_SEQUENCE, record.metadata.sequence_index);
    meta.insert(KEY_CREATED, record.metadata.created_at.to_rfc3339());
    meta
}

fn to_batch(
    records: &[EmbeddedRecord],
) -> impl Iterator<Item = (&str, &[f32], Option<VectorMetadata>)> {
    records
        .iter()
        .map(|r| (r.id.as_str(), r.embedding.as_slice(), Some(to_payload(r))))
}

fn from_payload(payload: &VectorMetadata) -> Option<RecordMetadata> {
    Some(RecordMetadata {
        source: payload.get_string(KEY_SOURCE)?.to_string(),
        sequence_index: usize::try_from(payload.get_int(KEY_SEQUENCE)?).ok()?,
        created_at: DateTime::parse_from_rfc3339(payload.get_string(KEY_CREATED)?)
            .ok()?
            .with_timezone(&Utc),
    })
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    fn provider_name(&self) -> &'static str {
        "local"
    }

    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        self.db
            .create_collection(name, dimensions, metric)
            .await
            .map_err(|e| match e {
                ragchat_vector::Error::CollectionExists(_) => {
                    AppError::Store(format!("Collection '{}' already exists", name))
                }
                other => other.into(),
            })
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        Ok(self.db.delete_collection(name).await?)
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let mut infos = Vec::new();
        for name in self.db.list_collections() {
            // Dropped between listing and lookup; skip it.
            let Ok(stats) = self.db.collection_stats(&name) else {
                continue;
            };
            infos.push(CollectionInfo {
                name,
                document_count: stats.vector_count,
                dimensions: stats.dimensions,
                distance_metric: stats.metric,
            });
        }
        Ok(infos)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.db.collection_exists(name))
    }

    async fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        let stats = self.db.collection_stats(name)?;
        Ok(CollectionInfo {
            name: stats.name,
            document_count: stats.vector_count,
            dimensions: stats.dimensions,
            distance_metric: stats.metric,
        })
    }

    async fn replace_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        records: &[EmbeddedRecord],
    ) -> Result<usize> {
        let count = self
            .db
            .replace_collection(name, dimensions, metric, to_batch(records))
            .await?;
        debug!(name, count, "Replaced collection");
        Ok(count)
    }

    async fn insert(&self, collection: &str, records: &[EmbeddedRecord]) -> Result<usize> {
        let count = self.db.insert_batch(collection, to_batch(records)).await?;
        debug!(collection, count, "Inserted records");
        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let hits = self.db.search(collection, embedding, limit).await?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let payload = hit.metadata.unwrap_or_default();
                SearchResult {
                    id: hit.id,
                    content: payload.get_string(KEY_CONTENT).unwrap_or_default().to_string(),
                    distance: hit.distance,
                    metadata: from_payload(&payload),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, content: &str, embedding: Vec<f32>, seq: usize) -> EmbeddedRecord {
        EmbeddedRecord {
            id: id.to_string(),
            profile: "docs".to_string(),
            content: content.to_string(),
            embedding,
            metadata: RecordMetadata {
                source: "notes.md".to_string(),
                sequence_index: seq,
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn test_insert_and_search_round_trips_content() {
        let store = LocalVectorStore::in_memory().await.unwrap();
        store
            .create_collection("docs", 2, DistanceMetric::Euclidean)
            .await
            .unwrap();

        store
            .insert(
                "docs",
                &[
                    record("a", "ABCD", vec![0.0, 0.0], 0),
                    record("b", "DEFG", vec![1.0, 0.0], 1),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("docs", &[0.9, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].content, "DEFG");
        assert_eq!(hits[1].content, "ABCD");
        let meta = hits[0].metadata.as_ref().unwrap();
        assert_eq!(meta.source, "notes.md");
        assert_eq!(meta.sequence_index, 1);
    }

    #[tokio::test]
    async fn test_missing_collection_is_not_found() {
        let store = LocalVectorStore::in_memory().await.unwrap();
        assert!(matches!(
            store.search("ghost", &[1.0], 3).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_collection("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_embedding_error() {
        let store = LocalVectorStore::in_memory().await.unwrap();
        store
            .create_collection("docs", 3, DistanceMetric::Euclidean)
            .await
            .unwrap();
        let err = store
            .insert("docs", &[record("a", "x", vec![1.0], 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
        assert_eq!(store.count("docs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replace_with_bad_vector_keeps_previous() {
        let store = LocalVectorStore::in_memory().await.unwrap();
        store
            .replace_collection(
                "Team Docs",
                2,
                DistanceMetric::Euclidean,
                &[record("a", "old", vec![0.0, 0.0], 0)],
            )
            .await
            .unwrap();

        let err = store
            .replace_collection(
                "Team Docs",
                2,
                DistanceMetric::Euclidean,
                &[record("b", "new", vec![1.0, 1.0], 0), record("c", "bad", vec![1.0], 1)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));

        let hits = store.search("Team Docs", &[0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "old");
    }

    #[tokio::test]
    async fn test_persisted_store_reopens() {
        let dir = TempDir::new().unwrap();
        {
            let store = LocalVectorStore::open(dir.path()).await.unwrap();
            store
                .create_collection("docs", 2, DistanceMetric::Cosine)
                .await
                .unwrap();
            store
                .insert("docs", &[record("a", "kept", vec![1.0, 0.0], 0)])
                .await
                .unwrap();
        }

        let store = LocalVectorStore::open(dir.path()).await.unwrap();
        let infos = store.list_collections().await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].distance_metric, DistanceMetric::Cosine);
        assert_eq!(infos[0].document_count, 1);

        let hits = store.search("docs", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].content, "kept");
    }
}
