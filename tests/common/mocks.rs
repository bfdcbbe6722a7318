//! Test doubles shared by the integration tests.
//!
//! None of these touch the network: embeddings come from a lookup table, the
//! language model echoes a canned reply while recording its prompts, and the
//! store wrapper fails writes on demand.

use async_trait::async_trait;
use parking_lot::Mutex;
use ragchat::db::{CollectionInfo, VectorStore};
use ragchat::llm::LLMClient;
use ragchat::rag::EmbeddingProvider;
use ragchat::types::{AppError, EmbeddedRecord, Result, SearchResult};
use ragchat_vector::DistanceMetric;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock LLM client with a fixed reply.
///
/// Every prompt it receives is recorded so tests can assert on the exact
/// text the pipeline composed.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLLMClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A client whose every call fails with `AppError::LLM`.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn record(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.record(prompt)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Embeds by exact lookup. Unknown texts get `fallback`, or an error when
/// there is none.
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    calls: AtomicUsize,
}

impl TableEmbedder {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, Vec<f32>)>) -> Self {
        Self {
            table: entries
                .into_iter()
                .map(|(text, vector)| (text.to_string(), vector))
                .collect(),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    fn name(&self) -> &str {
        "table"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(text)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| AppError::Embedding(format!("No embedding for {:?}", text)))
    }
}

/// Returns `vector` for everything except texts containing `poison`.
pub struct FailingEmbedder {
    poison: String,
    vector: Vec<f32>,
}

impl FailingEmbedder {
    pub fn new(poison: &str, vector: Vec<f32>) -> Self {
        Self {
            poison: poison.to_string(),
            vector,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(&self.poison) {
            return Err(AppError::Embedding("provider unreachable".to_string()));
        }
        Ok(self.vector.clone())
    }
}

/// Wraps a store and fails any write whose records mention `poison`.
pub struct RejectingStore<S> {
    inner: S,
    poison: String,
}

impl<S: VectorStore> RejectingStore<S> {
    pub fn new(inner: S, poison: &str) -> Self {
        Self {
            inner,
            poison: poison.to_string(),
        }
    }

    fn check(&self, records: &[EmbeddedRecord]) -> Result<()> {
        if records.iter().any(|r| r.content.contains(&self.poison)) {
            return Err(AppError::Store("write failed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: VectorStore> VectorStore for RejectingStore<S> {
    fn provider_name(&self) -> &'static str {
        "rejecting"
    }

    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        self.inner.create_collection(name, dimensions, metric).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        self.inner.list_collections().await
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        self.inner.collection_exists(name).await
    }

    async fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        self.inner.collection_info(name).await
    }

    async fn replace_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        records: &[EmbeddedRecord],
    ) -> Result<usize> {
        self.check(records)?;
        self.inner
            .replace_collection(name, dimensions, metric, records)
            .await
    }

    async fn insert(&self, collection: &str, records: &[EmbeddedRecord]) -> Result<usize> {
        self.check(records)?;
        self.inner.insert(collection, records).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.inner.search(collection, embedding, limit).await
    }
}
