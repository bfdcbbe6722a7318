//! End-to-end ingestion and question answering.
//!
//! ```text
//! ingest:  file -> loader -> chunker -> embeddings (all) -> profile upsert
//! ask:     question -> embeddings -> profile search -> context -> prompt -> LLM
//! ```
//!
//! Ingestion is all-or-nothing: every chunk is embedded before the store is
//! touched, so an embedding failure leaves the profile as it was.

use crate::db::ProfileStore;
use crate::llm::LLMClient;
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::EmbeddingService;
use crate::rag::loader::LoaderRegistry;
use crate::rag::prompt::PromptComposer;
use crate::rag::retrieval::RetrievalAssembler;
use crate::types::{AppError, PendingRecord, RecordMetadata, Result, SearchResult};
use crate::utils::toml_config::RagChatConfig;
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEFAULT_TOP_K: usize = 10;
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Outcome of one document ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub profile: String,
    pub chunks: usize,
    /// Generated record ids, in chunk order.
    pub ids: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    /// The exact prompt sent to the model.
    pub prompt: String,
    /// Retrieved chunks, closest first.
    pub sources: Vec<SearchResult>,
}

pub struct RagPipeline {
    loaders: LoaderRegistry,
    chunker: TextChunker,
    embeddings: Arc<EmbeddingService>,
    profiles: Arc<ProfileStore>,
    retrieval: RetrievalAssembler,
    composer: PromptComposer,
    llm: Arc<dyn LLMClient>,
    llm_timeout: Duration,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        loaders: LoaderRegistry,
        chunker: TextChunker,
        embeddings: EmbeddingService,
        profiles: ProfileStore,
        llm: Arc<dyn LLMClient>,
    ) -> Self {
        let embeddings = Arc::new(embeddings);
        let profiles = Arc::new(profiles);
        Self {
            retrieval: RetrievalAssembler::new(embeddings.clone(), profiles.clone(), "\n"),
            loaders,
            chunker,
            embeddings,
            profiles,
            composer: PromptComposer::default(),
            llm,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Wire every component from configuration.
    pub async fn from_config(config: &RagChatConfig) -> Result<Self> {
        config.validate()?;

        let loaders = LoaderRegistry::new(config.chunking.max_document_bytes)?;
        let chunker = TextChunker::from_config(&config.chunking)?;
        let embeddings = EmbeddingService::from_config(&config.embedding)?;
        let store = config.store.backend.create_store().await?;
        let profiles = ProfileStore::new(
            Arc::from(store),
            config.embedding.dimensions,
            config.store.distance,
            config.store.write_policy,
        )?;
        let llm: Arc<dyn LLMClient> = Arc::from(config.llm.to_provider()?.create_client()?);

        Ok(Self::new(loaders, chunker, embeddings, profiles, llm)
            .with_separator(config.retrieval.separator.clone())
            .with_composer(PromptComposer::from_config(&config.prompt))
            .with_top_k(config.retrieval.top_k)
            .with_llm_timeout(config.llm.timeout()))
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.retrieval =
            RetrievalAssembler::new(self.embeddings.clone(), self.profiles.clone(), separator);
        self
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn loaders_mut(&mut self) -> &mut LoaderRegistry {
        &mut self.loaders
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Load a file and ingest its text into `profile`.
    pub async fn ingest(&self, profile: &str, path: &Path) -> Result<IngestReport> {
        ProfileStore::validate_profile_name(profile)?;
        let document = self.loaders.load_document(path).await?;
        self.ingest_text(profile, &document.source, &document.text)
            .await
    }

    /// Chunk, embed and store already-extracted text.
    pub async fn ingest_text(&self, profile: &str, source: &str, text: &str) -> Result<IngestReport> {
        ProfileStore::validate_profile_name(profile)?;
        let started = Instant::now();

        let chunks = self.chunker.chunk_with_metadata(text);
        if chunks.is_empty() {
            return Err(AppError::Validation(format!(
                "'{}' produced no chunks ({} chars, overlap {})",
                source,
                text.chars().count(),
                self.chunker.chunk_overlap()
            )));
        }
        debug!(profile, source, chunks = chunks.len(), "Document chunked");

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        let created_at = Utc::now();
        let records: Vec<PendingRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| PendingRecord {
                content: chunk.content,
                embedding,
                metadata: RecordMetadata {
                    source: source.to_string(),
                    sequence_index: chunk.sequence_index,
                    created_at,
                },
            })
            .collect();

        let ids = self.profiles.upsert(profile, records).await?;
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(profile, source, chunks = ids.len(), duration_ms, "Document ingested");

        Ok(IngestReport {
            profile: profile.to_string(),
            chunks: ids.len(),
            ids,
            duration_ms,
        })
    }

    /// Context block for `question`, without calling the model.
    pub async fn context(&self, profile: &str, question: &str, k: usize) -> Result<String> {
        self.retrieval.assemble_context(profile, question, k).await
    }

    /// Retrieve, compose and ask the model.
    pub async fn ask(&self, profile: &str, question: &str, k: usize) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(AppError::Validation("Question cannot be empty".to_string()));
        }

        let retrieved = self.retrieval.retrieve(profile, question, k).await?;
        let context = self.retrieval.join(&retrieved);
        let prompt = self.composer.compose(&context, question);

        let started = Instant::now();
        let answer = self.generate(&prompt).await?;
        info!(
            profile,
            sources = retrieved.len(),
            model = self.llm.model_name(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(Answer {
            answer,
            prompt,
            sources: retrieved.hits,
        })
    }

    /// Send a prompt straight to the model, with the same timeout as `ask`.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        tokio::time::timeout(self.llm_timeout, self.llm.generate(prompt))
            .await
            .map_err(|_| {
                AppError::LLM(format!(
                    "Model did not answer within {}s",
                    self.llm_timeout.as_secs()
                ))
            })?
    }
}
