//! Embedding gateway.
//!
//! [`EmbeddingProvider`] is the narrow contract an embedding backend fulfils:
//! one text in, one vector out. [`EmbeddingService`] wraps a provider with the
//! guarantees the rest of the pipeline relies on:
//!
//! - every vector has exactly the configured number of dimensions;
//! - a batch comes back the same length and in the same order as its input,
//!   even though up to `concurrency` requests run at once;
//! - each provider call is bounded by a timeout;
//! - one failure fails the whole batch.

use crate::types::{AppError, Result};
use crate::utils::toml_config::{
    default_model, default_ollama_url, default_openai_base, default_openai_key_env, resolve_env,
    EmbeddingConfig,
};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

// ============= Provider Contract =============

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name for logs, e.g. `"ollama"`.
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmbeddingProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_model")]
        model: String,
    },
    /// Any endpoint speaking the OpenAI `/embeddings` API.
    #[serde(rename = "openai")]
    OpenAI {
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
    },
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        EmbeddingProviderConfig::Ollama {
            base_url: default_ollama_url(),
            model: default_model(),
        }
    }
}

impl EmbeddingProviderConfig {
    pub fn create_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self {
            #[cfg(feature = "ollama")]
            EmbeddingProviderConfig::Ollama { base_url, model } => Ok(Arc::new(
                crate::llm::ollama::OllamaEmbedder::new(base_url, model.clone())?,
            )),
            EmbeddingProviderConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => {
                let api_key = resolve_env(api_key_env)?;
                Ok(Arc::new(OpenAIEmbedder::new(
                    api_key,
                    api_base.clone(),
                    model.clone(),
                )?))
            }
            #[allow(unreachable_patterns)]
            _ => Err(AppError::Configuration(
                "Embedding provider not enabled. Check feature flags.".into(),
            )),
        }
    }
}

// ============= Gateway =============

#[derive(Clone)]
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
    concurrency: usize,
    timeout: Duration,
}

impl EmbeddingService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        dimensions: usize,
        concurrency: usize,
        timeout: Duration,
    ) -> Result<Self> {
        if dimensions == 0 {
            return Err(AppError::Validation(
                "Embedding dimensions must be greater than 0".into(),
            ));
        }
        if concurrency == 0 {
            return Err(AppError::Validation(
                "Embedding concurrency must be greater than 0".into(),
            ));
        }

        Ok(Self {
            provider,
            dimensions,
            concurrency,
            timeout,
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Self::new(
            config.provider.create_provider()?,
            config.dimensions,
            config.concurrency,
            config.timeout(),
        )
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Embed a question or any single text.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text).await
    }

    /// Embed many texts; `result[i]` is the vector for `texts[i]`.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let started = Instant::now();

        let vectors: Vec<Vec<f32>> = stream::iter(texts.iter().enumerate())
            .map(|(i, text)| async move {
                self.embed_one(text).await.map_err(|e| match e {
                    AppError::Embedding(msg) => AppError::Embedding(format!("text {}: {}", i, msg)),
                    other => other,
                })
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        debug!(
            provider = self.provider.name(),
            count = vectors.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Embedded batch"
        );
        Ok(vectors)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let vector = tokio::time::timeout(self.timeout, self.provider.embed(text))
            .await
            .map_err(|_| {
                AppError::Embedding(format!(
                    "{} did not respond within {:?}",
                    self.provider.name(),
                    self.timeout
                ))
            })??;

        if vector.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "{} returned {} dimensions, expected {}",
                self.provider.name(),
                vector.len(),
                self.dimensions
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Embedding(format!(
                "{} returned NaN or infinite values",
                self.provider.name()
            )));
        }
        Ok(vector)
    }
}

// ============= OpenAI-compatible Provider =============

/// Embeddings over any OpenAI-compatible `POST {base}/embeddings` endpoint.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAIEmbedder {
    pub fn new(api_key: String, api_base: String, model: String) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(AppError::Configuration("Missing embedding model name".into()));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", api_base.trim_end_matches('/')),
            api_key,
            model,
        })
    }

    /// Embed several texts in one request, ordered as given.
    pub async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("OpenAI embeddings request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(AppError::Embedding(format!(
                "OpenAI embeddings request failed ({}): {}",
                status, body
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Invalid embeddings response: {}", e)))?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Embedding("Empty embeddings response".into()))
    }
}
