//! Ollama chat and embedding clients.

use crate::llm::client::LLMClient;
use crate::rag::embeddings::EmbeddingProvider;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    generation::{
        chat::{request::ChatMessageRequest, ChatMessage},
        embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest},
    },
    Ollama,
};
use reqwest::Url;

const DEFAULT_PORT: u16 = 11434;

/// Split a base URL into the `scheme://host` and port `Ollama::new` expects.
fn parse_endpoint(base_url: &str) -> Result<(String, u16)> {
    let url = Url::parse(base_url).map_err(|e| {
        AppError::Configuration(format!("Invalid Ollama URL '{}': {}", base_url, e))
    })?;
    let host = url.host_str().ok_or_else(|| {
        AppError::Configuration(format!("Ollama URL '{}' has no host", base_url))
    })?;
    let port = url.port().unwrap_or(DEFAULT_PORT);
    Ok((format!("{}://{}", url.scheme(), host), port))
}

fn connect(base_url: &str) -> Result<Ollama> {
    let (host, port) = parse_endpoint(base_url)?;
    Ok(Ollama::new(host, port))
}

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        Ok(Self {
            client: connect(base_url)?,
            model,
        })
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage::user(prompt.to_string())]).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Embeddings from an Ollama server's `/api/embed` endpoint.
pub struct OllamaEmbedder {
    client: Ollama,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        Ok(Self {
            client: connect(base_url)?,
            model,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = GenerateEmbeddingsRequest::new(
            self.model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| AppError::Embedding(format!("Ollama embedding error: {}", e)))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("Ollama returned no embedding".to_string()))
    }
}
