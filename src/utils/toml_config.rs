//! TOML-based configuration for ragchat
//!
//! Everything the pipeline needs is declared in `ragchat.toml`. Every field
//! has a default, so an empty file (or no file at all) yields a working
//! local-first setup: Ollama for generation and embeddings, an embedded vector
//! store under `./data/vectors`.
//!
//! Secrets never live in the file. Providers that need a key name the
//! environment variable holding it (`api_key_env`), and `.env` files are
//! honored by the binary.

use crate::db::profile::WritePolicy;
use crate::db::vectorstore::VectorStoreProvider;
use crate::llm::client::Provider;
use crate::rag::embeddings::EmbeddingProviderConfig;
use crate::rag::prompt::DEFAULT_TEMPLATE;
use crate::types::AppError;
use ragchat_vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Root configuration structure loaded from ragchat.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagChatConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_model")]
        model: String,
    },
    #[serde(rename = "openai")]
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
    },
}

pub(crate) fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

pub(crate) fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

pub(crate) fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

pub(crate) fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,

    /// Upper bound on a single generation call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::Ollama {
                base_url: default_ollama_url(),
                model: default_model(),
            },
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve into a concrete [`Provider`], reading any API key from the environment.
    pub fn to_provider(&self) -> Result<Provider, ConfigError> {
        match &self.provider {
            #[cfg(feature = "ollama")]
            ProviderConfig::Ollama { base_url, model } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            }),
            #[cfg(feature = "openai")]
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => Ok(Provider::OpenAI {
                api_key: resolve_env(api_key_env)?,
                api_base: api_base.clone(),
                model: model.clone(),
            }),
            #[allow(unreachable_patterns)]
            other => Err(ConfigError::ValidationError(format!(
                "LLM provider '{}' is not enabled in this build",
                other.kind()
            ))),
        }
    }
}

impl ProviderConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderConfig::Ollama { .. } => "ollama",
            ProviderConfig::OpenAI { .. } => "openai",
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(flatten)]
    pub provider: EmbeddingProviderConfig,

    /// Length of every vector the provider returns
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum embedding requests in flight during ingestion
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_dimensions() -> usize {
    3072
}

fn default_concurrency() -> usize {
    4
}

fn default_embedding_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderConfig::default(),
            dimensions: default_dimensions(),
            concurrency: default_concurrency(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============= Store Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub backend: VectorStoreProvider,

    /// Metric new profiles are created with
    #[serde(default)]
    pub distance: DistanceMetric,

    /// What ingesting into an existing profile does to its previous contents
    #[serde(default)]
    pub write_policy: WritePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorStoreProvider::default(),
            distance: DistanceMetric::default(),
            write_policy: WritePolicy::default(),
        }
    }
}

// ============= Chunking Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by neighboring chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Larger documents are rejected rather than truncated
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_max_document_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

// ============= Retrieval & Prompt Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Inserted between retrieved chunks; "" concatenates them directly
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_top_k() -> usize {
    10
}

fn default_separator() -> String {
    "\n".to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            separator: default_separator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Role and instructions placed ahead of the retrieved context
    #[serde(default = "default_template")]
    pub template: String,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

pub(crate) fn resolve_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

impl RagChatConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound(path)) => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: RagChatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check numeric bounds and cross-field constraints.
    ///
    /// Environment variables are not consulted here; see [`missing_env_vars`](Self::missing_env_vars).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.chunking.chunk_size == 0 {
            return invalid("chunking.chunk_size must be greater than 0".into());
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return invalid(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ));
        }
        if self.chunking.max_document_bytes == 0 {
            return invalid("chunking.max_document_bytes must be greater than 0".into());
        }
        if self.embedding.dimensions == 0 {
            return invalid("embedding.dimensions must be greater than 0".into());
        }
        if self.embedding.concurrency == 0 {
            return invalid("embedding.concurrency must be greater than 0".into());
        }
        if self.embedding.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return invalid("timeout_secs must be greater than 0".into());
        }
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be greater than 0".into());
        }
        if let VectorStoreProvider::PgVector {
            max_connections, ..
        } = &self.store.backend
        {
            if *max_connections == 0 {
                return invalid("store.max_connections must be greater than 0".into());
            }
        }

        Ok(())
    }

    /// Environment variables named by the configuration that are not set.
    pub fn missing_env_vars(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let ProviderConfig::OpenAI { api_key_env, .. } = &self.llm.provider {
            names.push(api_key_env.clone());
        }
        if let EmbeddingProviderConfig::OpenAI { api_key_env, .. } = &self.embedding.provider {
            names.push(api_key_env.clone());
        }
        if let VectorStoreProvider::PgVector {
            connection_string_env,
            ..
        } = &self.store.backend
        {
            names.push(connection_string_env.clone());
        }

        names.sort();
        names.dedup();
        names.retain(|n| std::env::var(n).is_err());
        names
    }
}
