use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============= RAG Types =============

/// A window of a source document, produced by the chunker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// Position of this chunk in its document, starting at 0.
    pub sequence_index: usize,
    /// Byte offset of the first byte of `content` in the source text.
    pub start_byte: usize,
    /// Byte offset one past the last byte of `content`.
    pub end_byte: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Where the chunk came from (file path or caller-supplied label).
    pub source: String,
    pub sequence_index: usize,
    pub created_at: DateTime<Utc>,
}

/// A chunk ready to be written: content, its embedding, and provenance.
/// The store assigns the id.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// A chunk as persisted inside a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedRecord {
    pub id: String,
    pub profile: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// One nearest-neighbor hit. Lower `distance` is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub distance: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
}

/// Ranked hits for one query, closest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<SearchResult>,
}

impl RetrievalResult {
    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|h| h.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
