//! # ragchat
//!
//! A minimal retrieval-augmented chat pipeline: split a document into
//! overlapping chunks, embed them into a named profile, and answer questions
//! from the chunks closest to each question.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use ragchat::{RagChatConfig, RagPipeline};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> ragchat::Result<()> {
//!     let config = RagChatConfig::load("ragchat.toml")?;
//!     let pipeline = RagPipeline::from_config(&config).await?;
//!
//!     let report = pipeline.ingest("handbook", Path::new("handbook.md")).await?;
//!     println!("{} chunks stored", report.chunks);
//!
//!     let answer = pipeline.ask("handbook", "How is leave accrued?", 5).await?;
//!     println!("{}", answer.answer);
//!     Ok(())
//! }
//! ```
//!
//! ### Chunking on its own
//!
//! ```rust
//! use ragchat::rag::TextChunker;
//!
//! let chunker = TextChunker::new(4, 1).unwrap();
//! assert_eq!(chunker.chunk("ABCDEFGHIJ"), ["ABCD", "DEFG", "GHIJ"]);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama chat and embeddings (default) |
//! | `openai` | OpenAI chat completions |
//! | `pgvector` | PostgreSQL + pgvector store |
//! | `full` | All of the above |
//!
//! OpenAI-compatible embeddings and the embedded local store are always
//! available.
//!
//! ## Modules
//!
//! - [`rag`] - loading, chunking, embedding, retrieval, prompt composition
//! - [`db`] - vector store backends and per-profile semantics
//! - [`llm`] - language-model clients
//! - [`cli`] - the `ragchat` command line
//! - [`utils`] - `ragchat.toml` configuration
//! - [`types`] - shared data model and errors

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line parsing and terminal output.
pub mod cli;
/// Vector stores and profiles.
pub mod db;
/// LLM provider clients.
pub mod llm;
/// Retrieval-augmented generation components.
pub mod rag;
/// Core types and errors.
pub mod types;
/// Configuration.
pub mod utils;

// Re-export commonly used types
pub use db::{ProfileStore, VectorStore, VectorStoreProvider, WritePolicy};
pub use llm::{LLMClient, Provider};
pub use rag::{Answer, EmbeddingService, IngestReport, RagPipeline, TextChunker};
pub use types::{AppError, Result};
pub use utils::toml_config::{ConfigError, RagChatConfig};
