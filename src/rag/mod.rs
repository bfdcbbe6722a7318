//! Retrieval-augmented generation pipeline.
//!
//! - [`loader`] - format detection and text extraction
//! - [`chunker`] - fixed-window chunking with overlap
//! - [`embeddings`] - embedding providers and the batching gateway
//! - [`retrieval`] - query embedding, profile search, context assembly
//! - [`prompt`] - final prompt composition
//! - [`pipeline`] - the above wired together
//!
//! ```ignore
//! use ragchat::rag::pipeline::RagPipeline;
//!
//! let pipeline = RagPipeline::from_config(&config).await?;
//! pipeline.ingest("handbook", Path::new("handbook.md")).await?;
//! let answer = pipeline.ask("handbook", "How is leave accrued?", 5).await?;
//! println!("{}", answer.answer);
//! ```

pub mod chunker;
pub mod embeddings;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;

pub use chunker::TextChunker;
pub use embeddings::{EmbeddingProvider, EmbeddingService};
pub use loader::{DocumentFormat, DocumentLoader, LoaderRegistry};
pub use pipeline::{Answer, IngestReport, RagPipeline};
pub use prompt::{PromptComposer, DEFAULT_TEMPLATE};
pub use retrieval::RetrievalAssembler;
