//! LLM provider clients.
//!
//! [`LLMClient`] is the one seam the answer step depends on. [`Provider`]
//! picks an implementation at runtime; which ones exist depends on Cargo
//! features:
//! - `ollama` - local Ollama server (default; also provides embeddings)
//! - `openai` - OpenAI-compatible chat completions

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider};
