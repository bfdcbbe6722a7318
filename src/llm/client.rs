//! LLM client abstraction and provider selection
//!
//! - **Ollama**: local inference (feature `ollama`, default)
//! - **OpenAI**: chat completions against any OpenAI-compatible API (feature `openai`)

use crate::types::{AppError, Result};
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction.
///
/// The composed prompt is sent as a single user message.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection.
///
/// Variants only exist for providers compiled into this build.
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (and compatible endpoints)
    ///
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    /// };
    /// ```
    #[cfg(feature = "openai")]
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Ollama server
    ///
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    #[cfg(feature = "ollama")]
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Create an LLM client for this provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built (bad URL, bad key).
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url, model.clone())?,
            )),

            #[allow(unreachable_patterns)]
            _ => Err(AppError::Configuration(
                "No LLM provider enabled. Build with --features ollama or openai".into(),
            )),
        }
    }

    /// Get the provider name as a string
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI { .. } => "openai",
            #[cfg(feature = "ollama")]
            Provider::Ollama { .. } => "ollama",
            #[allow(unreachable_patterns)]
            _ => "none",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI { model, .. } => model,
            #[cfg(feature = "ollama")]
            Provider::Ollama { model, .. } => model,
            #[allow(unreachable_patterns)]
            _ => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "ollama")]
    #[test]
    fn test_ollama_provider() {
        let provider = Provider::Ollama {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
        };
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3.2");

        let client = provider.create_client().unwrap();
        assert_eq!(client.model_name(), "llama3.2");
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_bad_ollama_url_is_configuration_error() {
        let provider = Provider::Ollama {
            base_url: "not a url".to_string(),
            model: "llama3.2".to_string(),
        };
        match provider.create_client() {
            Err(AppError::Configuration(msg)) => assert!(msg.contains("not a url")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_openai_provider() {
        let provider = Provider::OpenAI {
            api_key: "sk-test".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        };
        assert_eq!(provider.name(), "openai");
        let client = provider.create_client().unwrap();
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }
}
