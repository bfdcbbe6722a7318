//! Query-time retrieval: embed the question, search the profile, join hits.

use crate::db::ProfileStore;
use crate::rag::embeddings::EmbeddingService;
use crate::types::{Result, RetrievalResult};
use std::sync::Arc;
use tracing::debug;

pub struct RetrievalAssembler {
    embeddings: Arc<EmbeddingService>,
    profiles: Arc<ProfileStore>,
    separator: String,
}

impl RetrievalAssembler {
    pub fn new(
        embeddings: Arc<EmbeddingService>,
        profiles: Arc<ProfileStore>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            embeddings,
            profiles,
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The `k` chunks of `profile` closest to `question`, closest first.
    pub async fn retrieve(&self, profile: &str, question: &str, k: usize) -> Result<RetrievalResult> {
        let query = self.embeddings.embed_query(question).await?;
        let result = self.profiles.search(profile, &query, k).await?;
        debug!(profile, k, hits = result.len(), "Retrieved context");
        Ok(result)
    }

    /// Join hit contents in ranked order.
    ///
    /// No truncation: the output is at most `k` chunks long.
    pub fn join(&self, result: &RetrievalResult) -> String {
        result.contents().collect::<Vec<_>>().join(&self.separator)
    }

    pub async fn assemble_context(&self, profile: &str, question: &str, k: usize) -> Result<String> {
        let result = self.retrieve(profile, question, k).await?;
        Ok(self.join(&result))
    }
}
