//! Vector storage.
//!
//! - [`vectorstore`]: the backend trait and the provider enum that builds one
//! - [`local`]: embedded store over `ragchat-vector` (default)
//! - [`pgvector`]: PostgreSQL + pgvector (feature `pgvector`)
//! - [`profile`]: per-profile write/search rules on top of any backend

pub mod local;
#[cfg(feature = "pgvector")]
pub mod pgvector;
pub mod profile;
pub mod vectorstore;

// Re-exports
pub use local::LocalVectorStore;
#[cfg(feature = "pgvector")]
pub use pgvector::PgVectorStore;
pub use profile::{ProfileStore, WritePolicy};
pub use vectorstore::{CollectionInfo, VectorStore, VectorStoreProvider};
