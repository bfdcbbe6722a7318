//! Error types for ragchat-vector.

use thiserror::Error;

/// Result type for ragchat-vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the vector database.
#[derive(Error, Debug)]
pub enum Error {
    /// A collection with this name is already registered.
    #[error("Collection '{0}' already exists")]
    CollectionExists(String),

    /// No collection with this name is registered.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// A vector's length differs from the collection's dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensions the collection was created with.
        expected: usize,
        /// Dimensions of the offending vector.
        actual: usize,
    },

    /// Empty vector, or one holding NaN/infinite components.
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Reading or writing the on-disk snapshot failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Bad database or collection settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

}
