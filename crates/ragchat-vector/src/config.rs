//! Configuration for ragchat-vector.

use std::path::PathBuf;

/// Configuration for the vector database.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Directory holding the on-disk snapshot. `None` keeps everything in memory.
    pub data_path: Option<PathBuf>,
}

impl Config {
    /// In-memory database; contents are lost when the process exits.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Database persisted under `path`, loaded on open and rewritten after
    /// every mutation.
    pub fn persistent<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            data_path: Some(path.into()),
        }
    }
}
