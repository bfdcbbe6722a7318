//! On-disk snapshots.
//!
//! Layout under the database directory:
//!
//! ```text
//! collections.json        registered collection names
//! {dir}/metadata.json     real name, dimensions and metric
//! {dir}/vectors.json      every vector with its payload, in insertion order
//! ```
//!
//! `{dir}` is the collection name with every byte outside `[a-z0-9_-]`
//! written as `%XX`, so any name maps to one distinct, flat directory even on
//! case-insensitive filesystems.
//!
//! A collection is written into `{dir}.staging` and then renamed over `{dir}`,
//! so readers only ever see a complete snapshot. If a crash lands between the
//! two renames, the previous snapshot is still found under `{dir}.old`.

use crate::collection::Collection;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::StoredVector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const COLLECTIONS_FILE: &str = "collections.json";
const METADATA_FILE: &str = "metadata.json";
const VECTORS_FILE: &str = "vectors.json";

/// Longest directory name a collection may map to.
pub const MAX_DIR_NAME_LEN: usize = 240;

/// Directory name for a collection.
pub fn dir_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionMetadata {
    name: String,
    dimensions: usize,
    metric: DistanceMetric,
}

async fn write_atomic(path: &Path, contents: Vec<u8>) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value)
        .map_err(|e| Error::Persistence(format!("Failed to serialize {}: {}", what, e)))
}

/// Write the list of registered collection names.
pub async fn save_collection_names(base_path: &Path, names: &[String]) -> Result<()> {
    tokio::fs::create_dir_all(base_path).await?;
    write_atomic(&base_path.join(COLLECTIONS_FILE), to_json(&names, "collections")?).await
}

/// Read the list of registered collection names. A missing file means none.
pub async fn load_collection_names(base_path: &Path) -> Result<Vec<String>> {
    let path = base_path.join(COLLECTIONS_FILE);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(Vec::new());
    }
    let data = tokio::fs::read(&path).await?;
    serde_json::from_slice(&data)
        .map_err(|e| Error::Persistence(format!("Failed to parse {}: {}", COLLECTIONS_FILE, e)))
}

/// Save one collection's metadata and vectors, replacing any earlier snapshot.
pub async fn save_collection(base_path: &Path, collection: &Collection) -> Result<()> {
    let dir = base_path.join(dir_name(collection.name()));
    let staging = sibling(&dir, ".staging");
    let retired = sibling(&dir, ".old");

    if tokio::fs::try_exists(&staging).await? {
        tokio::fs::remove_dir_all(&staging).await?;
    }
    tokio::fs::create_dir_all(&staging).await?;

    let metadata = CollectionMetadata {
        name: collection.name().to_string(),
        dimensions: collection.dimensions(),
        metric: collection.metric(),
    };
    tokio::fs::write(staging.join(METADATA_FILE), to_json(&metadata, "metadata")?).await?;

    let vectors = collection.export_all();
    tokio::fs::write(staging.join(VECTORS_FILE), to_json(&vectors, "vectors")?).await?;

    if tokio::fs::try_exists(&dir).await? {
        if tokio::fs::try_exists(&retired).await? {
            tokio::fs::remove_dir_all(&retired).await?;
        }
        tokio::fs::rename(&dir, &retired).await?;
    }
    tokio::fs::rename(&staging, &dir).await?;
    if tokio::fs::try_exists(&retired).await? {
        tokio::fs::remove_dir_all(&retired).await?;
    }

    debug!(name = collection.name(), count = vectors.len(), "Saved collection");
    Ok(())
}

/// Load one collection from its directory.
pub async fn load_collection(base_path: &Path, name: &str) -> Result<Collection> {
    let mut dir = base_path.join(dir_name(name));
    if !tokio::fs::try_exists(&dir).await? {
        let retired = sibling(&dir, ".old");
        if !tokio::fs::try_exists(&retired).await? {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        warn!(name, "Recovering collection from interrupted save");
        dir = retired;
    }

    let data = tokio::fs::read(dir.join(METADATA_FILE)).await?;
    let metadata: CollectionMetadata = serde_json::from_slice(&data)
        .map_err(|e| Error::Persistence(format!("Failed to parse metadata for '{}': {}", name, e)))?;
    if metadata.name != name {
        return Err(Error::Persistence(format!(
            "Directory for '{}' holds collection '{}'",
            name, metadata.name
        )));
    }

    let collection = Collection::new(metadata.name, metadata.dimensions, metadata.metric)?;

    let vectors_path = dir.join(VECTORS_FILE);
    if tokio::fs::try_exists(&vectors_path).await? {
        let data = tokio::fs::read(&vectors_path).await?;
        let vectors: Vec<StoredVector> = serde_json::from_slice(&data)
            .map_err(|e| Error::Persistence(format!("Failed to parse vectors for '{}': {}", name, e)))?;

        collection.insert_batch(
            vectors
                .iter()
                .map(|v| (v.id.as_str(), v.vector.as_slice(), v.metadata.clone())),
        )?;
    }

    info!(name, dimensions = collection.dimensions(), count = collection.len(), "Loaded collection");
    Ok(collection)
}

/// Remove a collection's directory, if present.
pub async fn delete_collection_files(base_path: &Path, name: &str) -> Result<()> {
    let dir = base_path.join(dir_name(name));
    if tokio::fs::try_exists(&dir).await? {
        tokio::fs::remove_dir_all(&dir).await?;
    }
    Ok(())
}
