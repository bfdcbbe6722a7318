//! Common types for ragchat-vector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a vector inside a collection.
pub type VectorId = String;

/// Key-value payload stored next to a vector.
///
/// Keys are kept sorted so snapshots on disk are stable between saves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Payload entries.
    pub data: BTreeMap<String, MetadataValue>,
}

impl VectorMetadata {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a payload from key-value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetadataValue>,
    {
        Self {
            data: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Insert or overwrite an entry.
    pub fn insert<K: Into<String>, V: Into<MetadataValue>>(&mut self, key: K, value: V) {
        self.data.insert(key.into(), value.into());
    }

    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.data.get(key)
    }

    /// Look up a string entry.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.data.get(key)? {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up an integer entry.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.data.get(key)? {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Whether the payload has no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// A payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

impl From<usize> for MetadataValue {
    fn from(i: usize) -> Self {
        MetadataValue::Int(i as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// One hit from a nearest-neighbor search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// ID of the matched vector.
    pub id: VectorId,
    /// Distance to the query under the collection's metric. Lower is closer.
    pub distance: f32,
    /// Payload stored with the vector.
    pub metadata: Option<VectorMetadata>,
}

/// A vector as held by the index and written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredVector {
    /// External ID.
    pub id: VectorId,
    /// Vector components.
    pub vector: Vec<f32>,
    /// Optional payload.
    pub metadata: Option<VectorMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_accessors() {
        let mut meta = VectorMetadata::new();
        meta.insert("content", "ABCD");
        meta.insert("sequence_index", 2usize);

        assert_eq!(meta.get_string("content"), Some("ABCD"));
        assert_eq!(meta.get_int("sequence_index"), Some(2));
        assert_eq!(meta.get_int("content"), None);
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_metadata_json_is_plain_object() {
        let meta = VectorMetadata::from_pairs([("source", "notes.md")]);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["data"]["source"], "notes.md");

        let back: VectorMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}
