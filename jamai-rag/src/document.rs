//! Data types for chunks, retrieved results and citation sources.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Payload key under which the chunk text is stored next to its metadata.
pub const TEXT_KEY: &str = "text";
/// Metadata key naming the origin of a chunk (usually a file name).
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the chunk id.
pub const CHUNK_ID_KEY: &str = "chunk_id";
/// Metadata key holding the zero-based chunk position within its source.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
/// Metadata key holding the owning tenant.
pub const TENANT_KEY: &str = "tenant_id";
/// Metadata key holding the chunk tags.
pub const TAGS_KEY: &str = "tags";

/// A single metadata value: a string, an integer or a list of strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MetadataValue {
    /// A string value.
    Text(String),
    /// An integer value.
    Integer(i64),
    /// A list of strings, e.g. tags.
    List(Vec<String>),
}

impl MetadataValue {
    /// Borrow the value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the value as a list of strings, if it is one.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Chunk metadata keyed by field name.
pub type Metadata = HashMap<String, MetadataValue>;

/// A chunk of document text ready to be embedded and indexed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// Unique identifier, reused as the stored point id.
    ///
    /// Any string is accepted. Qdrant stores non-UUID, non-integer ids under
    /// a derived UUIDv5 and reports the original id back on search.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Metadata stored alongside the text.
    pub metadata: Metadata,
}

impl DocumentChunk {
    /// Create a new chunk.
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: Metadata) -> Self {
        Self { id: id.into(), text: text.into(), metadata }
    }
}

/// A stored chunk returned by a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    /// The chunk text.
    pub text: String,
    /// The similarity score (higher is more similar).
    pub score: f32,
    /// The full stored payload, including the text under [`TEXT_KEY`].
    pub metadata: Metadata,
}

impl RetrievedChunk {
    /// The origin label of this chunk, `"unknown"` when none was recorded.
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).and_then(MetadataValue::as_str).unwrap_or("unknown")
    }

    /// The chunk id recorded in the metadata, if any.
    pub fn chunk_id(&self) -> Option<&str> {
        self.metadata.get(CHUNK_ID_KEY).and_then(MetadataValue::as_str)
    }
}

/// A citation for one chunk that contributed to an assembled context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// The origin label of the chunk.
    pub source: String,
    /// The similarity score of the chunk.
    pub score: f32,
    /// The (possibly truncated) text that was placed in the context.
    pub text: String,
    /// The chunk id, when the chunk recorded one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
}
