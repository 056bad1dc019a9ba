//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{DocumentChunk, Metadata, MetadataValue, TEXT_KEY};
use crate::error::Result;
use crate::filter::Filter;

/// One stored `(id, vector, payload)` triple.
///
/// The payload is the chunk metadata plus the chunk text under
/// [`TEXT_KEY`].
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Point id, equal to the chunk id.
    pub id: String,
    /// The embedding.
    pub vector: Vec<f32>,
    /// Metadata and text.
    pub payload: Metadata,
}

impl Point {
    /// Turn an embedded chunk into a point, consuming the chunk.
    pub fn from_chunk(chunk: DocumentChunk, vector: Vec<f32>) -> Self {
        let mut payload = chunk.metadata;
        payload.insert(TEXT_KEY.to_string(), MetadataValue::Text(chunk.text));
        Self { id: chunk.id, vector, payload }
    }
}

/// A stored point returned by a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    /// Point id.
    pub id: String,
    /// Similarity score, higher is more similar.
    pub score: f32,
    /// Metadata and text.
    pub payload: Metadata,
}

/// A storage backend for point vectors with filtered similarity search.
///
/// Every method addressing a collection that does not exist fails with
/// [`RagError::CollectionNotFound`](crate::RagError::CollectionNotFound);
/// other failures use
/// [`RagError::VectorStoreError`](crate::RagError::VectorStoreError).
///
/// # Example
///
/// ```rust,ignore
/// use jamai_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// store.upsert("docs", points).await?;
/// let results = store.search("docs", &query_embedding, 5, None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Succeeds if the collection exists.
    async fn check_collection(&self, name: &str) -> Result<()>;

    /// Create a collection of `dimensions`-sized vectors compared by cosine
    /// similarity.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Insert or replace points, returning once the write is durable.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    /// Return at most `top_k` points matching `filter`, most similar first.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Exact number of points matching `filter`.
    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64>;
}
