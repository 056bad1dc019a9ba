//! Embeds chunks and writes them to the collection.

use std::sync::Arc;

use tracing::{debug, info};

use crate::collection::CollectionManager;
use crate::document::DocumentChunk;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::vectorstore::Point;

/// Writes [`DocumentChunk`]s as points in one durable batch.
pub struct Indexer {
    collections: Arc<CollectionManager>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Indexer {
    /// Create an indexer writing to the collection managed by `collections`.
    pub fn new(collections: Arc<CollectionManager>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { collections, embedder }
    }

    /// Embed and upsert `chunks`, returning the number of points written.
    ///
    /// Chunks whose text is blank are dropped. If none remain the store is
    /// not contacted. Points whose id already exists are replaced.
    ///
    /// # Errors
    ///
    /// Any embedding failure aborts the call before anything is written.
    /// Store errors propagate.
    pub async fn upsert(&self, chunks: Vec<DocumentChunk>) -> Result<usize> {
        let chunks: Vec<DocumentChunk> =
            chunks.into_iter().filter(|chunk| !chunk.text.trim().is_empty()).collect();
        if chunks.is_empty() {
            debug!("no indexable chunks");
            return Ok(0);
        }

        self.collections.ensure_ready().await?;

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let points: Vec<Point> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| Point::from_chunk(chunk, vector))
            .collect();
        let count = points.len();

        let collection = self.collections.collection();
        self.collections.store().upsert(collection, points).await?;
        info!(collection, count, "indexed chunks");

        Ok(count)
    }
}
