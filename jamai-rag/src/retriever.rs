//! Filtered similarity search and counting.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::collection::CollectionManager;
use crate::document::{MetadataValue, RetrievedChunk, TEXT_KEY};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::filter::build_filter;
use crate::vectorstore::ScoredPoint;

/// Searches the collection for chunks similar to a query.
///
/// If the store reports the collection missing (for example after an
/// operator dropped it), the manager is reset and an empty result is
/// returned; the next call recreates the collection.
pub struct Retriever {
    collections: Arc<CollectionManager>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    /// Create a retriever over the collection managed by `collections`.
    pub fn new(collections: Arc<CollectionManager>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { collections, embedder }
    }

    /// Return up to `top_k` chunks most similar to `query`, best first,
    /// restricted to `tenant_id` and to chunks carrying any of `tags`.
    ///
    /// A blank query returns nothing without contacting the store.
    ///
    /// # Errors
    ///
    /// Embedding failures and store errors other than a missing collection
    /// propagate.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        tenant_id: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<Vec<RetrievedChunk>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        self.collections.ensure_ready().await?;
        let vector = self.embedder.embed(query).await?;
        let filter = build_filter(tenant_id, tags);
        let collection = self.collections.collection();

        let points = match self
            .collections
            .store()
            .search(collection, &vector, top_k.max(1), filter.as_ref())
            .await
        {
            Ok(points) => points,
            Err(e) if e.is_collection_not_found() => {
                warn!(collection, "collection missing during search; will recreate");
                self.collections.mark_unready();
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        debug!(collection, result_count = points.len(), "search completed");
        Ok(points.into_iter().map(into_retrieved).collect())
    }

    /// Exact number of chunks indexed for `tenant_id`.
    ///
    /// Returns 0 if the collection is missing, which is indistinguishable
    /// from a tenant with no chunks.
    ///
    /// # Errors
    ///
    /// Store errors other than a missing collection propagate.
    pub async fn count_matches(&self, tenant_id: &str) -> Result<u64> {
        self.collections.ensure_ready().await?;
        let filter = build_filter(Some(tenant_id), None);
        let collection = self.collections.collection();

        match self.collections.store().count(collection, filter.as_ref()).await {
            Ok(count) => Ok(count),
            Err(e) if e.is_collection_not_found() => {
                warn!(collection, "collection missing during count; will recreate");
                self.collections.mark_unready();
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }
}

fn into_retrieved(point: ScoredPoint) -> RetrievedChunk {
    let text = point.payload.get(TEXT_KEY).and_then(MetadataValue::as_str).unwrap_or_default();
    RetrievedChunk { text: text.to_string(), score: point.score, metadata: point.payload }
}
