//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It honours the
//! same filter and "collection not found" contract as the Qdrant backend and
//! is suitable for development and testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{RagError, Result};
use crate::filter::Filter;
use crate::vectorstore::{Point, ScoredPoint, VectorStore};

const BACKEND: &str = "InMemory";

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    points: HashMap<String, Point>,
}

impl Collection {
    fn check_dimensions(&self, len: usize) -> Result<()> {
        if len != self.dimensions {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "vector dimension mismatch: expected {}, got {len}",
                    self.dimensions
                ),
            });
        }
        Ok(())
    }
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → point ID → point.
/// All operations are async-safe via `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a collection and all its points, as an operator would.
    ///
    /// Returns `true` if the collection existed.
    pub async fn drop_collection(&self, name: &str) -> bool {
        self.collections.write().await.remove(name).is_some()
    }

    /// The vector size of a collection, if it exists.
    pub async fn dimensions(&self, name: &str) -> Option<usize> {
        self.collections.read().await.get(name).map(|c| c.dimensions)
    }
}

fn not_found(collection: &str) -> RagError {
    RagError::CollectionNotFound { collection: collection.to_string() }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn check_collection(&self, name: &str) -> Result<()> {
        let collections = self.collections.read().await;
        collections.get(name).map(|_| ()).ok_or_else(|| not_found(name))
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("collection '{name}' already exists"),
            });
        }
        collections.insert(name.to_string(), Collection { dimensions, points: HashMap::new() });
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;
        for point in &points {
            store.check_dimensions(point.vector.len())?;
        }
        for point in points {
            store.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| not_found(collection))?;
        store.check_dimensions(vector.len())?;

        let mut scored: Vec<ScoredPoint> = store
            .points
            .values()
            .filter(|point| filter.is_none_or(|f| f.matches(&point.payload)))
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                score: cosine_similarity(&point.vector, vector),
                payload: point.payload.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| not_found(collection))?;
        let count = store
            .points
            .values()
            .filter(|point| filter.is_none_or(|f| f.matches(&point.payload)))
            .count();
        Ok(count as u64)
    }
}
