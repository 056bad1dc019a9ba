//! Lazy, race-free collection initialization.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::embedding::{DIMENSION_PROBE, EmbeddingProvider};
use crate::error::Result;
use crate::vectorstore::VectorStore;

/// Ensures the collection exists before it is written to or searched.
///
/// The readiness flag is checked without locking on the fast path. Cold
/// callers serialize on an async mutex and re-check the flag, so concurrent
/// first requests create the collection once. The vector size is learned by
/// embedding a probe string.
pub struct CollectionManager {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
    ready: AtomicBool,
    init_lock: Mutex<()>,
}

impl CollectionManager {
    /// Create a manager for `collection`. Nothing is contacted until
    /// [`ensure_ready`](Self::ensure_ready) is called.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
            ready: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    /// The managed collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The store holding the collection.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Whether the collection is known to exist.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Forget that the collection exists, so the next
    /// [`ensure_ready`](Self::ensure_ready) probes the store again.
    pub fn mark_unready(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// Make sure the collection exists, creating it if the store reports it
    /// missing.
    ///
    /// # Errors
    ///
    /// Propagates any store error other than "collection not found", and
    /// any failure to embed the probe or create the collection. The flag
    /// stays unset on failure.
    pub async fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.is_ready() {
            return Ok(());
        }

        match self.store.check_collection(&self.collection).await {
            Ok(()) => {
                debug!(collection = %self.collection, "collection already exists");
                self.ready.store(true, Ordering::Release);
                return Ok(());
            }
            Err(e) if e.is_collection_not_found() => {
                info!(collection = %self.collection, "collection not found; creating");
            }
            Err(e) => return Err(e),
        }

        let dimensions = self.embedder.embed(DIMENSION_PROBE).await?.len();
        self.store.create_collection(&self.collection, dimensions).await?;
        self.ready.store(true, Ordering::Release);
        info!(collection = %self.collection, dimensions, "collection created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::error::RagError;
    use crate::filter::Filter;
    use crate::inmemory::InMemoryVectorStore;
    use crate::vectorstore::{Point, ScoredPoint};

    struct FixedEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(vec![0.0; 8])
        }
    }

    /// Counts collection creations on top of an in-memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryVectorStore,
        creates: AtomicUsize,
        broken: bool,
    }

    #[async_trait]
    impl VectorStore for CountingStore {
        async fn check_collection(&self, name: &str) -> Result<()> {
            if self.broken {
                return Err(RagError::VectorStoreError {
                    backend: "counting".into(),
                    message: "connection refused".into(),
                });
            }
            self.inner.check_collection(name).await
        }

        async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create_collection(name, dimensions).await
        }

        async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
            self.inner.upsert(collection, points).await
        }

        async fn search(
            &self,
            collection: &str,
            vector: &[f32],
            top_k: usize,
            filter: Option<&Filter>,
        ) -> Result<Vec<ScoredPoint>> {
            self.inner.search(collection, vector, top_k, filter).await
        }

        async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64> {
            self.inner.count(collection, filter).await
        }
    }

    fn manager(store: Arc<CountingStore>, embedder: Arc<FixedEmbedder>) -> Arc<CollectionManager> {
        Arc::new(CollectionManager::new(store, embedder, "rag_documents"))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_create_once() {
        let store = Arc::new(CountingStore::default());
        let embedder = Arc::new(FixedEmbedder { calls: AtomicUsize::new(0) });
        let manager = manager(store.clone(), embedder.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.ensure_ready().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(manager.is_ready());
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.inner.dimensions("rag_documents").await, Some(8));
    }

    #[tokio::test]
    async fn existing_collection_is_not_recreated() {
        let store = Arc::new(CountingStore::default());
        store.inner.create_collection("rag_documents", 8).await.unwrap();
        let embedder = Arc::new(FixedEmbedder { calls: AtomicUsize::new(0) });
        let manager = manager(store.clone(), embedder.clone());

        manager.ensure_ready().await.unwrap();

        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reset_triggers_a_new_probe() {
        let store = Arc::new(CountingStore::default());
        let embedder = Arc::new(FixedEmbedder { calls: AtomicUsize::new(0) });
        let manager = manager(store.clone(), embedder);

        manager.ensure_ready().await.unwrap();
        store.inner.drop_collection("rag_documents").await;
        manager.mark_unready();
        manager.ensure_ready().await.unwrap();

        assert_eq!(store.creates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn other_probe_errors_propagate() {
        let store = Arc::new(CountingStore { broken: true, ..CountingStore::default() });
        let embedder = Arc::new(FixedEmbedder { calls: AtomicUsize::new(0) });
        let manager = manager(store.clone(), embedder);

        let err = manager.ensure_ready().await.unwrap_err();

        assert!(matches!(err, RagError::VectorStoreError { .. }));
        assert!(!manager.is_ready());
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }
}
