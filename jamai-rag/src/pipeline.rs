//! RAG pipeline facade.
//!
//! The [`RagPipeline`] wires one [`CollectionManager`] into the
//! [`Indexer`], [`Retriever`] and [`AnswerGenerator`] so that they share a
//! single readiness flag, and exposes every public operation.
//!
//! # Example
//!
//! ```rust,ignore
//! use jamai_rag::{InMemoryVectorStore, IngestFile, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chat_model(Arc::new(my_chat_model))
//!     .build()?;
//!
//! pipeline.ingest(&[IngestFile::new("guide.txt", text)], Some("acme"), &[]).await?;
//! let results = pipeline.search("testing", 4, Some("acme"), None).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::chunking::TextSplitter;
use crate::collection::CollectionManager;
use crate::config::RagConfig;
use crate::context::ContextAssembler;
use crate::document::{DocumentChunk, RetrievedChunk, SourceRef};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{Answer, AnswerGenerator, ChatModel, ConversationTurn, answer_or_fallback};
use crate::indexer::Indexer;
use crate::ingest::{IngestFile, IngestReport, prepare_batch};
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

/// A question with its retrieval scope and prior conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// The question.
    pub query: String,
    /// Number of chunks to retrieve; the configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    /// Restrict retrieval to this tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Restrict retrieval to chunks carrying any of these tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Earlier turns of the conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<Vec<ConversationTurn>>,
}

/// The answer to a [`ChatRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// The answer, never empty.
    pub answer: String,
    /// Citations for the context the answer was based on.
    pub sources: Vec<SourceRef>,
}

/// The retrieval-augmented generation pipeline.
///
/// Construct one via [`RagPipeline::builder()`] or, with the `ollama` and
/// `qdrant` features, [`RagPipeline::from_config`].
pub struct RagPipeline {
    config: RagConfig,
    splitter: TextSplitter,
    collections: Arc<CollectionManager>,
    indexer: Indexer,
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Build a pipeline talking to Ollama and Qdrant as configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP or gRPC client cannot be constructed.
    #[cfg(all(feature = "ollama", feature = "qdrant"))]
    pub fn from_config(config: RagConfig) -> Result<Self> {
        use crate::embedding::RetryingEmbedder;
        use crate::ollama::{OllamaChatModel, OllamaEmbeddingTransport};
        use crate::qdrant::QdrantVectorStore;

        let timeout = config.request_timeout();
        let transport = OllamaEmbeddingTransport::new(&config.ollama_host, timeout)?;
        let embedder = RetryingEmbedder::new(Arc::new(transport), config.embed_model.clone());
        let chat_model =
            OllamaChatModel::new(&config.ollama_host, config.llm_model.clone(), timeout)?;
        let store = QdrantVectorStore::new(&config.qdrant_url, config.qdrant_api_key.as_deref())?;

        Self::builder()
            .config(config)
            .embedding_provider(Arc::new(embedder))
            .vector_store(Arc::new(store))
            .chat_model(Arc::new(chat_model))
            .build()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the collection manager shared by all components.
    pub fn collections(&self) -> &Arc<CollectionManager> {
        &self.collections
    }

    /// Split `text` with the configured window and overlap.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.splitter.split(text)
    }

    /// Make sure the collection exists. Safe to call concurrently.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.collections.ensure_ready().await
    }

    /// Embed and store `chunks`, returning the number of points written.
    pub async fn upsert(&self, chunks: Vec<DocumentChunk>) -> Result<usize> {
        self.indexer.upsert(chunks).await
    }

    /// Similarity search restricted by tenant and tags.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        tenant_id: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<Vec<RetrievedChunk>> {
        self.retriever.search(query, top_k, tenant_id, tags).await
    }

    /// Exact number of chunks indexed for `tenant_id`.
    pub async fn count_matches(&self, tenant_id: &str) -> Result<u64> {
        self.retriever.count_matches(tenant_id).await
    }

    /// Generate an answer from already retrieved chunks.
    pub async fn answer(
        &self,
        query: &str,
        retrieved: &[RetrievedChunk],
        history: Option<&[ConversationTurn]>,
    ) -> Result<Answer> {
        self.generator.answer(query, retrieved, history).await
    }

    /// Chunk and index decoded files in one batch.
    ///
    /// Files with blank text are reported as skipped. When no chunk is
    /// produced the store is not contacted.
    ///
    /// # Errors
    ///
    /// Embedding and store failures propagate; nothing is written in that
    /// case.
    pub async fn ingest(
        &self,
        files: &[IngestFile],
        tenant_id: Option<&str>,
        tags: &[String],
    ) -> Result<IngestReport> {
        let batch = prepare_batch(&self.splitter, files, tenant_id, tags);
        let chunks_indexed = if batch.chunks.is_empty() {
            0
        } else {
            self.indexer.upsert(batch.chunks).await.map_err(|e| {
                error!(error = %e, "failed to index documents");
                e
            })?
        };

        info!(
            files_processed = batch.files_processed,
            chunks_indexed,
            skipped = batch.skipped.len(),
            "ingestion finished"
        );
        Ok(IngestReport {
            files_processed: batch.files_processed,
            chunks_indexed,
            skipped: batch.skipped,
        })
    }

    /// Retrieve context for a question and answer it.
    ///
    /// An empty model reply is replaced by
    /// [`FALLBACK_ANSWER`](crate::FALLBACK_ANSWER).
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let top_k = request.top_k.unwrap_or(self.config.default_top_k);
        let retrieved = self
            .retriever
            .search(&request.query, top_k, request.tenant_id.as_deref(), request.tags.as_deref())
            .await?;
        let answer = self
            .generator
            .answer(&request.query, &retrieved, request.conversation.as_deref())
            .await?;

        Ok(ChatResponse { answer: answer_or_fallback(answer.text), sources: answer.sources })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// All fields except `config` are required; the config defaults to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chat_model: Option<Arc<dyn ChatModel>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the chat model used for answers.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedder = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chat_model = self
            .chat_model
            .ok_or_else(|| RagError::ConfigError("chat_model is required".to_string()))?;

        let collections = Arc::new(CollectionManager::new(
            store,
            embedder.clone(),
            config.collection_name.clone(),
        ));
        let generator = AnswerGenerator::new(
            chat_model,
            ContextAssembler::new(config.max_context_chars),
            config.system_prompt.clone(),
            config.temperature,
        );

        Ok(RagPipeline {
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap),
            indexer: Indexer::new(collections.clone(), embedder.clone()),
            retriever: Retriever::new(collections.clone(), embedder),
            collections,
            generator,
            config,
        })
    }
}
