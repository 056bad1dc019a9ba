//! # jamai-rag
//!
//! Retrieval engine for the JamAI assistant.
//!
//! ## Overview
//!
//! Decoded document text is split into overlapping character windows, each
//! window is embedded through Ollama and stored in a Qdrant collection
//! together with its tenant, tags and source. Questions are embedded the
//! same way, matched against the collection under tenant and tag filters,
//! and the best chunks are assembled into a bounded context for a chat
//! model.
//!
//! - [`TextSplitter`] - sliding-window chunking
//! - [`RetryingEmbedder`] - embeddings with bounded exponential backoff
//! - [`CollectionManager`] - lazy, race-free collection creation
//! - [`Indexer`] / [`Retriever`] - batch upsert, filtered search and counting
//! - [`ContextAssembler`] / [`AnswerGenerator`] - prompt building and generation
//! - [`RagPipeline`] - the facade wiring it all together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jamai_rag::{ChatRequest, IngestFile, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::from_config(RagConfig::from_env()?)?;
//! pipeline.ingest(&[IngestFile::new("guide.txt", text)], Some("acme"), &[]).await?;
//!
//! let response = pipeline
//!     .chat(&ChatRequest {
//!         query: "How do I test agents?".into(),
//!         tenant_id: Some("acme".into()),
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{}", response.answer);
//! ```
//!
//! ## Features
//!
//! - `ollama` (default): HTTP embedding transport and chat model for Ollama
//! - `qdrant` (default): [`QdrantVectorStore`] over gRPC
//!
//! Without either feature the crate still provides the [`InMemoryVectorStore`]
//! and the traits needed to plug in other backends.

pub mod chunking;
pub mod collection;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod generation;
pub mod indexer;
pub mod ingest;
pub mod inmemory;
pub mod pipeline;
pub mod retriever;
pub mod retry;
pub mod vectorstore;

#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::TextSplitter;
pub use collection::CollectionManager;
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{AssembledContext, ContextAssembler, NO_CONTEXT};
pub use document::{DocumentChunk, Metadata, MetadataValue, RetrievedChunk, SourceRef};
pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingTransport, RetryingEmbedder};
pub use error::{RagError, Result};
pub use filter::{Condition, Filter, build_filter};
pub use generation::{
    Answer, AnswerGenerator, ChatMessage, ChatModel, ChatRole, CompletionRequest, ConversationTurn,
    FALLBACK_ANSWER,
};
pub use indexer::Indexer;
pub use ingest::{IngestFile, IngestReport, NO_READABLE_TEXT, parse_tags};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{ChatRequest, ChatResponse, RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use retry::{Delay, RetryPolicy, TokioDelay};
pub use vectorstore::{Point, ScoredPoint, VectorStore};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaChatModel, OllamaEmbeddingTransport};
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
